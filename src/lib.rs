//! Client-side sync engine for time-boxed betting sessions.
//!
//! A session is started against a remote provider and mirrored locally;
//! two polling loops keep the bid ledger and session status fresh, and
//! subscribers receive a live `(session, bids)` snapshot with derived
//! stats. See [`engine::SyncEngine`] for the entry point.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;

pub use engine::{Snapshot, SyncEngine, SyncHandle};
pub use error::{CommandError, ProviderError, ValidationError};
pub use state::{Bid, Session, TimeRemaining};
