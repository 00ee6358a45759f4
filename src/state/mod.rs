mod ledger;
mod session;
pub mod view;

pub use ledger::{Bid, BidLedger};
pub use session::{Phase, Session, SessionState, TimeRemaining};
