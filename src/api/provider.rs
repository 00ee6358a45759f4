use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ProviderError;
use crate::state::{Bid, Session};

/// Abstract session/bid provider consumed by the sync engine.
///
/// Reads (`session_status`, `list_bids`, the extremes) are idempotent;
/// `start_session`, `stop_session` and `submit_bid` are not. The engine
/// never retries on its own — transient poll failures are absorbed by the
/// next tick, command failures go back to the caller.
#[async_trait]
pub trait BetProvider: Send + Sync + 'static {
    /// Open a new time-boxed session. The returned session carries the
    /// provider's `start_time`, which is authoritative over the local clock.
    async fn start_session(
        &self,
        session_id: &str,
        duration_minutes: u32,
        task_interval_seconds: u32,
    ) -> Result<Session, ProviderError>;

    async fn session_status(&self, session_id: &str) -> Result<Session, ProviderError>;

    async fn stop_session(&self, session_id: &str) -> Result<(), ProviderError>;

    /// Place a bid. Inputs are validated at the command boundary before
    /// this is ever called.
    async fn submit_bid(
        &self,
        session_id: &str,
        participant_id: u32,
        amount: Decimal,
    ) -> Result<Bid, ProviderError>;

    async fn list_bids(&self, session_id: &str) -> Result<Vec<Bid>, ProviderError>;

    /// Ledger-wide maximum. `ProviderError::NoBids` when the session has no
    /// bids yet, distinguishable from an unreachable provider.
    async fn highest_bid(&self, session_id: &str) -> Result<Bid, ProviderError>;

    /// Ledger-wide minimum, same error contract as `highest_bid`.
    async fn lowest_bid(&self, session_id: &str) -> Result<Bid, ProviderError>;
}
