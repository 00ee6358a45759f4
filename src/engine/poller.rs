use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::BetProvider;
use crate::error::ProviderError;
use crate::state::{Bid, Session};

/// A completed poll fetch, tagged with the epoch it was issued under.
/// The engine drops any event whose epoch is no longer current, so a late
/// completion from a stopped or switched session is never applied.
#[derive(Debug)]
pub(crate) enum PollEvent {
    Bids {
        epoch: u64,
        result: Result<Vec<Bid>, ProviderError>,
    },
    Session {
        epoch: u64,
        result: Result<Session, ProviderError>,
    },
}

/// Refresh cadence for one armed session.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollIntervals {
    pub bids: Duration,
    pub session: Duration,
}

/// Task handles for one armed session's two polling loops.
#[derive(Debug)]
pub(crate) struct PollTasks {
    bids: JoinHandle<()>,
    session: JoinHandle<()>,
}

impl PollTasks {
    /// Synchronous teardown. Anything already fetched but not yet applied
    /// is filtered out by the epoch check on the consumer side.
    pub fn disarm(&self) {
        self.bids.abort();
        self.session.abort();
    }
}

impl Drop for PollTasks {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Arm both polling loops for `session_id` under `epoch`.
///
/// Each loop awaits its fetch before the next tick, so at most one request
/// per task is ever in flight; ticks missed while a slow fetch is
/// outstanding are skipped, never queued. The first fetch fires
/// immediately on arming.
pub(crate) fn arm(
    provider: Arc<dyn BetProvider>,
    session_id: String,
    epoch: u64,
    intervals: PollIntervals,
    tx: mpsc::Sender<PollEvent>,
) -> PollTasks {
    let bids = {
        let provider = provider.clone();
        let session_id = session_id.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(intervals.bids);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let result = provider.list_bids(&session_id).await;
                if tx.send(PollEvent::Bids { epoch, result }).await.is_err() {
                    break;
                }
            }
        })
    };

    let session = tokio::spawn(async move {
        let mut tick = tokio::time::interval(intervals.session);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let result = provider.session_status(&session_id).await;
            if tx.send(PollEvent::Session { epoch, result }).await.is_err() {
                break;
            }
        }
    });

    PollTasks { bids, session }
}
