mod poller;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::api::BetProvider;
use crate::config;
use crate::error::{CommandError, ValidationError};
use crate::state::{view, Bid, BidLedger, Session, SessionState, TimeRemaining};

use poller::{PollEvent, PollIntervals, PollTasks};

pub const MIN_SESSION_ID_CHARS: usize = 3;
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 60;
pub const MIN_TASK_INTERVAL_SECS: u32 = 5;
pub const MAX_TASK_INTERVAL_SECS: u32 = 60;

/// Input-contract checks for the start command, performed before any
/// channel send or network call.
pub fn validate_start(
    session_id: &str,
    duration_minutes: u32,
    task_interval_seconds: u32,
) -> Result<(), ValidationError> {
    if session_id.chars().count() < MIN_SESSION_ID_CHARS {
        return Err(ValidationError::SessionIdTooShort {
            min: MIN_SESSION_ID_CHARS,
        });
    }
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(ValidationError::DurationOutOfRange {
            min: MIN_DURATION_MINUTES,
            max: MAX_DURATION_MINUTES,
            got: duration_minutes,
        });
    }
    if !(MIN_TASK_INTERVAL_SECS..=MAX_TASK_INTERVAL_SECS).contains(&task_interval_seconds) {
        return Err(ValidationError::IntervalOutOfRange {
            min: MIN_TASK_INTERVAL_SECS,
            max: MAX_TASK_INTERVAL_SECS,
            got: task_interval_seconds,
        });
    }
    Ok(())
}

/// Input-contract checks for bid submission.
pub fn validate_bid(participant_id: u32, amount: Decimal) -> Result<(), ValidationError> {
    if participant_id == 0 {
        return Err(ValidationError::ParticipantInvalid);
    }
    if amount <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }
    Ok(())
}

/// Point-in-time view of the mirrored session and bid ledger, published to
/// subscribers on every successful poll or mutation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub session: Option<Session>,
    /// Newest submission first.
    pub bids: Vec<Bid>,
}

impl Snapshot {
    pub fn total_count(&self) -> usize {
        view::total_count(&self.bids)
    }

    pub fn total_amount(&self) -> Decimal {
        view::total_amount(&self.bids)
    }

    pub fn unique_participants(&self) -> usize {
        view::unique_participants(&self.bids)
    }

    pub fn bids_for(&self, participant_id: u32) -> Vec<&Bid> {
        view::bids_for(&self.bids, participant_id)
    }

    pub fn highest_for(&self, participant_id: u32) -> Decimal {
        view::highest_for(&self.bids, participant_id)
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<TimeRemaining> {
        self.session.as_ref().map(|s| s.time_remaining(now))
    }
}

enum Command {
    Start {
        session_id: String,
        duration_minutes: u32,
        task_interval_seconds: u32,
        reply: oneshot::Sender<Result<Session, CommandError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    SubmitBid {
        participant_id: u32,
        amount: Decimal,
        reply: oneshot::Sender<Result<Bid, CommandError>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    HighestBid {
        reply: oneshot::Sender<Result<Bid, CommandError>>,
    },
    LowestBid {
        reply: oneshot::Sender<Result<Bid, CommandError>>,
    },
}

/// Cloneable handle to a running sync engine.
#[derive(Clone)]
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl SyncHandle {
    /// Start a fresh session. Valid only while no session is running;
    /// arms both polling loops on provider acceptance.
    pub async fn start(
        &self,
        session_id: &str,
        duration_minutes: u32,
        task_interval_seconds: u32,
    ) -> Result<Session, CommandError> {
        validate_start(session_id, duration_minutes, task_interval_seconds)?;
        let session_id = session_id.to_string();
        self.send(|reply| Command::Start {
            session_id,
            duration_minutes,
            task_interval_seconds,
            reply,
        })
        .await
    }

    /// Stop the current session and tear down its polling.
    pub async fn stop(&self) -> Result<(), CommandError> {
        self.send(|reply| Command::Stop { reply }).await
    }

    /// Submit a bid against the current session. On success the ledger is
    /// refreshed from the provider before this returns.
    pub async fn submit_bid(
        &self,
        participant_id: u32,
        amount: Decimal,
    ) -> Result<Bid, CommandError> {
        validate_bid(participant_id, amount)?;
        self.send(|reply| Command::SubmitBid {
            participant_id,
            amount,
            reply,
        })
        .await
    }

    /// Force an immediate ledger refresh outside the polling cadence.
    pub async fn refresh(&self) -> Result<(), CommandError> {
        self.send(|reply| Command::Refresh { reply }).await
    }

    /// Ledger-wide highest bid, answered by the provider (the local mirror
    /// may be a partial window). On failure the extreme is unknown — never
    /// zero, never stale.
    pub async fn highest_bid(&self) -> Result<Bid, CommandError> {
        self.send(|reply| Command::HighestBid { reply }).await
    }

    /// Ledger-wide lowest bid; same contract as `highest_bid`.
    pub async fn lowest_bid(&self) -> Result<Bid, CommandError> {
        self.send(|reply| Command::LowestBid { reply }).await
    }

    /// Subscribe to the `(session, bids)` feed.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    async fn send<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, CommandError>>) -> Command,
    ) -> Result<T, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| CommandError::EngineClosed)?;
        reply_rx.await.map_err(|_| CommandError::EngineClosed)?
    }
}

/// One armed session's polling bookkeeping.
struct Armed {
    session_id: String,
    epoch: u64,
    tasks: PollTasks,
}

/// Owns all mutable sync state and processes commands and poll completions
/// on a single task — the one logical event loop. Suspension points are
/// exactly the provider calls.
pub struct SyncEngine {
    provider: Arc<dyn BetProvider>,
    intervals: PollIntervals,
    state: SessionState,
    ledger: BidLedger,
    armed: Option<Armed>,
    next_epoch: u64,
    poll_tx: mpsc::Sender<PollEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl SyncEngine {
    /// Spawn the engine task and return a handle to it. The engine shuts
    /// down (and disarms any polling) when every handle is dropped.
    pub fn spawn(provider: Arc<dyn BetProvider>, poll: &config::Poll) -> SyncHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (engine, poll_rx, snapshot_rx) = Self::new(provider, poll);
        tokio::spawn(engine.run(cmd_rx, poll_rx));
        SyncHandle {
            cmd_tx,
            snapshot_rx,
        }
    }

    fn new(
        provider: Arc<dyn BetProvider>,
        poll: &config::Poll,
    ) -> (Self, mpsc::Receiver<PollEvent>, watch::Receiver<Snapshot>) {
        let (poll_tx, poll_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let engine = Self {
            provider,
            intervals: PollIntervals {
                bids: poll.bids_interval(),
                session: poll.session_interval(),
            },
            state: SessionState::default(),
            ledger: BidLedger::default(),
            armed: None,
            next_epoch: 0,
            poll_tx,
            snapshot_tx,
        };
        (engine, poll_rx, snapshot_rx)
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut poll_rx: mpsc::Receiver<PollEvent>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(event) = poll_rx.recv() => self.apply_poll(event),
            }
        }
        self.disarm();
        debug!("sync engine shut down");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                session_id,
                duration_minutes,
                task_interval_seconds,
                reply,
            } => {
                let result = self
                    .do_start(&session_id, duration_minutes, task_interval_seconds)
                    .await;
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.do_stop().await);
            }
            Command::SubmitBid {
                participant_id,
                amount,
                reply,
            } => {
                let _ = reply.send(self.do_submit(participant_id, amount).await);
            }
            Command::Refresh { reply } => {
                let _ = reply.send(self.do_refresh().await);
            }
            Command::HighestBid { reply } => {
                let result = match self.current_session_id() {
                    Some(id) => self.provider.highest_bid(&id).await.map_err(Into::into),
                    None => Err(CommandError::NoSession),
                };
                let _ = reply.send(result);
            }
            Command::LowestBid { reply } => {
                let result = match self.current_session_id() {
                    Some(id) => self.provider.lowest_bid(&id).await.map_err(Into::into),
                    None => Err(CommandError::NoSession),
                };
                let _ = reply.send(result);
            }
        }
    }

    async fn do_start(
        &mut self,
        session_id: &str,
        duration_minutes: u32,
        task_interval_seconds: u32,
    ) -> Result<Session, CommandError> {
        if !self.state.can_start(Utc::now()) {
            return Err(CommandError::SessionInProgress);
        }

        let prev = self.state.begin_start();
        match self
            .provider
            .start_session(session_id, duration_minutes, task_interval_seconds)
            .await
        {
            Ok(session) => {
                // Session switch: the old session's polling and bids go
                // before the new session becomes visible.
                self.disarm();
                self.ledger.clear();
                self.state.activate(session.clone());
                self.arm(session.session_id.clone());
                self.publish();
                info!(
                    session_id = %session.session_id,
                    duration_minutes,
                    "session started"
                );
                Ok(session)
            }
            Err(err) => {
                self.state.restore(prev);
                Err(err.into())
            }
        }
    }

    async fn do_stop(&mut self) -> Result<(), CommandError> {
        if !self.state.can_stop() {
            return Err(CommandError::NoSession);
        }
        let session_id = self.current_session_id().ok_or(CommandError::NoSession)?;

        let prev = self.state.begin_stop();
        match self.provider.stop_session(&session_id).await {
            Ok(()) => {
                self.disarm();
                self.state.stopped();
                self.ledger.clear();
                self.publish();
                info!(%session_id, "session stopped");
                Ok(())
            }
            Err(err) => {
                self.state.restore(prev);
                Err(err.into())
            }
        }
    }

    async fn do_submit(
        &mut self,
        participant_id: u32,
        amount: Decimal,
    ) -> Result<Bid, CommandError> {
        let session_id = self.current_session_id().ok_or(CommandError::NoSession)?;

        let bid = self
            .provider
            .submit_bid(&session_id, participant_id, amount)
            .await?;

        // Immediate canonical refresh instead of an optimistic merge. A
        // failure here is transient; the bid poll catches up on the next
        // tick.
        match self.provider.list_bids(&session_id).await {
            Ok(bids) => {
                self.ledger.replace_all(bids);
                self.publish();
            }
            Err(err) => {
                warn!(error = %err, "post-submit refresh failed; awaiting next poll");
            }
        }

        Ok(bid)
    }

    async fn do_refresh(&mut self) -> Result<(), CommandError> {
        let session_id = self.current_session_id().ok_or(CommandError::NoSession)?;
        let bids = self.provider.list_bids(&session_id).await?;
        self.ledger.replace_all(bids);
        self.publish();
        Ok(())
    }

    /// Apply a completed poll fetch. Results from a superseded epoch are
    /// dropped here, at the point of application.
    fn apply_poll(&mut self, event: PollEvent) {
        match event {
            PollEvent::Bids { epoch, result } => {
                if !self.epoch_current(epoch) {
                    debug!(epoch, "discarding stale bid poll result");
                    return;
                }
                match result {
                    Ok(bids) => {
                        self.ledger.replace_all(bids);
                        self.publish();
                    }
                    // Transient: previous ledger contents stay visible.
                    Err(err) => warn!(error = %err, "bid poll failed; keeping ledger"),
                }
            }
            PollEvent::Session { epoch, result } => {
                if !self.epoch_current(epoch) {
                    debug!(epoch, "discarding stale session poll result");
                    return;
                }
                match result {
                    Ok(session) => {
                        self.state.apply_status(session);
                        self.publish();
                    }
                    // Session identity loss must be visible immediately:
                    // the mirror is cleared, polling keeps running.
                    Err(err) => {
                        warn!(error = %err, "session poll failed; clearing mirror");
                        self.state.clear_mirror();
                        self.publish();
                    }
                }
            }
        }
    }

    fn current_session_id(&self) -> Option<String> {
        self.armed.as_ref().map(|a| a.session_id.clone())
    }

    fn epoch_current(&self, epoch: u64) -> bool {
        self.armed.as_ref().is_some_and(|a| a.epoch == epoch)
    }

    fn arm(&mut self, session_id: String) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let tasks = poller::arm(
            self.provider.clone(),
            session_id.clone(),
            epoch,
            self.intervals,
            self.poll_tx.clone(),
        );
        self.armed = Some(Armed {
            session_id,
            epoch,
            tasks,
        });
    }

    fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.tasks.disarm();
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Snapshot {
            session: self.state.session().cloned(),
            bids: self.ledger.bids().to_vec(),
        });
    }
}
