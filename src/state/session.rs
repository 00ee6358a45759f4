use std::mem;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session identity and time window as reported by the provider.
/// `start_time` always comes from the provider's response, never the local
/// clock, so a skewed client cannot shift the betting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    /// Phase flag mirrored from the provider; the provider is authoritative.
    pub active: bool,
}

impl Session {
    /// Hard expiry instant: `start_time + duration_minutes`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Time left in the betting window. Pure function of the session's
    /// window and `now`; never negative.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> TimeRemaining {
        let remaining = self.expires_at() - now;
        if remaining <= Duration::zero() {
            TimeRemaining::Expired
        } else {
            TimeRemaining::Remaining(remaining)
        }
    }
}

/// Result of a time-remaining query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    /// Strictly positive duration left in the window.
    Remaining(Duration),
    Expired,
}

impl TimeRemaining {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Countdown string for display: "M:SS", or "Expired".
    pub fn display(&self) -> String {
        match self {
            Self::Expired => "Expired".to_string(),
            Self::Remaining(d) => {
                let secs = d.num_seconds();
                format!("{}:{:02}", secs / 60, secs % 60)
            }
        }
    }
}

/// Lifecycle phase of the viewer's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NoSession,
    /// Start command in flight.
    Starting,
    Active,
    /// Stop command in flight.
    Stopping,
    Stopped,
    /// Derived only: reported by `phase_at` once an active session's window
    /// has elapsed. Never stored.
    Expired,
}

/// Tracks the viewer's current session: stored phase plus the mirrored
/// session value. At most one session is tracked at a time.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: Phase,
    session: Option<Session>,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Effective phase at `now`. An active session past its expiry reports
    /// `Expired`; an active phase whose mirror was lost to a failed status
    /// poll reports `NoSession`.
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        match (self.phase, &self.session) {
            (Phase::Active, None) => Phase::NoSession,
            (Phase::Active, Some(s)) if now >= s.expires_at() => Phase::Expired,
            (phase, _) => phase,
        }
    }

    /// A new session may start from `NoSession` or a terminal phase.
    pub fn can_start(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.phase_at(now),
            Phase::NoSession | Phase::Stopped | Phase::Expired
        )
    }

    /// Checks the stored phase, not the derived one: a locally expired
    /// session still accepts an explicit stop so its polling can be torn
    /// down.
    pub fn can_stop(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Mark a start command in flight. Returns the previous phase so a
    /// provider failure can restore it unchanged.
    pub fn begin_start(&mut self) -> Phase {
        mem::replace(&mut self.phase, Phase::Starting)
    }

    /// Mark a stop command in flight. Returns the previous phase.
    pub fn begin_stop(&mut self) -> Phase {
        mem::replace(&mut self.phase, Phase::Stopping)
    }

    /// Revert an in-flight command after a provider failure.
    pub fn restore(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Adopt a freshly started session. Always a new session value, never a
    /// reuse of a terminal one.
    pub fn activate(&mut self, session: Session) {
        self.session = Some(session);
        self.phase = Phase::Active;
    }

    /// Explicit stop succeeded: the session is cleared from local view.
    pub fn stopped(&mut self) {
        self.session = None;
        self.phase = Phase::Stopped;
    }

    /// Overwrite the mirror from a successful status poll.
    pub fn apply_status(&mut self, session: Session) {
        if self.phase == Phase::Active {
            self.session = Some(session);
        }
    }

    /// Status poll failed. The provider is the authority on session
    /// identity, so the mirror is dropped rather than left stale.
    pub fn clear_mirror(&mut self) {
        if self.phase == Phase::Active {
            self.session = None;
        }
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<TimeRemaining> {
        self.session.as_ref().map(|s| s.time_remaining(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: DateTime<Utc>, minutes: u32) -> Session {
        Session {
            session_id: "race-night".to_string(),
            start_time: start,
            duration_minutes: minutes,
            active: true,
        }
    }

    #[test]
    fn test_time_remaining_within_window() {
        let start = Utc::now();
        let s = session(start, 5);

        match s.time_remaining(start) {
            TimeRemaining::Remaining(d) => {
                assert!(d > Duration::zero());
                assert!(d <= Duration::seconds(300));
            }
            TimeRemaining::Expired => panic!("fresh session must not be expired"),
        }
    }

    #[test]
    fn test_time_remaining_never_negative() {
        let start = Utc::now();
        let s = session(start, 5);

        // Exactly at expiry and well past it: always the Expired sentinel.
        assert!(s.time_remaining(start + Duration::minutes(5)).is_expired());
        assert!(s.time_remaining(start + Duration::hours(2)).is_expired());
    }

    #[test]
    fn test_expired_is_sticky() {
        let start = Utc::now();
        let s = session(start, 1);

        let mut now = start + Duration::minutes(1);
        for _ in 0..3 {
            assert!(s.time_remaining(now).is_expired());
            now = now + Duration::seconds(30);
        }
    }

    #[test]
    fn test_display_countdown() {
        let start = Utc::now();
        let s = session(start, 5);

        let t = s.time_remaining(start + Duration::seconds(59));
        assert_eq!(t.display(), "4:01");

        let t = s.time_remaining(start + Duration::minutes(5));
        assert_eq!(t.display(), "Expired");
    }

    #[test]
    fn test_initial_phase_allows_start() {
        let state = SessionState::default();
        let now = Utc::now();

        assert_eq!(state.phase_at(now), Phase::NoSession);
        assert!(state.can_start(now));
        assert!(!state.can_stop());
    }

    #[test]
    fn test_active_blocks_start_allows_stop() {
        let mut state = SessionState::default();
        let now = Utc::now();
        state.activate(session(now, 5));

        assert_eq!(state.phase_at(now), Phase::Active);
        assert!(!state.can_start(now));
        assert!(state.can_stop());
    }

    #[test]
    fn test_expired_is_terminal_but_still_stoppable() {
        let mut state = SessionState::default();
        let start = Utc::now();
        state.activate(session(start, 1));

        let later = start + Duration::minutes(2);
        assert_eq!(state.phase_at(later), Phase::Expired);
        // A new start is allowed, and so is an explicit stop (the stored
        // phase is still Active).
        assert!(state.can_start(later));
        assert!(state.can_stop());
    }

    #[test]
    fn test_failed_start_restores_previous_phase() {
        let mut state = SessionState::default();
        let now = Utc::now();

        let prev = state.begin_start();
        assert_eq!(state.phase_at(now), Phase::Starting);
        assert!(!state.can_start(now));

        state.restore(prev);
        assert_eq!(state.phase_at(now), Phase::NoSession);
    }

    #[test]
    fn test_stop_clears_session() {
        let mut state = SessionState::default();
        let now = Utc::now();
        state.activate(session(now, 5));

        let prev = state.begin_stop();
        assert_eq!(prev, Phase::Active);
        state.stopped();

        assert_eq!(state.phase_at(now), Phase::Stopped);
        assert!(state.session().is_none());
        assert!(state.can_start(now));
    }

    #[test]
    fn test_mirror_lost_then_restored() {
        let mut state = SessionState::default();
        let start = Utc::now();
        let original = session(start, 5);
        state.activate(original.clone());

        // Status poll failure drops the mirror immediately.
        state.clear_mirror();
        assert_eq!(state.phase_at(start), Phase::NoSession);
        assert!(state.session().is_none());

        // The next successful poll restores it with the provider's
        // start_time unchanged.
        state.apply_status(original.clone());
        assert_eq!(state.phase_at(start), Phase::Active);
        assert_eq!(state.session().unwrap().start_time, original.start_time);
    }

    #[test]
    fn test_mirror_ignored_outside_active() {
        let mut state = SessionState::default();
        let now = Utc::now();

        // A stray status result while no session is tracked must not
        // resurrect one.
        state.apply_status(session(now, 5));
        assert!(state.session().is_none());
        assert_eq!(state.phase_at(now), Phase::NoSession);
    }

    #[test]
    fn test_session_serde_wire_shape() {
        let json = r#"{
            "sessionId": "friday-night",
            "startTime": "2025-03-07T18:30:00Z",
            "durationMinutes": 10,
            "active": true
        }"#;

        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.session_id, "friday-night");
        assert_eq!(s.duration_minutes, 10);
        assert!(s.active);

        let value = serde_json::to_value(&s).unwrap();
        assert!(value.get("sessionId").is_some());
        assert!(value.get("durationMinutes").is_some());
    }
}
