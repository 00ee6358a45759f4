use thiserror::Error;

/// Command input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("session id must be at least {min} characters")]
    SessionIdTooShort { min: usize },

    #[error("duration must be between {min} and {max} minutes, got {got}")]
    DurationOutOfRange { min: u32, max: u32, got: u32 },

    #[error("task interval must be between {min} and {max} seconds, got {got}")]
    IntervalOutOfRange { min: u32, max: u32, got: u32 },

    #[error("bid amount must be positive")]
    AmountNotPositive,

    #[error("participant id must be positive")]
    ParticipantInvalid,
}

/// Failure reported by (or while reaching) the remote provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered but refused the request (conflict, closed
    /// session, rule violation). Carries the provider's message for display.
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    /// Transport-level failure: unreachable, timeout, malformed response.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Extreme queries only: the session exists but has no bids yet.
    /// Distinct from `Unavailable` so callers can tell "empty" from
    /// "unreachable".
    #[error("no bids recorded for this session")]
    NoBids,
}

/// Errors surfaced to command callers (start/stop/submit/refresh/extremes).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no session is currently active")]
    NoSession,

    #[error("a session is already in progress")]
    SessionInProgress,

    #[error("sync engine has shut down")]
    EngineClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::SessionIdTooShort { min: 3 };
        assert_eq!(err.to_string(), "session id must be at least 3 characters");

        let err = ValidationError::DurationOutOfRange {
            min: 1,
            max: 60,
            got: 90,
        };
        assert!(err.to_string().contains("90"));
    }

    #[test]
    fn test_no_bids_distinct_from_unavailable() {
        let empty = ProviderError::NoBids;
        let down = ProviderError::Unavailable("connection refused".to_string());
        assert!(matches!(empty, ProviderError::NoBids));
        assert!(!matches!(down, ProviderError::NoBids));
    }

    #[test]
    fn test_command_error_wraps() {
        let err: CommandError = ValidationError::AmountNotPositive.into();
        assert!(matches!(err, CommandError::Validation(_)));

        let err: CommandError = ProviderError::NoBids.into();
        assert!(matches!(err, CommandError::Provider(ProviderError::NoBids)));
    }
}
