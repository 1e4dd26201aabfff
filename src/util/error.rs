use thiserror::Error;

/// Precondition violations reported by the session core.
///
/// Timing faults (extra taps, unmatched beats) are never errors; they are
/// scored as `Rating::Miss`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("audio clock used before init()")]
    ClockNotInitialized,

    #[error("no session is running")]
    SessionNotRunning,

    #[error("a session is already running")]
    AlreadyRunning,

    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Short message suitable for showing to the player.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ClockNotInitialized => "Audio is not ready yet. Tap once to enable sound.",
            Self::SessionNotRunning => "Start a session first.",
            Self::AlreadyRunning => "A session is already in progress.",
            Self::InvalidConfig(_) => "The session settings are invalid.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_message_includes_reason() {
        let err = EngineError::InvalidConfig("bpm must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid session config: bpm must be positive"
        );
        assert!(err.user_message().contains("invalid"));
    }

    #[test]
    fn clock_error_message() {
        let err = EngineError::ClockNotInitialized;
        assert!(err.to_string().contains("init()"));
    }
}
