use std::time::Duration;

/// Core error type for the cleaner.
///
/// Adapter crates map their specific errors into this type so the workflow can
/// tell a rate-limit signal (retryable) apart from everything else (fatal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("group number {index} is out of range (0..{len})")]
    InvalidSelection { index: usize, len: usize },

    #[error("rate limited, retry after {}s", .wait.as_secs())]
    RateLimited { wait: Duration },

    #[error("still rate limited after {attempts} retries")]
    RateLimitExhausted { attempts: u32 },

    #[error("interrupted by user")]
    Interrupted,

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Wait requested by the backend, if this is a rate-limit signal.
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_carry_a_wait() {
        let wait = Duration::from_secs(12);
        assert_eq!(Error::RateLimited { wait }.rate_limit_wait(), Some(wait));
        assert_eq!(Error::Interrupted.rate_limit_wait(), None);
        assert_eq!(
            Error::External("PEER_ID_INVALID".to_string()).rate_limit_wait(),
            None
        );
    }

    #[test]
    fn json_failures_convert_into_core_error() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(raw), Error::Json(_)));
    }
}
