/// Failures reported by the submission, progress and question clients.
///
/// Cloneable and comparable so it can travel inside [`crate::Msg`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("authentication expired or rejected")]
    AuthenticationExpired,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("remote error {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("no progress received for {idle_secs}s")]
    Stalled { idle_secs: u64 },
}

impl ClientError {
    /// True for the two authentication variants; the caller should prompt for
    /// a new login.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationRequired | ClientError::AuthenticationExpired
        )
    }
}
