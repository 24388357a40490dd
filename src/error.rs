// ❌ Errors - Typed failures for close operations

use thiserror::Error;

/// Errors surfaced by the close engine and its front-ends.
///
/// The reducer itself never fails; it reports an [`Outcome`](crate::reducer::Outcome).
/// These errors exist for callers that need an explicit signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloseError {
    /// No exception with this id in the snapshot.
    #[error("exception not found: {0}")]
    ExceptionNotFound(String),

    /// No checklist task with this id in the snapshot.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// No source document with this id in the lineage catalog.
    #[error("source document not found: {0}")]
    DocumentNotFound(String),

    /// No seed for this task list.
    #[error("unknown task list: {0}")]
    UnknownTaskList(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown automation: {0}")]
    UnknownAutomation(String),

    /// Username or password was blank.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    /// The same automation is already pending for this session.
    #[error("automation already running: {0}")]
    AutomationInFlight(String),
}

/// Result type alias for close operations.
pub type Result<T> = std::result::Result<T, CloseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CloseError::ExceptionNotFound("EXC-404".to_string()).to_string(),
            "exception not found: EXC-404"
        );
        assert_eq!(CloseError::SessionExpired.to_string(), "session expired");
        assert_eq!(
            CloseError::AutomationInFlight("intercompany".to_string()).to_string(),
            "automation already running: intercompany"
        );
    }
}
