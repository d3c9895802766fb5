//! Error types for the audit crate.

use thiserror::Error;

/// Errors produced by the audit logger and its storage backends.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A storage backend rejected an operation.
    #[error("audit storage error: {0}")]
    Storage(String),

    /// An event failed to serialize to its JSON-line form.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The log file could not be opened or appended to.
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_carry_their_context() {
        let err = AuditError::Storage("lock poisoned".to_string());
        assert_eq!(err.to_string(), "audit storage error: lock poisoned");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AuditError = io.into();
        assert!(matches!(err, AuditError::Io(_)));
    }
}
