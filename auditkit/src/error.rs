//! Errors surfaced to foreign callers.

use auditkit_core::AuditError;
use thiserror::Error;

/// Error outputs from `AuditKit`
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum AuditKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The argument that failed to parse
        attribute: String,
        /// Why it failed
        reason: String,
    },
    /// The caller may not invoke the write entry point
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The identifier does not hold the requested kind of record
    #[error("wrong_category: {0}")]
    WrongCategory(String),
    /// The configuration cannot be used
    #[error("invalid_config: {0}")]
    InvalidConfig(String),
}

impl From<AuditError> for AuditKitError {
    fn from(error: AuditError) -> Self {
        match error {
            AuditError::Unauthorized { .. } => Self::Unauthorized(error.to_string()),
            AuditError::WrongCategory { .. } => Self::WrongCategory(error.to_string()),
            AuditError::InvalidConfig(reason) => Self::InvalidConfig(reason),
            AuditError::InvalidOperationType(value) => Self::InvalidInput {
                attribute: "operation_type".to_string(),
                reason: format!("unknown discriminant {value}"),
            },
        }
    }
}
