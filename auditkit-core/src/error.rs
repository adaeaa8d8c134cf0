//! Error types for the audit store.

use alloy_primitives::Address;
use thiserror::Error;

use crate::authority::WriteEntryPoint;
use crate::types::{OperationId, OperationType};

/// Result type for audit store operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors raised by the audit store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The caller failed the authorization check for a write entry point.
    ///
    /// Raised before any state is touched; the store is left unchanged.
    #[error("unauthorized: {caller} may not call {entry_point}")]
    Unauthorized {
        /// The actor that attempted the write.
        caller: Address,
        /// The entry point that was invoked.
        entry_point: WriteEntryPoint,
    },

    /// The identifier is not tagged with the category the getter expects.
    ///
    /// Never-issued identifiers are tagged [`OperationType::None`], so they
    /// always end up here.
    #[error("wrong category for operation {id}: expected {expected}, found {found}")]
    WrongCategory {
        /// The requested identifier.
        id: OperationId,
        /// The category the getter serves.
        expected: OperationType,
        /// The category the identifier is actually tagged with.
        found: OperationType,
    },

    /// A raw category discriminant does not name any category.
    #[error("invalid operation type: {0}")]
    InvalidOperationType(u8),

    /// The supplied configuration cannot be used to build a store.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
