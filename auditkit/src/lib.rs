//! Foreign bindings for the vault audit log.
//!
//! Swift and Kotlin hosts create an [`AuditLog`], record operations through it
//! and poll an [`OperationSubscription`] for change notifications. Logging from
//! the store is forwarded to a host [`logger::Logger`].

pub mod audit_log;
pub use audit_log::*;

pub mod error;
pub use error::*;

pub mod logger;

pub mod primitives;

uniffi::setup_scaffolding!("auditkit");
