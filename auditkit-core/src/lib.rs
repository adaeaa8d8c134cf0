//! Append-only audit log for custodial vault operations.
//!
//! The [`AuditStore`] records three kinds of privileged operations, each under
//! a dense, strictly increasing [`OperationId`]:
//!
//! - [`ManagementOperation`]: an arbitrary call the vault manager made.
//! - [`EnterOperation`]: a deposit that minted shares.
//! - [`ExitOperation`]: a withdrawal that burned shares.
//!
//! Writes are gated by an [`Authority`] and stamped by a [`Clock`]; reads are
//! open to anyone and fail fast with [`AuditError::WrongCategory`] when the
//! identifier does not hold the requested kind of record.

pub mod authority;
pub use authority::{Authority, OwnerAuthority, RolesAuthority, WriteEntryPoint};

pub mod clock;
pub use clock::{BlockContext, Clock, ManualClock, SystemClock};

mod config;
pub use config::AuditConfig;

mod error;
pub use error::{AuditError, AuditResult};

mod store;
pub use store::AuditStore;

mod types;
pub use types::{
    EnterOperation, ExitOperation, ManagementOperation, Operation, OperationId,
    OperationLogged, OperationType,
};
