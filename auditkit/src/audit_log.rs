//! FFI-safe entry point to the audit store.
//!
//! Addresses, amounts and selectors cross the boundary as strings: addresses
//! and selectors as `0x`-hex, amounts as decimal (hex is also accepted on input).

use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{Address, Selector, U256};
use auditkit_core::{
    AuditConfig, AuditStore, Authority, EnterOperation, ExitOperation, ManagementOperation,
    Operation, OperationLogged, OperationType, OwnerAuthority, SystemClock,
};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::AuditKitError;
use crate::primitives::ParseFromForeignBinding;

/// Authorization policy implemented in the host language.
#[uniffi::export(with_foreign)]
pub trait AuthorityCallback: Send + Sync {
    /// Returns whether `caller` (checksummed hex) may invoke `function_selector` (`0x`-hex).
    fn is_authorized(&self, caller: String, function_selector: String) -> bool;
}

struct ForeignAuthority(Arc<dyn AuthorityCallback>);

impl Authority for ForeignAuthority {
    fn is_authorized(&self, caller: Address, selector: Selector) -> bool {
        self.0
            .is_authorized(caller.to_checksum(None), selector.to_string())
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AuditLogConfig {
    /// Notifications buffered per subscription before it starts skipping.
    pub notification_capacity: u64,
    /// Seconds between ordering positions.
    pub block_interval_secs: u64,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        let config = AuditConfig::default();
        Self {
            notification_capacity: u64::try_from(config.notification_capacity)
                .unwrap_or(u64::MAX),
            block_interval_secs: config.block_interval_secs,
        }
    }
}

impl TryFrom<AuditLogConfig> for AuditConfig {
    type Error = AuditKitError;

    fn try_from(config: AuditLogConfig) -> Result<Self, Self::Error> {
        let capacity = usize::try_from(config.notification_capacity)
            .map_err(|e| AuditKitError::InvalidConfig(e.to_string()))?;
        Ok(Self::default()
            .with_notification_capacity(capacity)
            .with_block_interval_secs(config.block_interval_secs))
    }
}

/// Category of an operation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum OperationKind {
    /// Never issued.
    Unknown,
    /// Manager call.
    Management,
    /// Deposit.
    Enter,
    /// Withdrawal.
    Exit,
}

impl From<OperationType> for OperationKind {
    fn from(kind: OperationType) -> Self {
        match kind {
            OperationType::None => Self::Unknown,
            OperationType::Management => Self::Management,
            OperationType::Enter => Self::Enter,
            OperationType::Exit => Self::Exit,
        }
    }
}

/// A manager call.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ManagementOperationRecord {
    /// Checksummed address of the manager.
    pub caller: String,
    /// Checksummed address of the called contract.
    pub target: String,
    /// Native currency forwarded, decimal.
    pub value: String,
    /// `0x`-hex function selector.
    pub function_selector: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Ordering position.
    pub block_number: u64,
}

impl From<ManagementOperation> for ManagementOperationRecord {
    fn from(op: ManagementOperation) -> Self {
        Self {
            caller: op.caller.to_checksum(None),
            target: op.target.to_checksum(None),
            value: op.value.to_string(),
            function_selector: op.function_selector.to_string(),
            timestamp: op.timestamp,
            block_number: op.block_number,
        }
    }
}

/// A deposit.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct EnterOperationRecord {
    /// Depositor.
    pub from: String,
    /// Asset contract.
    pub asset: String,
    /// Asset amount, decimal.
    pub asset_amount: String,
    /// Share recipient.
    pub to: String,
    /// Shares minted, decimal.
    pub share_amount: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Ordering position.
    pub block_number: u64,
}

impl From<EnterOperation> for EnterOperationRecord {
    fn from(op: EnterOperation) -> Self {
        Self {
            from: op.from.to_checksum(None),
            asset: op.asset.to_checksum(None),
            asset_amount: op.asset_amount.to_string(),
            to: op.to.to_checksum(None),
            share_amount: op.share_amount.to_string(),
            timestamp: op.timestamp,
            block_number: op.block_number,
        }
    }
}

/// A withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ExitOperationRecord {
    /// Asset recipient.
    pub to: String,
    /// Asset contract.
    pub asset: String,
    /// Asset amount, decimal.
    pub asset_amount: String,
    /// Share holder.
    pub from: String,
    /// Shares burned, decimal.
    pub share_amount: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Ordering position.
    pub block_number: u64,
}

impl From<ExitOperation> for ExitOperationRecord {
    fn from(op: ExitOperation) -> Self {
        Self {
            to: op.to.to_checksum(None),
            asset: op.asset.to_checksum(None),
            asset_amount: op.asset_amount.to_string(),
            from: op.from.to_checksum(None),
            share_amount: op.share_amount.to_string(),
            timestamp: op.timestamp,
            block_number: op.block_number,
        }
    }
}

/// Any logged record.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum OperationRecord {
    /// Manager call.
    Management {
        /// The record.
        record: ManagementOperationRecord,
    },
    /// Deposit.
    Enter {
        /// The record.
        record: EnterOperationRecord,
    },
    /// Withdrawal.
    Exit {
        /// The record.
        record: ExitOperationRecord,
    },
}

impl From<Operation> for OperationRecord {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Management(op) => Self::Management { record: op.into() },
            Operation::Enter(op) => Self::Enter { record: op.into() },
            Operation::Exit(op) => Self::Exit { record: op.into() },
        }
    }
}

/// Notification for one appended record.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct OperationEvent {
    /// Identifier of the record.
    pub id: u64,
    /// The record as stored.
    pub operation: OperationRecord,
}

impl From<OperationLogged> for OperationEvent {
    fn from(event: OperationLogged) -> Self {
        Self {
            id: event.id,
            operation: event.operation.into(),
        }
    }
}

/// Pollable stream of [`OperationEvent`]s.
#[derive(uniffi::Object)]
pub struct OperationSubscription {
    receiver: Mutex<broadcast::Receiver<OperationLogged>>,
}

#[uniffi::export]
impl OperationSubscription {
    /// Returns the next pending event, or `None` if there is none yet.
    ///
    /// If the subscription fell behind, the oldest missed events are skipped.
    pub fn try_next(&self) -> Option<OperationEvent> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match receiver.try_recv() {
                Ok(event) => return Some(event.into()),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("operation subscription lagged, skipped {skipped} events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Append-only audit log of vault operations.
///
/// # Example (Swift)
///
/// ```swift
/// let log = try AuditLog.withOwner(owner: vaultAddress, config: config)
/// let id = try log.logEnterOperation(
///     sender: vaultAddress, from: user, asset: usdc,
///     assetAmount: "1000000", to: user, shareAmount: "999000")
/// let record = try log.enterOperation(id: id)
/// ```
#[derive(uniffi::Object)]
pub struct AuditLog {
    inner: AuditStore,
}

impl AuditLog {
    fn build(
        authority: Arc<dyn Authority>,
        config: AuditLogConfig,
    ) -> Result<Arc<Self>, AuditKitError> {
        let config = AuditConfig::try_from(config)?;
        let clock = Arc::new(SystemClock::from_config(&config));
        let inner = AuditStore::with_config(authority, clock, &config)?;
        Ok(Arc::new(Self { inner }))
    }
}

#[uniffi::export]
impl AuditLog {
    /// Creates a log that only `owner` may write to.
    ///
    /// # Errors
    ///
    /// Returns an error if `owner` is not an address or `config` is invalid.
    #[uniffi::constructor]
    pub fn with_owner(owner: &str, config: AuditLogConfig) -> Result<Arc<Self>, AuditKitError> {
        let owner = Address::parse_from_ffi(owner, "owner")?;
        Self::build(Arc::new(OwnerAuthority::new(owner)), config)
    }

    /// Creates a log whose writes are authorized by a host-provided policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    #[uniffi::constructor]
    pub fn with_authority(
        authority: Arc<dyn AuthorityCallback>,
        config: AuditLogConfig,
    ) -> Result<Arc<Self>, AuditKitError> {
        Self::build(Arc::new(ForeignAuthority(authority)), config)
    }

    /// Records a manager call. Returns the new identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument does not parse or `sender` is not authorized.
    pub fn log_management_operation(
        &self,
        sender: &str,
        caller: &str,
        target: &str,
        value: &str,
        function_selector: &str,
    ) -> Result<u64, AuditKitError> {
        Ok(self.inner.log_management_operation(
            Address::parse_from_ffi(sender, "sender")?,
            Address::parse_from_ffi(caller, "caller")?,
            Address::parse_from_ffi(target, "target")?,
            U256::parse_from_ffi(value, "value")?,
            Selector::parse_from_ffi(function_selector, "function_selector")?,
        )?)
    }

    /// Records a deposit. Returns the new identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument does not parse or `sender` is not authorized.
    pub fn log_enter_operation(
        &self,
        sender: &str,
        from: &str,
        asset: &str,
        asset_amount: &str,
        to: &str,
        share_amount: &str,
    ) -> Result<u64, AuditKitError> {
        Ok(self.inner.log_enter_operation(
            Address::parse_from_ffi(sender, "sender")?,
            Address::parse_from_ffi(from, "from")?,
            Address::parse_from_ffi(asset, "asset")?,
            U256::parse_from_ffi(asset_amount, "asset_amount")?,
            Address::parse_from_ffi(to, "to")?,
            U256::parse_from_ffi(share_amount, "share_amount")?,
        )?)
    }

    /// Records a withdrawal. Returns the new identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument does not parse or `sender` is not authorized.
    pub fn log_exit_operation(
        &self,
        sender: &str,
        to: &str,
        asset: &str,
        asset_amount: &str,
        from: &str,
        share_amount: &str,
    ) -> Result<u64, AuditKitError> {
        Ok(self.inner.log_exit_operation(
            Address::parse_from_ffi(sender, "sender")?,
            Address::parse_from_ffi(to, "to")?,
            Address::parse_from_ffi(asset, "asset")?,
            U256::parse_from_ffi(asset_amount, "asset_amount")?,
            Address::parse_from_ffi(from, "from")?,
            U256::parse_from_ffi(share_amount, "share_amount")?,
        )?)
    }

    /// Number of operations ever logged.
    #[must_use]
    pub fn total_operations(&self) -> u64 {
        self.inner.total_operations()
    }

    /// Whether `id` has been issued.
    #[must_use]
    pub fn operation_exists(&self, id: u64) -> bool {
        self.inner.operation_exists(id)
    }

    /// Category of `id`; [`OperationKind::Unknown`] if never issued.
    #[must_use]
    pub fn operation_type(&self, id: u64) -> OperationKind {
        self.inner.operation_type(id).into()
    }

    /// The manager call stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `WrongCategory` unless `id` holds a manager call.
    pub fn management_operation(
        &self,
        id: u64,
    ) -> Result<ManagementOperationRecord, AuditKitError> {
        Ok(self.inner.management_operation(id)?.into())
    }

    /// The deposit stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `WrongCategory` unless `id` holds a deposit.
    pub fn enter_operation(&self, id: u64) -> Result<EnterOperationRecord, AuditKitError> {
        Ok(self.inner.enter_operation(id)?.into())
    }

    /// The withdrawal stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `WrongCategory` unless `id` holds a withdrawal.
    pub fn exit_operation(&self, id: u64) -> Result<ExitOperationRecord, AuditKitError> {
        Ok(self.inner.exit_operation(id)?.into())
    }

    /// The record stored under `id`, whatever its category.
    #[must_use]
    pub fn operation(&self, id: u64) -> Option<OperationRecord> {
        self.inner.operation(id).map(Into::into)
    }

    /// Subscribes to every subsequent append.
    #[must_use]
    pub fn subscribe(&self) -> Arc<OperationSubscription> {
        Arc::new(OperationSubscription {
            receiver: Mutex::new(self.inner.subscribe()),
        })
    }
}
