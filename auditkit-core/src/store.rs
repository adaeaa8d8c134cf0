//! The append-only audit store.
//!
//! Writes are gated by an injected [`Authority`] and serialized through a
//! single lock, so identifier allocation, insertion, tagging and notification
//! form one indivisible step. Reads never require authorization.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy_primitives::{Address, Selector, U256};
use tokio::sync::broadcast;

use crate::authority::{Authority, WriteEntryPoint};
use crate::clock::{BlockContext, Clock};
use crate::config::AuditConfig;
use crate::error::{AuditError, AuditResult};
use crate::types::{
    EnterOperation, ExitOperation, ManagementOperation, Operation, OperationId,
    OperationLogged, OperationType,
};

/// Mutable state guarded by the store lock.
#[derive(Debug)]
struct Ledger {
    next_id: OperationId,
    management: HashMap<OperationId, ManagementOperation>,
    enter: HashMap<OperationId, EnterOperation>,
    exit: HashMap<OperationId, ExitOperation>,
    kinds: HashMap<OperationId, OperationType>,
    last_context: BlockContext,
}

impl Ledger {
    fn new() -> Self {
        Self {
            next_id: 1,
            management: HashMap::new(),
            enter: HashMap::new(),
            exit: HashMap::new(),
            kinds: HashMap::new(),
            last_context: BlockContext::default(),
        }
    }

    fn kind(&self, id: OperationId) -> OperationType {
        self.kinds.get(&id).copied().unwrap_or_default()
    }

    /// Clamps `context` so stamps never decrease across identifiers.
    fn stamp(&mut self, context: BlockContext) -> BlockContext {
        let stamped = context.at_least(self.last_context);
        if stamped != context {
            log::warn!(
                "clock went backwards ({context:?} < {:?}); reusing last stamp",
                self.last_context
            );
        }
        self.last_context = stamped;
        stamped
    }

    fn insert(&mut self, id: OperationId, operation: Operation) {
        self.kinds.insert(id, operation.kind());
        match operation {
            Operation::Management(op) => {
                self.management.insert(id, op);
            }
            Operation::Enter(op) => {
                self.enter.insert(id, op);
            }
            Operation::Exit(op) => {
                self.exit.insert(id, op);
            }
        }
    }
}

/// Append-only store of vault operations keyed by [`OperationId`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use alloy_primitives::{Address, Selector, U256};
/// use auditkit_core::{AuditStore, ManualClock, OperationType, OwnerAuthority};
///
/// let vault = Address::repeat_byte(0x01);
/// let store = AuditStore::new(
///     Arc::new(OwnerAuthority::new(vault)),
///     Arc::new(ManualClock::default()),
/// );
///
/// let id = store
///     .log_management_operation(
///         vault,
///         Address::repeat_byte(0x0a),
///         Address::repeat_byte(0x0b),
///         U256::ZERO,
///         Selector::new([0xde, 0xad, 0xbe, 0xef]),
///     )
///     .unwrap();
///
/// assert_eq!(id, 1);
/// assert_eq!(store.operation_type(id), OperationType::Management);
/// assert!(store.enter_operation(id).is_err());
/// ```
pub struct AuditStore {
    ledger: RwLock<Ledger>,
    authority: Arc<dyn Authority>,
    clock: Arc<dyn Clock>,
    notifier: broadcast::Sender<OperationLogged>,
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore")
            .field("total_operations", &self.total_operations())
            .field("subscribers", &self.notifier.receiver_count())
            .finish_non_exhaustive()
    }
}

impl AuditStore {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new(authority: Arc<dyn Authority>, clock: Arc<dyn Clock>) -> Self {
        let (notifier, _) =
            broadcast::channel(AuditConfig::default().notification_capacity);
        Self {
            ledger: RwLock::new(Ledger::new()),
            authority,
            clock,
            notifier,
        }
    }

    /// Creates an empty store from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(
        authority: Arc<dyn Authority>,
        clock: Arc<dyn Clock>,
        config: &AuditConfig,
    ) -> AuditResult<Self> {
        config.validate()?;
        let (notifier, _) = broadcast::channel(config.notification_capacity);
        Ok(Self {
            ledger: RwLock::new(Ledger::new()),
            authority,
            clock,
            notifier,
        })
    }

    /// Subscribes to change notifications for every subsequent append.
    ///
    /// Notifications arrive in identifier order. A subscriber that falls more
    /// than the configured capacity behind receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OperationLogged> {
        self.notifier.subscribe()
    }

    // Writes

    /// Records a call the vault manager made against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Unauthorized`] if `sender` may not call
    /// [`WriteEntryPoint::LogManagementOperation`]. Nothing is recorded.
    pub fn log_management_operation(
        &self,
        sender: Address,
        caller: Address,
        target: Address,
        value: U256,
        function_selector: Selector,
    ) -> AuditResult<OperationId> {
        self.ensure_authorized(sender, WriteEntryPoint::LogManagementOperation)?;
        Ok(self.append(|context| {
            Operation::Management(ManagementOperation {
                caller,
                target,
                value,
                function_selector,
                timestamp: context.timestamp,
                block_number: context.block_number,
            })
        }))
    }

    /// Records a deposit that minted vault shares.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Unauthorized`] if `sender` may not call
    /// [`WriteEntryPoint::LogEnterOperation`]. Nothing is recorded.
    pub fn log_enter_operation(
        &self,
        sender: Address,
        from: Address,
        asset: Address,
        asset_amount: U256,
        to: Address,
        share_amount: U256,
    ) -> AuditResult<OperationId> {
        self.ensure_authorized(sender, WriteEntryPoint::LogEnterOperation)?;
        Ok(self.append(|context| {
            Operation::Enter(EnterOperation {
                from,
                asset,
                asset_amount,
                to,
                share_amount,
                timestamp: context.timestamp,
                block_number: context.block_number,
            })
        }))
    }

    /// Records a withdrawal that burned vault shares.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Unauthorized`] if `sender` may not call
    /// [`WriteEntryPoint::LogExitOperation`]. Nothing is recorded.
    pub fn log_exit_operation(
        &self,
        sender: Address,
        to: Address,
        asset: Address,
        asset_amount: U256,
        from: Address,
        share_amount: U256,
    ) -> AuditResult<OperationId> {
        self.ensure_authorized(sender, WriteEntryPoint::LogExitOperation)?;
        Ok(self.append(|context| {
            Operation::Exit(ExitOperation {
                to,
                asset,
                asset_amount,
                from,
                share_amount,
                timestamp: context.timestamp,
                block_number: context.block_number,
            })
        }))
    }

    // Reads

    /// Number of operations ever logged.
    #[must_use]
    pub fn total_operations(&self) -> u64 {
        self.read_ledger().next_id - 1
    }

    /// Returns whether `id` has been issued.
    #[must_use]
    pub fn operation_exists(&self, id: OperationId) -> bool {
        id >= 1 && id < self.read_ledger().next_id
    }

    /// Returns the category of `id`, or [`OperationType::None`] if it was never issued.
    #[must_use]
    pub fn operation_type(&self, id: OperationId) -> OperationType {
        self.read_ledger().kind(id)
    }

    /// Returns the management record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::WrongCategory`] unless `id` is tagged
    /// [`OperationType::Management`].
    pub fn management_operation(&self, id: OperationId) -> AuditResult<ManagementOperation> {
        let ledger = self.read_ledger();
        Self::ensure_kind(&ledger, id, OperationType::Management)?;
        ledger
            .management
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::wrong_category(&ledger, id, OperationType::Management))
    }

    /// Returns the deposit record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::WrongCategory`] unless `id` is tagged
    /// [`OperationType::Enter`].
    pub fn enter_operation(&self, id: OperationId) -> AuditResult<EnterOperation> {
        let ledger = self.read_ledger();
        Self::ensure_kind(&ledger, id, OperationType::Enter)?;
        ledger
            .enter
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::wrong_category(&ledger, id, OperationType::Enter))
    }

    /// Returns the withdrawal record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::WrongCategory`] unless `id` is tagged
    /// [`OperationType::Exit`].
    pub fn exit_operation(&self, id: OperationId) -> AuditResult<ExitOperation> {
        let ledger = self.read_ledger();
        Self::ensure_kind(&ledger, id, OperationType::Exit)?;
        ledger
            .exit
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::wrong_category(&ledger, id, OperationType::Exit))
    }

    /// Returns the record stored under `id` whatever its category.
    #[must_use]
    pub fn operation(&self, id: OperationId) -> Option<Operation> {
        let ledger = self.read_ledger();
        match ledger.kind(id) {
            OperationType::None => None,
            OperationType::Management => {
                ledger.management.get(&id).cloned().map(Operation::Management)
            }
            OperationType::Enter => ledger.enter.get(&id).cloned().map(Operation::Enter),
            OperationType::Exit => ledger.exit.get(&id).cloned().map(Operation::Exit),
        }
    }

    // Internals

    fn ensure_authorized(
        &self,
        sender: Address,
        entry_point: WriteEntryPoint,
    ) -> AuditResult<()> {
        if self.authority.is_authorized(sender, entry_point.selector()) {
            return Ok(());
        }
        log::warn!("rejected {entry_point} from unauthorized caller {sender}");
        Err(AuditError::Unauthorized {
            caller: sender,
            entry_point,
        })
    }

    /// Allocates the next identifier and stores the record built for it.
    ///
    /// The notification is sent before the lock is released so subscribers
    /// see identifiers in allocation order.
    // The guard spans the send to keep notifications in id order.
    #[allow(clippy::significant_drop_tightening)]
    fn append(&self, build: impl FnOnce(BlockContext) -> Operation) -> OperationId {
        let mut ledger = self.write_ledger();
        let context = ledger.stamp(self.clock.block_context());
        let id = ledger.next_id;
        ledger.next_id += 1;

        let operation = build(context);
        let kind = operation.kind();
        ledger.insert(id, operation.clone());

        // No subscribers is not an error.
        let _ = self.notifier.send(OperationLogged { id, operation });
        log::debug!(
            "logged {kind} operation {id} at block {}",
            context.block_number
        );
        id
    }

    fn ensure_kind(
        ledger: &Ledger,
        id: OperationId,
        expected: OperationType,
    ) -> AuditResult<()> {
        if ledger.kind(id) == expected {
            Ok(())
        } else {
            log::trace!("operation {id} is not a {expected} operation");
            Err(Self::wrong_category(ledger, id, expected))
        }
    }

    fn wrong_category(ledger: &Ledger, id: OperationId, expected: OperationType) -> AuditError {
        AuditError::WrongCategory {
            id,
            expected,
            found: ledger.kind(id),
        }
    }

    fn read_ledger(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_ledger(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}
