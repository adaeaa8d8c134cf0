//! Record shapes stored by the audit log.
//!
//! Every record is stamped with the [`BlockContext`] that was current when it
//! was appended. Records are never mutated after they are stored; readers
//! always receive copies.

use alloy_primitives::{Address, BlockNumber, Selector, U256};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::clock::BlockContext;
use crate::error::AuditError;

/// Identifier of a logged operation.
///
/// Issued identifiers start at `1` and are dense; `0` is never issued.
pub type OperationId = u64;

/// Category tag of an operation identifier.
///
/// The discriminants match the on-chain tag so exported values line up with
/// what indexers already store.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperationType {
    /// The identifier was never issued.
    #[default]
    None = 0,
    /// An arbitrary call made by the vault manager.
    Management = 1,
    /// A deposit that minted vault shares.
    Enter = 2,
    /// A withdrawal that burned vault shares.
    Exit = 3,
}

impl OperationType {
    /// Returns the on-chain discriminant.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OperationType {
    type Error = AuditError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Management),
            2 => Ok(Self::Enter),
            3 => Ok(Self::Exit),
            _ => Err(AuditError::InvalidOperationType(value)),
        }
    }
}

/// An arbitrary privileged call the vault manager made against `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementOperation {
    /// The manager that initiated the call.
    pub caller: Address,
    /// The contract that was called.
    pub target: Address,
    /// Native currency forwarded with the call.
    pub value: U256,
    /// Selector of the invoked function. Opaque, never decoded.
    pub function_selector: Selector,
    /// Seconds since the Unix epoch at append time.
    pub timestamp: u64,
    /// Ordering position at append time.
    pub block_number: BlockNumber,
}

/// A deposit of `asset` that minted vault shares to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterOperation {
    /// The depositor.
    pub from: Address,
    /// The deposited asset contract.
    pub asset: Address,
    /// Amount of `asset` deposited.
    pub asset_amount: U256,
    /// Recipient of the minted shares.
    pub to: Address,
    /// Amount of shares minted.
    pub share_amount: U256,
    /// Seconds since the Unix epoch at append time.
    pub timestamp: u64,
    /// Ordering position at append time.
    pub block_number: BlockNumber,
}

/// A withdrawal of `asset` to `to` that burned shares held by `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOperation {
    /// Recipient of the withdrawn asset.
    pub to: Address,
    /// The withdrawn asset contract.
    pub asset: Address,
    /// Amount of `asset` withdrawn.
    pub asset_amount: U256,
    /// Holder whose shares were burned.
    pub from: Address,
    /// Amount of shares burned.
    pub share_amount: U256,
    /// Seconds since the Unix epoch at append time.
    pub timestamp: u64,
    /// Ordering position at append time.
    pub block_number: BlockNumber,
}

/// Any of the three record kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// A manager call.
    Management(ManagementOperation),
    /// A deposit.
    Enter(EnterOperation),
    /// A withdrawal.
    Exit(ExitOperation),
}

impl Operation {
    /// Returns the category tag of this record.
    #[must_use]
    pub const fn kind(&self) -> OperationType {
        match self {
            Self::Management(_) => OperationType::Management,
            Self::Enter(_) => OperationType::Enter,
            Self::Exit(_) => OperationType::Exit,
        }
    }

    /// Returns the stamp the record was written with.
    #[must_use]
    pub const fn block_context(&self) -> BlockContext {
        let (timestamp, block_number) = match self {
            Self::Management(op) => (op.timestamp, op.block_number),
            Self::Enter(op) => (op.timestamp, op.block_number),
            Self::Exit(op) => (op.timestamp, op.block_number),
        };
        BlockContext {
            timestamp,
            block_number,
        }
    }
}

/// Change notification broadcast after every successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogged {
    /// Identifier assigned to the record.
    pub id: OperationId,
    /// The record exactly as stored.
    pub operation: Operation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_operation_type_discriminants() {
        for kind in [
            OperationType::None,
            OperationType::Management,
            OperationType::Enter,
            OperationType::Exit,
        ] {
            assert_eq!(OperationType::try_from(kind.as_u8()).unwrap(), kind);
        }
        assert_eq!(OperationType::Exit.as_u8(), 3);
        assert!(OperationType::try_from(4).is_err());
    }

    #[test]
    fn test_operation_type_strings() {
        assert_eq!(OperationType::Management.to_string(), "management");
        assert_eq!(
            OperationType::from_str("exit").unwrap(),
            OperationType::Exit
        );
        assert_eq!(OperationType::default(), OperationType::None);
    }

    #[test]
    fn test_operation_serializes_with_type_tag() {
        let operation = Operation::Enter(EnterOperation {
            from: Address::repeat_byte(0x01),
            asset: Address::repeat_byte(0x02),
            asset_amount: U256::from(1_000),
            to: Address::repeat_byte(0x03),
            share_amount: U256::from(990),
            timestamp: 1_700_000_000,
            block_number: 42,
        });

        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["type"], "enter");
        assert_eq!(json["block_number"], 42);

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, operation);
        assert_eq!(back.kind(), OperationType::Enter);
        assert_eq!(
            back.block_context(),
            BlockContext {
                timestamp: 1_700_000_000,
                block_number: 42,
            }
        );
    }
}
