//! Parsing of string-encoded EVM primitives received over FFI.

use std::str::FromStr;

use alloy_primitives::{Address, Selector, U256};

use crate::error::AuditKitError;

/// A trait for parsing primitive types from foreign bindings.
///
/// This trait is used to parse primitive types from foreign provided values. For example, parsing
/// a stringified address into an `Address` type.
///
/// # Examples
/// ```rust,ignore
/// let address = Address::parse_from_ffi("0x1234567890abcdef1234567890abcdef12345678", "owner");
/// ```
///
/// # Errors
/// - `AuditKitError::InvalidInput` if the provided string cannot be parsed.
pub trait ParseFromForeignBinding {
    /// Parses `s`, naming `attr` in the error on failure.
    ///
    /// # Errors
    /// - `AuditKitError::InvalidInput` if `s` is not a valid value.
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, AuditKitError>
    where
        Self: Sized;
}

fn invalid_input(attr: &'static str, reason: impl ToString) -> AuditKitError {
    AuditKitError::InvalidInput {
        attribute: attr.to_string(),
        reason: reason.to_string(),
    }
}

impl ParseFromForeignBinding for Address {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, AuditKitError> {
        Self::from_str(s.trim()).map_err(|e| invalid_input(attr, e))
    }
}

/// Accepts decimal or `0x`-prefixed hex.
impl ParseFromForeignBinding for U256 {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, AuditKitError> {
        Self::from_str(s.trim()).map_err(|e| invalid_input(attr, e))
    }
}

/// Exactly four bytes of hex, `0x` prefix optional.
impl ParseFromForeignBinding for Selector {
    fn parse_from_ffi(s: &str, attr: &'static str) -> Result<Self, AuditKitError> {
        Self::from_str(s.trim()).map_err(|e| invalid_input(attr, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address = Address::parse_from_ffi(
            " 0x00000000000000000000000000000000000000aa ",
            "owner",
        )
        .unwrap();
        assert_eq!(address, Address::with_last_byte(0xaa));

        let err = Address::parse_from_ffi("0x1234", "owner").unwrap_err();
        assert!(err.to_string().starts_with("invalid_input_owner"));
    }

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(
            U256::parse_from_ffi("1000", "value").unwrap(),
            U256::from(1000)
        );
        assert_eq!(
            U256::parse_from_ffi("0x3e8", "value").unwrap(),
            U256::from(1000)
        );
        assert!(U256::parse_from_ffi("-1", "value").is_err());
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            Selector::parse_from_ffi("0xdeadbeef", "function_selector").unwrap(),
            Selector::new([0xde, 0xad, 0xbe, 0xef])
        );
        assert!(Selector::parse_from_ffi("0xdeadbeef00", "function_selector").is_err());
    }
}
