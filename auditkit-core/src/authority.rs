//! Authorization policies consulted before every write.
//!
//! The store only needs a yes/no answer for `(caller, selector)`. Policies are
//! injected at construction and never see the stored records.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy_primitives::{keccak256, Address, Selector, U256};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Capability check for write entry points.
pub trait Authority: Send + Sync {
    /// Returns whether `caller` may invoke the function identified by `selector`.
    fn is_authorized(&self, caller: Address, selector: Selector) -> bool;
}

impl<F> Authority for F
where
    F: Fn(Address, Selector) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller: Address, selector: Selector) -> bool {
        self(caller, selector)
    }
}

/// Returns the first four bytes of the keccak-256 hash of `signature`.
///
/// # Examples
///
/// ```rust
/// use alloy_primitives::Selector;
/// use auditkit_core::authority::selector_for;
///
/// assert_eq!(
///     selector_for("transfer(address,uint256)"),
///     Selector::new([0xa9, 0x05, 0x9c, 0xbb])
/// );
/// ```
#[must_use]
pub fn selector_for(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// The write entry points of the audit store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum WriteEntryPoint {
    /// Appends a [`ManagementOperation`](crate::ManagementOperation).
    #[strum(serialize = "logManagementOperation")]
    LogManagementOperation,
    /// Appends an [`EnterOperation`](crate::EnterOperation).
    #[strum(serialize = "logEnterOperation")]
    LogEnterOperation,
    /// Appends an [`ExitOperation`](crate::ExitOperation).
    #[strum(serialize = "logExitOperation")]
    LogExitOperation,
}

impl WriteEntryPoint {
    /// All write entry points.
    pub const ALL: [Self; 3] = [
        Self::LogManagementOperation,
        Self::LogEnterOperation,
        Self::LogExitOperation,
    ];

    /// Canonical ABI signature of the entry point.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::LogManagementOperation => {
                "logManagementOperation(address,address,uint256,bytes4)"
            }
            Self::LogEnterOperation => {
                "logEnterOperation(address,address,uint256,address,uint256)"
            }
            Self::LogExitOperation => {
                "logExitOperation(address,address,uint256,address,uint256)"
            }
        }
    }

    /// Selector policies are keyed by.
    #[must_use]
    pub fn selector(self) -> Selector {
        selector_for(self.signature())
    }
}

/// Authorizes a single owner and nobody else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerAuthority {
    owner: Address,
}

impl OwnerAuthority {
    /// Creates a policy owned by `owner`.
    #[must_use]
    pub const fn new(owner: Address) -> Self {
        Self { owner }
    }

    /// The sole authorized address.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }
}

impl Authority for OwnerAuthority {
    fn is_authorized(&self, caller: Address, _selector: Selector) -> bool {
        caller == self.owner
    }
}

#[derive(Debug, Default)]
struct RoleTable {
    user_roles: HashMap<Address, U256>,
    role_capabilities: HashMap<Selector, U256>,
    public_capabilities: HashMap<Selector, bool>,
}

/// Role-based policy with up to 256 roles.
///
/// A caller is authorized when it is the owner, when the selector is public,
/// or when it holds any role that carries the selector's capability. Roles and
/// capabilities are bitmasks, one bit per role.
#[derive(Debug)]
pub struct RolesAuthority {
    owner: Address,
    table: RwLock<RoleTable>,
}

impl RolesAuthority {
    /// Creates an empty policy; only `owner` is authorized until roles are granted.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            table: RwLock::new(RoleTable::default()),
        }
    }

    /// The address that bypasses role checks.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Grants or revokes `role` for `user`.
    pub fn set_user_role(&self, user: Address, role: u8, enabled: bool) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user_roles
            .entry(user)
            .or_default()
            .set_bit(usize::from(role), enabled);
        log::debug!("role {role} for {user} set to {enabled}");
    }

    /// Grants or revokes the capability to call `selector` for holders of `role`.
    pub fn set_role_capability(&self, role: u8, selector: Selector, enabled: bool) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .role_capabilities
            .entry(selector)
            .or_default()
            .set_bit(usize::from(role), enabled);
        log::debug!("capability {selector} for role {role} set to {enabled}");
    }

    /// Opens or closes `selector` to every caller.
    pub fn set_public_capability(&self, selector: Selector, enabled: bool) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .public_capabilities
            .insert(selector, enabled);
        log::debug!("public capability {selector} set to {enabled}");
    }

    /// Returns whether `user` holds `role`.
    #[must_use]
    pub fn does_user_have_role(&self, user: Address, role: u8) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_roles
            .get(&user)
            .is_some_and(|roles| roles.bit(usize::from(role)))
    }

    /// Returns whether `role` carries the capability to call `selector`.
    #[must_use]
    pub fn does_role_have_capability(&self, role: u8, selector: Selector) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .role_capabilities
            .get(&selector)
            .is_some_and(|roles| roles.bit(usize::from(role)))
    }

    /// Returns whether `selector` is open to every caller.
    #[must_use]
    pub fn is_capability_public(&self, selector: Selector) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .public_capabilities
            .get(&selector)
            .copied()
            .unwrap_or(false)
    }
}

impl Authority for RolesAuthority {
    fn is_authorized(&self, caller: Address, selector: Selector) -> bool {
        if caller == self.owner {
            return true;
        }
        let (public, user_roles, capable_roles) = {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            (
                table
                    .public_capabilities
                    .get(&selector)
                    .copied()
                    .unwrap_or(false),
                table.user_roles.get(&caller).copied().unwrap_or_default(),
                table
                    .role_capabilities
                    .get(&selector)
                    .copied()
                    .unwrap_or_default(),
            )
        };
        public || (user_roles & capable_roles) != U256::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::new([0x0a; 20]);
    const MANAGER: Address = Address::new([0x0b; 20]);
    const STRANGER: Address = Address::new([0x0c; 20]);

    #[test]
    fn test_known_selector() {
        assert_eq!(
            selector_for("transfer(address,uint256)"),
            Selector::new([0xa9, 0x05, 0x9c, 0xbb])
        );
    }

    #[test]
    fn test_entry_point_selectors_are_distinct() {
        let [a, b, c] = WriteEntryPoint::ALL.map(WriteEntryPoint::selector);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert_eq!(
            WriteEntryPoint::LogEnterOperation.selector(),
            selector_for(WriteEntryPoint::LogEnterOperation.signature())
        );
        assert_eq!(
            WriteEntryPoint::LogExitOperation.to_string(),
            "logExitOperation"
        );
    }

    #[test]
    fn test_owner_authority() {
        let authority = OwnerAuthority::new(OWNER);
        let selector = WriteEntryPoint::LogManagementOperation.selector();
        assert!(authority.is_authorized(OWNER, selector));
        assert!(!authority.is_authorized(STRANGER, selector));
    }

    #[test]
    fn test_closure_authority() {
        let enter = WriteEntryPoint::LogEnterOperation.selector();
        let authority = move |_: Address, selector: Selector| selector == enter;
        assert!(authority.is_authorized(STRANGER, enter));
        assert!(!authority.is_authorized(
            STRANGER,
            WriteEntryPoint::LogExitOperation.selector()
        ));
    }

    #[test]
    fn test_roles_authority_owner_bypass() {
        let authority = RolesAuthority::new(OWNER);
        assert!(authority.is_authorized(OWNER, Selector::ZERO));
        assert!(!authority.is_authorized(MANAGER, Selector::ZERO));
    }

    #[test]
    fn test_roles_authority_role_capability() {
        let authority = RolesAuthority::new(OWNER);
        let manage = WriteEntryPoint::LogManagementOperation.selector();
        let exit = WriteEntryPoint::LogExitOperation.selector();

        authority.set_user_role(MANAGER, 200, true);
        authority.set_role_capability(200, manage, true);

        assert!(authority.does_user_have_role(MANAGER, 200));
        assert!(authority.does_role_have_capability(200, manage));
        assert!(authority.is_authorized(MANAGER, manage));
        assert!(!authority.is_authorized(MANAGER, exit));
        assert!(!authority.is_authorized(STRANGER, manage));

        authority.set_user_role(MANAGER, 200, false);
        assert!(!authority.is_authorized(MANAGER, manage));
    }

    #[test]
    fn test_roles_authority_public_capability() {
        let authority = RolesAuthority::new(OWNER);
        let enter = WriteEntryPoint::LogEnterOperation.selector();

        assert!(!authority.is_capability_public(enter));
        authority.set_public_capability(enter, true);
        assert!(authority.is_capability_public(enter));
        assert!(authority.is_authorized(STRANGER, enter));

        authority.set_public_capability(enter, false);
        assert!(!authority.is_authorized(STRANGER, enter));
    }

    #[test]
    fn test_roles_authority_updates_while_checking() {
        let authority = std::sync::Arc::new(RolesAuthority::new(OWNER));
        let manage = WriteEntryPoint::LogManagementOperation.selector();
        authority.set_role_capability(7, manage, true);

        let checker = {
            let authority = std::sync::Arc::clone(&authority);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    let _ = authority.is_authorized(MANAGER, manage);
                }
            })
        };
        for round in 0..1_000 {
            authority.set_user_role(MANAGER, 7, round % 2 == 0);
        }
        checker.join().unwrap();

        assert!(!authority.does_user_have_role(MANAGER, 7));
        assert!(!authority.is_authorized(MANAGER, manage));
    }
}
