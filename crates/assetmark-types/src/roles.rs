//! Role capabilities for administrative operations.
//!
//! Each component is constructed with an [`AccessControl`] object instead
//! of a single hardwired owner address. A role can be held by any number
//! of accounts, which makes multi-admin setups and multi-role test
//! fixtures straightforward.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetmarkError, Result};

/// Administrative roles recognized across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May flip the `verified` flag on asset records.
    Registrar,
    /// May mint, reprice, pause, and drain the credit ledger.
    LedgerAdmin,
    /// May reconfigure currencies and withdraw gateway collections.
    GatewayAdmin,
    /// May cancel listings, set fees, and sweep stray marketplace funds.
    MarketAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registrar => write!(f, "REGISTRAR"),
            Self::LedgerAdmin => write!(f, "LEDGER_ADMIN"),
            Self::GatewayAdmin => write!(f, "GATEWAY_ADMIN"),
            Self::MarketAdmin => write!(f, "MARKET_ADMIN"),
        }
    }
}

/// Role → account-set capability table, injected at component construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    grants: HashMap<Role, HashSet<AccountId>>,
}

impl AccessControl {
    /// Create an empty table (no account holds any role).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a table with a single grant.
    #[must_use]
    pub fn single(role: Role, account: AccountId) -> Self {
        let mut ac = Self::new();
        ac.grant(role, account);
        ac
    }

    /// Grant `role` to `account`. Idempotent.
    pub fn grant(&mut self, role: Role, account: AccountId) {
        self.grants.entry(role).or_default().insert(account);
    }

    /// Revoke `role` from `account`. No-op if not held.
    pub fn revoke(&mut self, role: Role, account: &AccountId) {
        if let Some(holders) = self.grants.get_mut(&role) {
            holders.remove(account);
        }
    }

    /// Whether `account` holds `role`.
    #[must_use]
    pub fn has(&self, role: Role, account: &AccountId) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|holders| holders.contains(account))
    }

    /// Guard an admin entry point.
    ///
    /// # Errors
    /// Returns [`AssetmarkError::RoleRequired`] if `account` lacks `role`.
    pub fn ensure(&self, role: Role, account: &AccountId) -> Result<()> {
        if self.has(role, account) {
            Ok(())
        } else {
            Err(AssetmarkError::RoleRequired { role })
        }
    }

    /// Number of accounts holding `role`.
    #[must_use]
    pub fn holder_count(&self, role: Role) -> usize {
        self.grants.get(&role).map_or(0, HashSet::len)
    }
}
