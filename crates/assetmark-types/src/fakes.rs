//! In-memory fakes for the collaborator seams. **Never use in production.**
//!
//! Gated behind the `test-helpers` feature (and `cfg(test)`), mirroring
//! how dummy fixtures are exposed elsewhere in the workspace. The fakes
//! are deliberately small and deliberately breakable: both can be told to
//! fail so tests can prove that callers roll back cleanly.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{AccountId, AssetmarkError, FundsOutlet, FungibleCurrency, Result};

/// A minimal fungible token backed by hash maps.
///
/// Behaves like a well-formed external currency; set
/// [`fail_transfers`](Self::set_fail_transfers) to emulate a token whose
/// transfers revert.
#[derive(Debug, Default)]
pub struct MemoryToken {
    balances: HashMap<AccountId, Decimal>,
    allowances: HashMap<(AccountId, AccountId), Decimal>,
    fail_transfers: bool,
}

impl MemoryToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` out of thin air (test setup only).
    pub fn fund(&mut self, account: AccountId, amount: Decimal) {
        *self.balances.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    /// Make every subsequent transfer fail with `TransferFailed`.
    pub fn set_fail_transfers(&mut self, fail: bool) {
        self.fail_transfers = fail;
    }

    fn debit(&mut self, from: &AccountId, amount: Decimal) -> Result<()> {
        let balance = self.balances.entry(*from).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Err(AssetmarkError::InsufficientCredits {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }
}

impl FungibleCurrency for MemoryToken {
    fn balance_of(&self, account: &AccountId) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn approve(&mut self, owner: &AccountId, spender: &AccountId, amount: Decimal) -> Result<()> {
        self.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<()> {
        if self.fail_transfers {
            return Err(AssetmarkError::TransferFailed {
                reason: "memory token configured to fail".to_string(),
            });
        }
        self.debit(from, amount)?;
        *self.balances.entry(*to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        if self.fail_transfers {
            return Err(AssetmarkError::TransferFailed {
                reason: "memory token configured to fail".to_string(),
            });
        }
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(AssetmarkError::InsufficientAllowance {
                needed: amount,
                available: allowance,
            });
        }
        self.debit(from, amount)?;
        self.allowances.insert((*from, *spender), allowance - amount);
        *self.balances.entry(*to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}

/// A payout hook that records every payment it is asked to make.
///
/// Set [`fail_next`](Self::set_fail_next) to make exactly one payment
/// fail, or [`fail_all`](Self::set_fail_all) for a permanently broken
/// outlet.
#[derive(Debug, Default)]
pub struct CashOutlet {
    payments: Vec<(AccountId, Decimal)>,
    fail_next: bool,
    fail_all: bool,
}

impl CashOutlet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail exactly the next `pay` call.
    pub fn set_fail_next(&mut self) {
        self.fail_next = true;
    }

    /// Fail every `pay` call until cleared.
    pub fn set_fail_all(&mut self, fail: bool) {
        self.fail_all = fail;
    }

    /// All successful payments, in order.
    #[must_use]
    pub fn payments(&self) -> &[(AccountId, Decimal)] {
        &self.payments
    }

    /// Total paid to `account` so far.
    #[must_use]
    pub fn paid_to(&self, account: &AccountId) -> Decimal {
        self.payments
            .iter()
            .filter(|(to, _)| to == account)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl FundsOutlet for CashOutlet {
    fn pay(&mut self, to: &AccountId, amount: Decimal) -> Result<()> {
        if self.fail_all || std::mem::take(&mut self.fail_next) {
            return Err(AssetmarkError::TransferFailed {
                reason: "outlet configured to fail".to_string(),
            });
        }
        self.payments.push((*to, amount));
        Ok(())
    }
}

/// A plausible-looking, random external id for registration tests
/// (e.g., `"US 4821937"`).
#[must_use]
pub fn random_external_id() -> String {
    format!("US {:07}", rand::random::<u32>() % 10_000_000)
}
