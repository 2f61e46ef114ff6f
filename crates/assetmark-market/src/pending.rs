//! Pull-payment ledger with escrow conservation.
//!
//! Sale proceeds are credited here and leave only when the credited party
//! explicitly pulls them. The conservation invariant enforced throughout:
//!
//! ```text
//! Σ(pending withdrawals) ≤ cash on hand
//! ```
//!
//! Cash on hand tracks base currency the marketplace has actually
//! received and not yet paid out, including stray direct transfers that
//! were never attached to a sale.

use std::collections::HashMap;

use rust_decimal::Decimal;

use assetmark_types::{AccountId, AssetmarkError, Result};

/// Internal balances owed to sellers and the fee recipient.
#[derive(Debug, Default)]
pub struct PendingWithdrawals {
    /// `account → withdrawable balance`.
    pending: HashMap<AccountId, Decimal>,
    /// Base currency actually held and not yet paid out.
    cash_on_hand: Decimal,
}

impl PendingWithdrawals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Book cash physically received (a sale's price, or a stray direct
    /// transfer).
    pub fn receive_cash(&mut self, amount: Decimal) {
        self.cash_on_hand += amount;
    }

    /// Reverse a [`receive_cash`](Self::receive_cash) during rollback.
    pub fn unreceive_cash(&mut self, amount: Decimal) {
        self.cash_on_hand -= amount;
    }

    /// Credit an account's withdrawable balance. Zero credits are dropped.
    pub fn credit(&mut self, account: AccountId, amount: Decimal) {
        if amount > Decimal::ZERO {
            *self.pending.entry(account).or_insert(Decimal::ZERO) += amount;
        }
    }

    /// Reverse a [`credit`](Self::credit) during rollback.
    pub fn uncredit(&mut self, account: &AccountId, amount: Decimal) {
        if amount > Decimal::ZERO {
            if let Some(balance) = self.pending.get_mut(account) {
                *balance -= amount;
            }
        }
    }

    /// Zero an account's balance and return what it held.
    ///
    /// # Errors
    /// Returns `NothingToWithdraw` if the balance is zero.
    pub fn take_all(&mut self, account: &AccountId) -> Result<Decimal> {
        let amount = self.balance_of(account);
        if amount.is_zero() {
            return Err(AssetmarkError::NothingToWithdraw(*account));
        }
        self.pending.insert(*account, Decimal::ZERO);
        Ok(amount)
    }

    /// Restore a balance after a failed payout.
    pub fn restore(&mut self, account: AccountId, amount: Decimal) {
        *self.pending.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    /// Record cash physically leaving the system.
    pub fn record_payout(&mut self, amount: Decimal) {
        self.cash_on_hand -= amount;
    }

    /// An account's withdrawable balance.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.pending.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of every withdrawable balance.
    #[must_use]
    pub fn total_pending(&self) -> Decimal {
        self.pending.values().copied().sum()
    }

    /// Cash actually held and not yet paid out.
    #[must_use]
    pub fn cash_on_hand(&self) -> Decimal {
        self.cash_on_hand
    }

    /// Cash held beyond what pending balances are owed — stray direct
    /// transfers sweepable by `emergency_withdraw`.
    #[must_use]
    pub fn surplus(&self) -> Decimal {
        self.cash_on_hand - self.total_pending()
    }

    /// Verify the conservation invariant.
    ///
    /// # Errors
    /// Returns [`AssetmarkError::EscrowConservationViolation`] if pending
    /// balances exceed cash on hand.
    pub fn verify_conservation(&self) -> Result<()> {
        let total = self.total_pending();
        if total > self.cash_on_hand {
            return Err(AssetmarkError::EscrowConservationViolation {
                reason: format!(
                    "pending {total} exceeds cash on hand {}",
                    self.cash_on_hand
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn credit_and_take_all() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();

        pending.receive_cash(dec(100));
        pending.credit(seller, dec(97));
        assert_eq!(pending.balance_of(&seller), dec(97));

        let amount = pending.take_all(&seller).unwrap();
        assert_eq!(amount, dec(97));
        assert_eq!(pending.balance_of(&seller), Decimal::ZERO);
    }

    #[test]
    fn second_take_fails() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();
        pending.receive_cash(dec(10));
        pending.credit(seller, dec(10));

        pending.take_all(&seller).unwrap();
        let err = pending.take_all(&seller).unwrap_err();
        assert!(matches!(err, AssetmarkError::NothingToWithdraw(_)));
    }

    #[test]
    fn zero_credit_is_dropped() {
        let mut pending = PendingWithdrawals::new();
        let account = AccountId::new();
        pending.credit(account, Decimal::ZERO);
        assert!(pending.take_all(&account).is_err());
    }

    #[test]
    fn conservation_holds_through_sale_flow() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();
        let fee_recipient = AccountId::new();

        pending.receive_cash(dec(100));
        pending.credit(seller, dec(97));
        pending.credit(fee_recipient, dec(3));
        pending.verify_conservation().unwrap();
        assert_eq!(pending.surplus(), Decimal::ZERO);

        let amount = pending.take_all(&seller).unwrap();
        pending.record_payout(amount);
        pending.verify_conservation().unwrap();
        assert_eq!(pending.cash_on_hand(), dec(3));
    }

    #[test]
    fn conservation_violation_detected() {
        let mut pending = PendingWithdrawals::new();
        pending.credit(AccountId::new(), dec(5));
        let err = pending.verify_conservation().unwrap_err();
        assert!(matches!(
            err,
            AssetmarkError::EscrowConservationViolation { .. }
        ));
    }

    #[test]
    fn stray_cash_becomes_surplus() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();
        pending.receive_cash(dec(100));
        pending.credit(seller, dec(100));
        pending.receive_cash(dec(7)); // stray direct transfer
        assert_eq!(pending.surplus(), dec(7));
        pending.verify_conservation().unwrap();
    }

    #[test]
    fn rollback_reverses_credits_and_cash() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();
        pending.receive_cash(dec(100));
        pending.credit(seller, dec(97));

        pending.uncredit(&seller, dec(97));
        pending.unreceive_cash(dec(100));
        assert_eq!(pending.balance_of(&seller), Decimal::ZERO);
        assert_eq!(pending.cash_on_hand(), Decimal::ZERO);
        assert_eq!(pending.total_pending(), Decimal::ZERO);
    }

    #[test]
    fn restore_after_failed_payout() {
        let mut pending = PendingWithdrawals::new();
        let seller = AccountId::new();
        pending.receive_cash(dec(50));
        pending.credit(seller, dec(50));

        let amount = pending.take_all(&seller).unwrap();
        // Payout hook failed: put it back, cash never left.
        pending.restore(seller, amount);
        assert_eq!(pending.balance_of(&seller), dec(50));
        pending.verify_conservation().unwrap();
    }
}
