//! Per-account payment statistics.
//!
//! Aggregate, not itemized: cumulative paid per (account, currency) and a
//! total usage count per account. Both only ever grow — the gateway
//! finalizes counters after a payment's external interactions succeed, so
//! no rollback path ever decrements them.

use std::collections::HashMap;

use rust_decimal::Decimal;

use assetmark_types::{AccountId, CurrencyCode};

/// Monotonic usage and payment counters.
#[derive(Debug, Default)]
pub struct UsageStats {
    /// `(account, currency) → cumulative amount paid`.
    paid: HashMap<(AccountId, CurrencyCode), Decimal>,
    /// `account → total successful payments`.
    usage: HashMap<AccountId, u64>,
}

impl UsageStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful payment. Returns the account's new usage count.
    pub fn record(&mut self, account: AccountId, currency: &str, amount: Decimal) -> u64 {
        *self
            .paid
            .entry((account, currency.to_string()))
            .or_insert(Decimal::ZERO) += amount;
        let count = self.usage.entry(account).or_insert(0);
        *count += 1;
        *count
    }

    /// Cumulative amount `account` has paid in `currency`.
    #[must_use]
    pub fn paid(&self, account: &AccountId, currency: &str) -> Decimal {
        self.paid
            .get(&(*account, currency.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Total successful payments by `account` across all currencies.
    #[must_use]
    pub fn usage_count(&self, account: &AccountId) -> u64 {
        self.usage.get(account).copied().unwrap_or(0)
    }
}
