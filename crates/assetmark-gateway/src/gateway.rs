//! The multi-currency payment gateway.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetmark_types::{
    AccessControl, AccountId, AssetmarkError, CreditSpender, CurrencyCode, CurrencyConfig,
    CurrencyKind, Event, EventLog, FundsOutlet, FungibleCurrency, GatewayConfig, PauseGate,
    PriceScope, ReentrancyGuard, Result, Role,
};

use crate::stats::UsageStats;

/// Proof of one successful metered-service payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Currency the payment was collected in.
    pub currency: CurrencyCode,
    /// Amount collected (always exactly the configured price).
    pub amount: Decimal,
    /// Excess base currency refunded in the same call (zero for
    /// token and credit payments, which pull exact amounts).
    pub refund: Decimal,
    /// The payer's usage count after this payment.
    pub usage_count: u64,
}

struct CurrencyEntry {
    kind: CurrencyKind,
    price: Decimal,
}

/// Collects per-query service fees in multiple currencies and queues the
/// base-currency take for explicit admin withdrawal.
///
/// The gateway presents a single `treasury` identity to external ledgers:
/// token payments land on the treasury account of the token, and credit
/// payments are debited with the treasury as the authorized spender.
pub struct PaymentGateway {
    treasury: AccountId,
    access: AccessControl,
    currencies: HashMap<CurrencyCode, CurrencyEntry>,
    /// Collected balances awaiting admin withdrawal, per currency.
    /// Credits never accumulate here — the ledger burns them and keeps
    /// the backing cash in its reserve.
    collected: HashMap<CurrencyCode, Decimal>,
    stats: UsageStats,
    pause: PauseGate,
    guard: ReentrancyGuard,
    events: EventLog,
}

impl PaymentGateway {
    /// Create a gateway with the given currency table.
    ///
    /// # Panics
    /// Panics on duplicate currency codes or non-positive prices; the
    /// currency table is deployment configuration, not user input.
    #[must_use]
    pub fn new(treasury: AccountId, config: GatewayConfig, access: AccessControl) -> Self {
        let mut currencies = HashMap::new();
        for currency in config.currencies {
            assert!(
                currency.price > Decimal::ZERO,
                "currency {} configured with non-positive price",
                currency.code
            );
            let previous = currencies.insert(
                currency.code.clone(),
                CurrencyEntry {
                    kind: currency.kind,
                    price: currency.price,
                },
            );
            assert!(
                previous.is_none(),
                "duplicate currency code {}",
                currency.code
            );
        }
        Self {
            treasury,
            access,
            currencies,
            collected: HashMap::new(),
            stats: UsageStats::new(),
            pause: PauseGate::new(),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // =================================================================
    // Payment paths
    // =================================================================

    /// Pay with attached base currency. Excess over the configured price
    /// is refunded through the outlet in the same atomic step, never
    /// retained; a failed refund rolls the whole payment back.
    ///
    /// # Errors
    /// `InsufficientPayment` / `UnknownCurrency` / `ComponentPaused` /
    /// `ReentrantCall`, or the refund failure.
    pub fn pay_with_base(
        &mut self,
        payer: AccountId,
        attached: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<PaymentReceipt> {
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let out = self.pay_with_base_locked(payer, attached, outlet);
        self.guard.exit();
        out
    }

    fn pay_with_base_locked(
        &mut self,
        payer: AccountId,
        attached: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<PaymentReceipt> {
        let (code, price) = self.currency_of_kind(CurrencyKind::Base)?;
        if attached < price {
            return Err(AssetmarkError::InsufficientPayment {
                required: price,
                attached,
            });
        }

        // Collected cash is invariant-protecting state: book it before
        // the refund hook runs.
        *self.collected.entry(code.clone()).or_insert(Decimal::ZERO) += price;

        let refund = attached - price;
        if refund > Decimal::ZERO {
            if let Err(err) = outlet.pay(&payer, refund) {
                *self.collected.entry(code.clone()).or_insert(Decimal::ZERO) -= price;
                return Err(err);
            }
        }

        Ok(self.finalize(payer, code, price, refund))
    }

    /// Pay with an opaque external token, pulling exactly the configured
    /// price from the payer via a pre-authorized `transfer_from` to the
    /// treasury.
    ///
    /// # Errors
    /// `UnknownCurrency` / `InsufficientTokenBalance` (pre-checked) /
    /// `TransferFailed` (the opaque transfer reverting) /
    /// `ComponentPaused` / `ReentrantCall`.
    pub fn pay_with_token(
        &mut self,
        payer: AccountId,
        currency: &str,
        token: &mut dyn FungibleCurrency,
    ) -> Result<PaymentReceipt> {
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let out = self.pay_with_token_locked(payer, currency, token);
        self.guard.exit();
        out
    }

    fn pay_with_token_locked(
        &mut self,
        payer: AccountId,
        currency: &str,
        token: &mut dyn FungibleCurrency,
    ) -> Result<PaymentReceipt> {
        let price = self.price_of_kind(currency, CurrencyKind::External)?;

        let balance = token.balance_of(&payer);
        if balance < price {
            return Err(AssetmarkError::InsufficientTokenBalance {
                currency: currency.to_string(),
                needed: price,
                available: balance,
            });
        }

        // Book the collection, then pull. The pull is the only fallible
        // external step; unwind the booking if it reverts.
        *self
            .collected
            .entry(currency.to_string())
            .or_insert(Decimal::ZERO) += price;

        let treasury = self.treasury;
        if let Err(err) = token.transfer_from(&treasury, &payer, &treasury, price) {
            *self
                .collected
                .entry(currency.to_string())
                .or_insert(Decimal::ZERO) -= price;
            return Err(AssetmarkError::TransferFailed {
                reason: err.to_string(),
            });
        }

        Ok(self.finalize(payer, currency.to_string(), price, Decimal::ZERO))
    }

    /// Pay with ledger credits through the authorized-spender seam. The
    /// treasury must be on the ledger's authorized-spender list.
    ///
    /// # Errors
    /// `UnknownCurrency` / `InsufficientCreditBalance` /
    /// `NotAuthorizedSpender` (deployment misconfiguration) /
    /// `ComponentPaused` / `ReentrantCall`.
    pub fn pay_with_credits(
        &mut self,
        payer: AccountId,
        ledger: &mut dyn CreditSpender,
    ) -> Result<PaymentReceipt> {
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let out = self.pay_with_credits_locked(payer, ledger);
        self.guard.exit();
        out
    }

    fn pay_with_credits_locked(
        &mut self,
        payer: AccountId,
        ledger: &mut dyn CreditSpender,
    ) -> Result<PaymentReceipt> {
        let (code, price) = self.currency_of_kind(CurrencyKind::Credits)?;

        let treasury = self.treasury;
        if let Err(err) = ledger.spend_on_behalf(&treasury, &payer, price) {
            // Surface the ledger's balance shortfall under this
            // component's taxonomy; everything else passes through.
            return Err(match err {
                AssetmarkError::InsufficientCredits { needed, available } => {
                    AssetmarkError::InsufficientCreditBalance { needed, available }
                }
                other => other,
            });
        }

        Ok(self.finalize(payer, code, price, Decimal::ZERO))
    }

    /// Common tail of every successful payment: counters and receipt.
    /// Runs only after all fallible steps, so counters stay monotonic.
    fn finalize(
        &mut self,
        payer: AccountId,
        currency: CurrencyCode,
        amount: Decimal,
        refund: Decimal,
    ) -> PaymentReceipt {
        let usage_count = self.stats.record(payer, &currency, amount);
        self.events.append(Event::PaymentReceived {
            payer,
            currency: currency.clone(),
            amount,
            usage_count,
        });
        PaymentReceipt {
            currency,
            amount,
            refund,
            usage_count,
        }
    }

    // =================================================================
    // Admin
    // =================================================================

    /// Reprice a currency.
    ///
    /// # Errors
    /// `RoleRequired` / `UnknownCurrency` / `InvalidPrice`.
    pub fn update_price(
        &mut self,
        caller: &AccountId,
        currency: &str,
        price: Decimal,
    ) -> Result<()> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        if price <= Decimal::ZERO {
            return Err(AssetmarkError::InvalidPrice);
        }
        let entry = self
            .currencies
            .get_mut(currency)
            .ok_or_else(|| AssetmarkError::UnknownCurrency(currency.to_string()))?;
        entry.price = price;
        self.events.append(Event::PriceUpdated {
            scope: PriceScope::Currency(currency.to_string()),
            price,
        });
        Ok(())
    }

    /// Register a new currency or replace an existing entry.
    ///
    /// # Errors
    /// `RoleRequired` / `InvalidPrice`.
    pub fn set_currency(&mut self, caller: &AccountId, currency: CurrencyConfig) -> Result<()> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        if currency.price <= Decimal::ZERO {
            return Err(AssetmarkError::InvalidPrice);
        }
        let price = currency.price;
        let code = currency.code.clone();
        self.currencies.insert(
            currency.code,
            CurrencyEntry {
                kind: currency.kind,
                price,
            },
        );
        self.events.append(Event::PriceUpdated {
            scope: PriceScope::Currency(code),
            price,
        });
        Ok(())
    }

    /// Pull the entire collected base-currency balance to the admin.
    ///
    /// # Errors
    /// `RoleRequired` / `UnknownCurrency` / `NothingToWithdraw` /
    /// `ReentrantCall`, or the payout failure (state restored).
    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        currency: &str,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        self.guard.enter()?;
        let out = self.withdraw_locked(caller, currency, outlet);
        self.guard.exit();
        out
    }

    fn withdraw_locked(
        &mut self,
        caller: &AccountId,
        currency: &str,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        if !self.currencies.contains_key(currency) {
            return Err(AssetmarkError::UnknownCurrency(currency.to_string()));
        }
        let amount = self.collected(currency);
        if amount.is_zero() {
            return Err(AssetmarkError::NothingToWithdraw(*caller));
        }

        // Zero before the payout hook.
        self.collected.insert(currency.to_string(), Decimal::ZERO);
        if let Err(err) = outlet.pay(caller, amount) {
            self.collected.insert(currency.to_string(), amount);
            return Err(err);
        }

        self.events.append(Event::Withdrawn {
            account: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Move collected external tokens from the treasury to the admin.
    /// Token payments land on the treasury account of the token itself;
    /// this drains that position and resets the collected counter.
    ///
    /// # Errors
    /// `RoleRequired` / `UnknownCurrency` / `NothingToWithdraw` /
    /// `ReentrantCall`, or the token transfer failure (state restored).
    pub fn withdraw_token(
        &mut self,
        caller: &AccountId,
        currency: &str,
        token: &mut dyn FungibleCurrency,
    ) -> Result<Decimal> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        self.guard.enter()?;
        let out = self.withdraw_token_locked(caller, currency, token);
        self.guard.exit();
        out
    }

    fn withdraw_token_locked(
        &mut self,
        caller: &AccountId,
        currency: &str,
        token: &mut dyn FungibleCurrency,
    ) -> Result<Decimal> {
        if !self.currencies.contains_key(currency) {
            return Err(AssetmarkError::UnknownCurrency(currency.to_string()));
        }
        let amount = self.collected(currency);
        if amount.is_zero() {
            return Err(AssetmarkError::NothingToWithdraw(*caller));
        }

        self.collected.insert(currency.to_string(), Decimal::ZERO);
        let treasury = self.treasury;
        if let Err(err) = token.transfer(&treasury, caller, amount) {
            self.collected.insert(currency.to_string(), amount);
            return Err(AssetmarkError::TransferFailed {
                reason: err.to_string(),
            });
        }

        self.events.append(Event::Withdrawn {
            account: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Block new payments.
    ///
    /// # Errors
    /// `RoleRequired` unless the caller is a gateway admin.
    pub fn pause(&mut self, caller: &AccountId) -> Result<()> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        self.pause.pause();
        Ok(())
    }

    /// Reopen the gateway.
    ///
    /// # Errors
    /// `RoleRequired` unless the caller is a gateway admin.
    pub fn unpause(&mut self, caller: &AccountId) -> Result<()> {
        self.access.ensure(Role::GatewayAdmin, caller)?;
        self.pause.unpause();
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// The configured price for a currency.
    ///
    /// # Errors
    /// `UnknownCurrency` for unconfigured codes.
    pub fn price_of(&self, currency: &str) -> Result<Decimal> {
        self.currencies
            .get(currency)
            .map(|e| e.price)
            .ok_or_else(|| AssetmarkError::UnknownCurrency(currency.to_string()))
    }

    /// Collected balance awaiting withdrawal for a currency.
    #[must_use]
    pub fn collected(&self, currency: &str) -> Decimal {
        self.collected
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Cumulative amount `account` has paid in `currency`.
    #[must_use]
    pub fn paid(&self, account: &AccountId, currency: &str) -> Decimal {
        self.stats.paid(account, currency)
    }

    /// Total successful payments by `account`.
    #[must_use]
    pub fn usage_count(&self, account: &AccountId) -> u64 {
        self.stats.usage_count(account)
    }

    /// The treasury identity this gateway presents to other ledgers.
    #[must_use]
    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    /// Whether the gateway is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// The gateway's append-only event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn currency_of_kind(&self, kind: CurrencyKind) -> Result<(CurrencyCode, Decimal)> {
        self.currencies
            .iter()
            .find(|(_, entry)| entry.kind == kind)
            .map(|(code, entry)| (code.clone(), entry.price))
            .ok_or_else(|| AssetmarkError::UnknownCurrency(format!("{kind:?}")))
    }

    fn price_of_kind(&self, currency: &str, kind: CurrencyKind) -> Result<Decimal> {
        let entry = self
            .currencies
            .get(currency)
            .ok_or_else(|| AssetmarkError::UnknownCurrency(currency.to_string()))?;
        if entry.kind != kind {
            return Err(AssetmarkError::UnknownCurrency(currency.to_string()));
        }
        Ok(entry.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetmark_types::constants;
    use assetmark_types::fakes::{CashOutlet, MemoryToken};

    fn usdc_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.currencies.push(CurrencyConfig {
            code: "USDC".to_string(),
            kind: CurrencyKind::External,
            price: Decimal::new(5, 1), // 0.5 USDC per query
        });
        config
    }

    fn setup() -> (PaymentGateway, AccountId, AccountId) {
        let admin = AccountId::new();
        let treasury = AccountId::new();
        let gateway = PaymentGateway::new(
            treasury,
            usdc_config(),
            AccessControl::single(Role::GatewayAdmin, admin),
        );
        (gateway, admin, treasury)
    }

    fn base_price() -> Decimal {
        Decimal::new(5, 4) // 0.0005
    }

    #[test]
    fn base_payment_exact_amount() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        let receipt = gateway
            .pay_with_base(payer, base_price(), &mut outlet)
            .unwrap();
        assert_eq!(receipt.amount, base_price());
        assert_eq!(receipt.refund, Decimal::ZERO);
        assert_eq!(receipt.usage_count, 1);
        assert!(outlet.payments().is_empty());
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), base_price());
    }

    #[test]
    fn base_payment_refunds_excess_atomically() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        let attached = Decimal::new(10, 4); // 0.0010 attached, 0.0005 due
        let receipt = gateway.pay_with_base(payer, attached, &mut outlet).unwrap();
        assert_eq!(receipt.refund, Decimal::new(5, 4));
        assert_eq!(outlet.paid_to(&payer), Decimal::new(5, 4));
        // Only the price is retained.
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), base_price());
    }

    #[test]
    fn base_payment_under_price_rejected() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        let err = gateway
            .pay_with_base(payer, Decimal::new(1, 4), &mut outlet)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::InsufficientPayment { .. }));
        assert_eq!(gateway.usage_count(&payer), 0);
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), Decimal::ZERO);
    }

    #[test]
    fn failed_refund_rolls_payment_back() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();
        outlet.set_fail_next();

        let err = gateway
            .pay_with_base(payer, Decimal::new(10, 4), &mut outlet)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::TransferFailed { .. }));
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), Decimal::ZERO);
        assert_eq!(gateway.usage_count(&payer), 0);
        assert!(gateway.events().is_empty());
    }

    #[test]
    fn token_payment_pulls_exact_price() {
        let (mut gateway, _, treasury) = setup();
        let payer = AccountId::new();
        let mut token = MemoryToken::new();
        token.fund(payer, Decimal::new(10, 0));
        token
            .approve(&payer, &treasury, Decimal::new(10, 0))
            .unwrap();

        let receipt = gateway.pay_with_token(payer, "USDC", &mut token).unwrap();
        assert_eq!(receipt.amount, Decimal::new(5, 1));
        assert_eq!(token.balance_of(&treasury), Decimal::new(5, 1));
        assert_eq!(token.balance_of(&payer), Decimal::new(95, 1));
        assert_eq!(gateway.collected("USDC"), Decimal::new(5, 1));
    }

    #[test]
    fn token_payment_insufficient_balance() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut token = MemoryToken::new();
        token.fund(payer, Decimal::new(1, 1)); // 0.1 < 0.5

        let err = gateway
            .pay_with_token(payer, "USDC", &mut token)
            .unwrap_err();
        assert!(matches!(
            err,
            AssetmarkError::InsufficientTokenBalance { .. }
        ));
        assert_eq!(gateway.usage_count(&payer), 0);
    }

    #[test]
    fn token_payment_without_allowance_fails_and_rolls_back() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut token = MemoryToken::new();
        token.fund(payer, Decimal::new(10, 0));
        // No approve() — the pull must fail.

        let err = gateway
            .pay_with_token(payer, "USDC", &mut token)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::TransferFailed { .. }));
        assert_eq!(gateway.collected("USDC"), Decimal::ZERO);
        assert_eq!(token.balance_of(&payer), Decimal::new(10, 0));
    }

    #[test]
    fn unknown_currency_rejected() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut token = MemoryToken::new();

        let err = gateway
            .pay_with_token(payer, "DOGE", &mut token)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::UnknownCurrency(_)));

        // A configured code with the wrong kind is equally unknown.
        let err = gateway
            .pay_with_token(payer, constants::BASE_CURRENCY, &mut token)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::UnknownCurrency(_)));
    }

    #[test]
    fn counters_are_monotonic_across_currencies() {
        let (mut gateway, _, treasury) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();
        let mut token = MemoryToken::new();
        token.fund(payer, Decimal::new(10, 0));
        token
            .approve(&payer, &treasury, Decimal::new(10, 0))
            .unwrap();

        gateway.pay_with_base(payer, base_price(), &mut outlet).unwrap();
        gateway.pay_with_token(payer, "USDC", &mut token).unwrap();
        let receipt = gateway
            .pay_with_base(payer, base_price(), &mut outlet)
            .unwrap();

        assert_eq!(receipt.usage_count, 3);
        assert_eq!(gateway.usage_count(&payer), 3);
        assert_eq!(
            gateway.paid(&payer, constants::BASE_CURRENCY),
            base_price() * Decimal::new(2, 0)
        );
        assert_eq!(gateway.paid(&payer, "USDC"), Decimal::new(5, 1));
    }

    #[test]
    fn update_price_admin_only_and_positive() {
        let (mut gateway, admin, _) = setup();
        let outsider = AccountId::new();

        assert!(gateway
            .update_price(&outsider, "USDC", Decimal::ONE)
            .is_err());
        assert!(matches!(
            gateway.update_price(&admin, "USDC", Decimal::ZERO).unwrap_err(),
            AssetmarkError::InvalidPrice
        ));

        gateway.update_price(&admin, "USDC", Decimal::ONE).unwrap();
        assert_eq!(gateway.price_of("USDC").unwrap(), Decimal::ONE);
    }

    #[test]
    fn set_currency_registers_new_code() {
        let (mut gateway, admin, _) = setup();
        gateway
            .set_currency(
                &admin,
                CurrencyConfig {
                    code: "DAI".to_string(),
                    kind: CurrencyKind::External,
                    price: Decimal::new(45, 2),
                },
            )
            .unwrap();
        assert_eq!(gateway.price_of("DAI").unwrap(), Decimal::new(45, 2));
    }

    #[test]
    fn withdraw_pulls_entire_collected_balance() {
        let (mut gateway, admin, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        gateway.pay_with_base(payer, base_price(), &mut outlet).unwrap();
        gateway.pay_with_base(payer, base_price(), &mut outlet).unwrap();

        let amount = gateway
            .withdraw(&admin, constants::BASE_CURRENCY, &mut outlet)
            .unwrap();
        assert_eq!(amount, base_price() * Decimal::new(2, 0));
        assert_eq!(outlet.paid_to(&admin), amount);
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), Decimal::ZERO);

        let err = gateway
            .withdraw(&admin, constants::BASE_CURRENCY, &mut outlet)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::NothingToWithdraw(_)));
    }

    #[test]
    fn failed_withdraw_restores_collected() {
        let (mut gateway, admin, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();
        gateway.pay_with_base(payer, base_price(), &mut outlet).unwrap();

        outlet.set_fail_next();
        let err = gateway
            .withdraw(&admin, constants::BASE_CURRENCY, &mut outlet)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::TransferFailed { .. }));
        assert_eq!(gateway.collected(constants::BASE_CURRENCY), base_price());
    }

    #[test]
    fn withdraw_token_drains_treasury_position() {
        let (mut gateway, admin, treasury) = setup();
        let payer = AccountId::new();
        let mut token = MemoryToken::new();
        token.fund(payer, Decimal::new(10, 0));
        token
            .approve(&payer, &treasury, Decimal::new(10, 0))
            .unwrap();
        gateway.pay_with_token(payer, "USDC", &mut token).unwrap();

        let amount = gateway
            .withdraw_token(&admin, "USDC", &mut token)
            .unwrap();
        assert_eq!(amount, Decimal::new(5, 1));
        assert_eq!(token.balance_of(&admin), Decimal::new(5, 1));
        assert_eq!(token.balance_of(&treasury), Decimal::ZERO);
        assert_eq!(gateway.collected("USDC"), Decimal::ZERO);
    }

    #[test]
    fn pause_blocks_payments_until_unpause() {
        let (mut gateway, admin, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        gateway.pause(&admin).unwrap();
        let err = gateway
            .pay_with_base(payer, base_price(), &mut outlet)
            .unwrap_err();
        assert!(matches!(err, AssetmarkError::ComponentPaused));

        gateway.unpause(&admin).unwrap();
        // The identical call now succeeds.
        assert!(gateway.pay_with_base(payer, base_price(), &mut outlet).is_ok());
    }

    #[test]
    fn events_emitted_only_on_success() {
        let (mut gateway, _, _) = setup();
        let payer = AccountId::new();
        let mut outlet = CashOutlet::new();

        gateway.pay_with_base(payer, base_price(), &mut outlet).unwrap();
        let _ = gateway.pay_with_base(payer, Decimal::ZERO, &mut outlet);

        let labels: Vec<&str> = gateway
            .events()
            .records()
            .iter()
            .map(|r| r.event.label())
            .collect();
        assert_eq!(labels, vec!["PAYMENT_RECEIVED"]);
    }

    #[test]
    fn receipt_serde_roundtrip() {
        let receipt = PaymentReceipt {
            currency: "USDC".to_string(),
            amount: Decimal::new(5, 1),
            refund: Decimal::ZERO,
            usage_count: 3,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: PaymentReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(receipt, back);
    }

    #[test]
    fn credit_payment_debits_ledger_and_maps_errors() {
        use assetmark_ledger::CreditLedger;
        use assetmark_types::LedgerConfig;

        let (mut gateway, _, treasury) = setup();
        let ledger_admin = AccountId::new();
        let mut ledger = CreditLedger::new(
            LedgerConfig::default(),
            AccessControl::single(Role::LedgerAdmin, ledger_admin),
        );
        ledger
            .set_authorized_spender(&ledger_admin, treasury, true)
            .unwrap();

        let payer = AccountId::new();
        ledger.purchase(payer, Decimal::new(1, 1)).unwrap(); // 5000 credits

        // Credits price is 25 per query.
        let receipt = gateway.pay_with_credits(payer, &mut ledger).unwrap();
        assert_eq!(receipt.amount, Decimal::new(25, 0));
        assert_eq!(ledger.balance_of(&payer), Decimal::new(4975, 0));

        // Drain the payer and try again: the ledger's shortfall surfaces
        // under the gateway's taxonomy.
        ledger
            .burn(&payer, Decimal::new(4975, 0))
            .unwrap();
        let err = gateway.pay_with_credits(payer, &mut ledger).unwrap_err();
        assert!(matches!(
            err,
            AssetmarkError::InsufficientCreditBalance { .. }
        ));
        assert_eq!(gateway.usage_count(&payer), 1);
    }

    #[test]
    fn credit_payment_without_spender_grant_fails() {
        use assetmark_ledger::CreditLedger;
        use assetmark_types::LedgerConfig;

        let (mut gateway, _, _) = setup();
        let mut ledger = CreditLedger::new(LedgerConfig::default(), AccessControl::new());
        let payer = AccountId::new();
        ledger.purchase(payer, Decimal::new(1, 1)).unwrap();

        let err = gateway.pay_with_credits(payer, &mut ledger).unwrap_err();
        assert!(matches!(err, AssetmarkError::NotAuthorizedSpender(_)));
        assert_eq!(ledger.balance_of(&payer), Decimal::new(5000, 0));
    }

    #[test]
    #[should_panic(expected = "duplicate currency code")]
    fn duplicate_currency_config_panics() {
        let mut config = GatewayConfig::default();
        config.currencies.push(CurrencyConfig {
            code: constants::BASE_CURRENCY.to_string(),
            kind: CurrencyKind::Base,
            price: Decimal::ONE,
        });
        let _ = PaymentGateway::new(AccountId::new(), config, AccessControl::new());
    }
}
