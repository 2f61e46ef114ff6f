//! The credit ledger.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use assetmark_types::{
    AccessControl, AccountId, AssetmarkError, CreditSpender, Event, EventLog, FundsOutlet,
    FungibleCurrency, LedgerConfig, PauseGate, PriceScope, ReentrancyGuard, Result, Role,
};

/// Fungible credit balances backed by a base-currency reserve.
///
/// Credits are minted at a fixed unit price against attached base
/// currency, redeemed back at the current unit price, and debited
/// directly by authorized spenders (the payment gateway). While paused,
/// every balance-mutating operation fails; reads still work.
pub struct CreditLedger {
    access: AccessControl,
    /// Base currency per credit. Admin-mutable, always positive.
    unit_price: Decimal,
    /// Hard cap on outstanding credits.
    max_supply: Decimal,
    /// Credits currently outstanding.
    total_supply: Decimal,
    /// Base currency actually held against redemptions.
    reserve: Decimal,
    balances: HashMap<AccountId, Decimal>,
    /// `(owner, spender) → remaining allowance`.
    allowances: HashMap<(AccountId, AccountId), Decimal>,
    /// Accounts that may debit any holder directly.
    authorized_spenders: HashSet<AccountId>,
    pause: PauseGate,
    guard: ReentrancyGuard,
    events: EventLog,
}

impl CreditLedger {
    /// Create an empty ledger.
    ///
    /// # Panics
    /// Panics if the configured unit price or supply cap is not positive.
    #[must_use]
    pub fn new(config: LedgerConfig, access: AccessControl) -> Self {
        assert!(
            config.unit_price > Decimal::ZERO,
            "unit price must be positive"
        );
        assert!(
            config.max_supply > Decimal::ZERO,
            "supply cap must be positive"
        );
        Self {
            access,
            unit_price: config.unit_price,
            max_supply: config.max_supply,
            total_supply: Decimal::ZERO,
            reserve: Decimal::ZERO,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            authorized_spenders: HashSet::new(),
            pause: PauseGate::new(),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // =================================================================
    // Purchase / redeem
    // =================================================================

    /// Mint credits against attached base currency.
    ///
    /// `credits = floor(amount / unit_price)`; the full attached amount
    /// (including any sub-credit remainder) grows the reserve, which
    /// tracks cash actually held.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is zero or buys zero whole credits
    /// - `SupplyCapExceeded` if the mint would breach the cap
    /// - `ComponentPaused` while paused
    pub fn purchase(&mut self, payer: AccountId, amount: Decimal) -> Result<Decimal> {
        self.pause.ensure_active()?;
        if payer.is_nil() {
            return Err(AssetmarkError::NilAccount { field: "payer" });
        }
        if amount <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        let credits = (amount / self.unit_price).floor();
        if credits.is_zero() {
            return Err(AssetmarkError::ZeroAmount);
        }
        let headroom = self.max_supply - self.total_supply;
        if credits > headroom {
            return Err(AssetmarkError::SupplyCapExceeded {
                requested: credits,
                headroom,
            });
        }

        *self.balances.entry(payer).or_insert(Decimal::ZERO) += credits;
        self.total_supply += credits;
        self.reserve += amount;

        self.events.append(Event::CreditsPurchased {
            payer,
            amount,
            credits,
        });
        Ok(credits)
    }

    /// Burn credits and pay base currency out of the reserve.
    ///
    /// `amount = credits * unit_price`, checked against the reserve the
    /// ledger actually holds — independent of what supply arithmetic
    /// would allow. Balances and the reserve are debited before the
    /// payout hook runs; a failed payout rolls the whole step back.
    ///
    /// # Errors
    /// - `ZeroAmount` / `InsufficientCredits` / `InsufficientReserve`
    /// - `ComponentPaused` / `ReentrantCall`
    pub fn redeem(
        &mut self,
        holder: AccountId,
        credits: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let out = self.redeem_locked(holder, credits, outlet);
        self.guard.exit();
        out
    }

    fn redeem_locked(
        &mut self,
        holder: AccountId,
        credits: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        if credits <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        let balance = self.balance_of(&holder);
        if balance < credits {
            return Err(AssetmarkError::InsufficientCredits {
                needed: credits,
                available: balance,
            });
        }
        let amount = credits * self.unit_price;
        if amount > self.reserve {
            tracing::warn!(
                holder = %holder,
                requested = %amount,
                reserve = %self.reserve,
                "redeem refused: reserve cannot cover payout"
            );
            return Err(AssetmarkError::InsufficientReserve {
                requested: amount,
                reserve: self.reserve,
            });
        }

        // Effects before the payout hook.
        *self.balances.entry(holder).or_insert(Decimal::ZERO) -= credits;
        self.total_supply -= credits;
        self.reserve -= amount;

        if let Err(err) = outlet.pay(&holder, amount) {
            // Full rollback: a failed payout leaves no trace.
            *self.balances.entry(holder).or_insert(Decimal::ZERO) += credits;
            self.total_supply += credits;
            self.reserve += amount;
            return Err(err);
        }

        self.events.append(Event::CreditsRedeemed {
            holder,
            credits,
            amount,
        });
        Ok(amount)
    }

    // =================================================================
    // Delegated spending
    // =================================================================

    /// Whether `account` is on the authorized-spender trust list.
    #[must_use]
    pub fn is_authorized_spender(&self, account: &AccountId) -> bool {
        self.authorized_spenders.contains(account)
    }

    // =================================================================
    // Standard fungible operations
    // =================================================================

    /// Current balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Move credits between accounts.
    ///
    /// # Errors
    /// `ZeroAmount` / `NilAccount` / `InsufficientCredits` / `ComponentPaused`.
    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<()> {
        self.pause.ensure_active()?;
        if to.is_nil() {
            return Err(AssetmarkError::NilAccount { field: "to" });
        }
        if amount <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        self.debit(from, amount)?;
        *self.balances.entry(*to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    /// Destroy credits with **no payout**. Distinct from [`redeem`](Self::redeem):
    /// the reserve is untouched, so burned value is simply gone.
    ///
    /// # Errors
    /// `ZeroAmount` / `InsufficientCredits` / `ComponentPaused`.
    pub fn burn(&mut self, holder: &AccountId, credits: Decimal) -> Result<()> {
        self.pause.ensure_active()?;
        if credits <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        self.debit(holder, credits)?;
        self.total_supply -= credits;
        Ok(())
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

    // =================================================================
    // Admin
    // =================================================================

    /// Add or remove an account from the authorized-spender trust list.
    ///
    /// # Errors
    /// `RoleRequired` unless the caller is a ledger admin.
    pub fn set_authorized_spender(
        &mut self,
        caller: &AccountId,
        spender: AccountId,
        authorized: bool,
    ) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        if authorized {
            self.authorized_spenders.insert(spender);
        } else {
            self.authorized_spenders.remove(&spender);
        }
        Ok(())
    }

    /// Change the unit price. Affects future purchases and redemptions;
    /// the reserve check keeps old redemptions honest regardless.
    ///
    /// # Errors
    /// `RoleRequired` / `InvalidPrice` (zero or negative).
    pub fn update_unit_price(&mut self, caller: &AccountId, price: Decimal) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        if price <= Decimal::ZERO {
            return Err(AssetmarkError::InvalidPrice);
        }
        self.unit_price = price;
        self.events.append(Event::PriceUpdated {
            scope: PriceScope::CreditUnit,
            price,
        });
        Ok(())
    }

    /// Mint credits without payment (promotions, migrations). Grows no
    /// reserve, so minted credits are only redeemable against cash the
    /// reserve already holds — the reserve check enforces exactly that.
    ///
    /// # Errors
    /// `RoleRequired` / `ZeroAmount` / `SupplyCapExceeded` / `ComponentPaused`.
    pub fn mint(&mut self, caller: &AccountId, to: AccountId, credits: Decimal) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        self.pause.ensure_active()?;
        if credits <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        let headroom = self.max_supply - self.total_supply;
        if credits > headroom {
            return Err(AssetmarkError::SupplyCapExceeded {
                requested: credits,
                headroom,
            });
        }
        *self.balances.entry(to).or_insert(Decimal::ZERO) += credits;
        self.total_supply += credits;
        Ok(())
    }

    /// Pull base currency out of the reserve to the admin.
    ///
    /// Shrinks the backing for outstanding credits; subsequent
    /// redemptions fail `InsufficientReserve` once the reserve runs dry,
    /// by design rather than paying out phantom cash.
    ///
    /// # Errors
    /// `RoleRequired` / `ZeroAmount` / `InsufficientReserve` / `ReentrantCall`.
    pub fn withdraw_reserve(
        &mut self,
        caller: &AccountId,
        amount: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        self.guard.enter()?;
        let out = self.withdraw_reserve_locked(caller, amount, outlet);
        self.guard.exit();
        out
    }

    fn withdraw_reserve_locked(
        &mut self,
        caller: &AccountId,
        amount: Decimal,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        if amount > self.reserve {
            return Err(AssetmarkError::InsufficientReserve {
                requested: amount,
                reserve: self.reserve,
            });
        }
        self.reserve -= amount;
        if let Err(err) = outlet.pay(caller, amount) {
            self.reserve += amount;
            return Err(err);
        }
        self.events.append(Event::Withdrawn {
            account: *caller,
            amount,
        });
        Ok(())
    }

    /// Block all balance-mutating operations.
    ///
    /// # Errors
    /// `RoleRequired` unless the caller is a ledger admin.
    pub fn pause(&mut self, caller: &AccountId) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        self.pause.pause();
        Ok(())
    }

    /// Reopen the ledger.
    ///
    /// # Errors
    /// `RoleRequired` unless the caller is a ledger admin.
    pub fn unpause(&mut self, caller: &AccountId) -> Result<()> {
        self.access.ensure(Role::LedgerAdmin, caller)?;
        self.pause.unpause();
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Credits currently outstanding.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    /// Base currency held against redemptions.
    #[must_use]
    pub fn reserve(&self) -> Decimal {
        self.reserve
    }

    /// Current unit price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Whether the ledger is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// The ledger's append-only event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

impl FungibleCurrency for CreditLedger {
    fn balance_of(&self, account: &AccountId) -> Decimal {
        Self::balance_of(self, account)
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
        Self::transfer(self, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        self.pause.ensure_active()?;
        let allowance = FungibleCurrency::allowance(self, from, spender);
        if allowance < amount {
            return Err(AssetmarkError::InsufficientAllowance {
                needed: amount,
                available: allowance,
            });
        }
        Self::transfer(self, from, to, amount)?;
        self.allowances.insert((*from, *spender), allowance - amount);
        Ok(())
    }
}

impl CreditSpender for CreditLedger {
    /// Debit `holder` directly on behalf of `caller`. Only accounts on
    /// the authorized-spender list may call this; the debited credits are
    /// retired from supply (service consumption is redemption without a
    /// payout, so the backing cash stays in the reserve as revenue).
    fn spend_on_behalf(
        &mut self,
        caller: &AccountId,
        holder: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        self.pause.ensure_active()?;
        if !self.authorized_spenders.contains(caller) {
            return Err(AssetmarkError::NotAuthorizedSpender(*caller));
        }
        if amount <= Decimal::ZERO {
            return Err(AssetmarkError::ZeroAmount);
        }
        self.debit(holder, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    fn credit_balance(&self, holder: &AccountId) -> Decimal {
        Self::balance_of(self, holder)
    }
}
