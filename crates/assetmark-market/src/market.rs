//! The escrow marketplace.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetmark_types::{
    constants, AccessControl, AccountId, AssetId, AssetOps, AssetmarkError, Event, EventLog,
    FundsOutlet, ListingId, MarketConfig, PriceScope, ReentrancyGuard, Result, Role,
};

use crate::listing::{Listing, ListingState};
use crate::pending::PendingWithdrawals;

/// Proof of one settled sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub listing_id: ListingId,
    pub asset_id: AssetId,
    pub seller: AccountId,
    pub buyer: AccountId,
    /// The asking price actually collected.
    pub price: Decimal,
    /// Platform cut credited to the fee recipient.
    pub platform_fee: Decimal,
    /// Remainder credited to the seller. Always `price - platform_fee`.
    pub seller_proceeds: Decimal,
    /// Excess attached cash refunded to the buyer in the same call.
    pub refund: Decimal,
    /// Royalty metadata reported from the registry. Advisory: it is not
    /// deducted from the split; callers settle it out-of-band.
    pub royalty_receiver: AccountId,
    pub royalty_amount: Decimal,
}

/// Matches buyers and sellers of registry assets through fixed-price
/// listings and a pull-payment ledger.
///
/// The marketplace presents one `operator` identity to the registry;
/// sellers pre-authorize that identity as a blanket operator before
/// listing. Proceeds are split at sale time into pending balances that
/// leave the system only through [`withdraw`](Self::withdraw).
pub struct Marketplace {
    operator: AccountId,
    access: AccessControl,
    platform_fee_bps: u32,
    fee_recipient: AccountId,
    listings: HashMap<ListingId, Listing>,
    /// Active listing per asset; at most one entry per asset ever.
    by_asset: HashMap<AssetId, ListingId>,
    /// Explicit index of Active listings — queries never scan terminal
    /// listings, no matter how many have accumulated.
    active: BTreeSet<ListingId>,
    next_id: ListingId,
    pending: PendingWithdrawals,
    guard: ReentrancyGuard,
    events: EventLog,
}

impl Marketplace {
    /// Create an empty marketplace.
    ///
    /// # Panics
    /// Panics if the configured fee exceeds
    /// [`constants::MAX_PLATFORM_FEE_BPS`] or the fee recipient is nil;
    /// both are deployment configuration, not user input.
    #[must_use]
    pub fn new(operator: AccountId, config: MarketConfig, access: AccessControl) -> Self {
        assert!(
            config.platform_fee_bps <= constants::MAX_PLATFORM_FEE_BPS,
            "platform fee {} bps exceeds maximum {}",
            config.platform_fee_bps,
            constants::MAX_PLATFORM_FEE_BPS
        );
        assert!(!config.fee_recipient.is_nil(), "fee recipient must be set");
        Self {
            operator,
            access,
            platform_fee_bps: config.platform_fee_bps,
            fee_recipient: config.fee_recipient,
            listings: HashMap::new(),
            by_asset: HashMap::new(),
            active: BTreeSet::new(),
            next_id: ListingId(1),
            pending: PendingWithdrawals::new(),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // =================================================================
    // Listing lifecycle
    // =================================================================

    /// List an asset at a fixed price.
    ///
    /// The seller must own the asset and must have pre-authorized this
    /// marketplace's operator identity on the registry, so the later sale
    /// can move the asset without a second approval step.
    ///
    /// # Errors
    /// - `InvalidPrice` on a non-positive price
    /// - `AssetNotFound` / `NotAssetOwner` / `TransferNotAuthorized`
    /// - `AssetAlreadyListed` if an Active listing exists for the asset
    pub fn list(
        &mut self,
        registry: &dyn AssetOps,
        seller: AccountId,
        asset_id: AssetId,
        price: Decimal,
    ) -> Result<ListingId> {
        if price <= Decimal::ZERO {
            return Err(AssetmarkError::InvalidPrice);
        }
        let owner = registry.owner_of(asset_id)?;
        if owner != seller {
            return Err(AssetmarkError::NotAssetOwner { asset_id });
        }
        if !registry.is_approved_or_owner(&self.operator, asset_id)? {
            return Err(AssetmarkError::TransferNotAuthorized { asset_id });
        }
        if let Some(existing) = self.by_asset.get(&asset_id) {
            return Err(AssetmarkError::AssetAlreadyListed {
                asset_id,
                listing_id: *existing,
            });
        }

        let id = self.next_id;
        self.next_id = self.next_id.next();
        self.listings
            .insert(id, Listing::new(id, asset_id, seller, price));
        self.by_asset.insert(asset_id, id);
        self.active.insert(id);

        self.events.append(Event::Listed {
            listing_id: id,
            asset_id,
            seller,
            price,
        });
        Ok(id)
    }

    /// Buy a listing with attached base currency.
    ///
    /// One atomic step: the listing goes terminal and the proceeds are
    /// split into pending balances **before** the asset moves or any cash
    /// leaves; excess attached cash is refunded in the same call. Any
    /// external failure rolls the entire sale back.
    ///
    /// # Errors
    /// - `ListingNotFound` / `ListingNotActive`
    /// - `SelfTrade` / `InsufficientPayment`
    /// - `ReentrantCall`, or whatever the registry/outlet surfaced
    pub fn buy(
        &mut self,
        registry: &mut dyn AssetOps,
        outlet: &mut dyn FundsOutlet,
        buyer: AccountId,
        listing_id: ListingId,
        attached: Decimal,
    ) -> Result<SaleReceipt> {
        self.guard.enter()?;
        let out = self.buy_locked(registry, outlet, buyer, listing_id, attached);
        self.guard.exit();
        out
    }

    fn buy_locked(
        &mut self,
        registry: &mut dyn AssetOps,
        outlet: &mut dyn FundsOutlet,
        buyer: AccountId,
        listing_id: ListingId,
        attached: Decimal,
    ) -> Result<SaleReceipt> {
        let listing = self
            .listings
            .get(&listing_id)
            .ok_or(AssetmarkError::ListingNotFound(listing_id))?;
        if !listing.is_active() {
            return Err(AssetmarkError::ListingNotActive {
                listing_id,
                state: listing.state.to_string(),
            });
        }
        let (asset_id, seller, price) = (listing.asset_id, listing.seller, listing.price);

        if buyer == seller {
            return Err(AssetmarkError::SelfTrade);
        }
        if attached < price {
            return Err(AssetmarkError::InsufficientPayment {
                required: price,
                attached,
            });
        }
        // Stale-listing checks: the seller may have moved the asset or
        // revoked the operator since listing. Verifying here keeps the
        // registry transfer below free of surprises.
        if registry.owner_of(asset_id)? != seller {
            return Err(AssetmarkError::NotAssetOwner { asset_id });
        }
        if !registry.is_approved_or_owner(&self.operator, asset_id)? {
            return Err(AssetmarkError::TransferNotAuthorized { asset_id });
        }

        let (royalty_receiver, royalty_amount) = registry.royalty_info(asset_id, price)?;

        // Exact split: division by the bps denominator is a decimal scale
        // shift, so fee + proceeds always reconstructs the price.
        let platform_fee = price * Decimal::from(self.platform_fee_bps)
            / Decimal::from(constants::BPS_DENOMINATOR);
        let seller_proceeds = price - platform_fee;

        // ---- Effects: everything invariant-protecting, before any
        // external call.
        let listing = self
            .listings
            .get_mut(&listing_id)
            .ok_or(AssetmarkError::ListingNotFound(listing_id))?;
        listing.mark_sold()?;
        self.by_asset.remove(&asset_id);
        self.active.remove(&listing_id);
        self.pending.receive_cash(price);
        self.pending.credit(seller, seller_proceeds);
        self.pending.credit(self.fee_recipient, platform_fee);

        // ---- Interactions.
        let operator = self.operator;
        if let Err(err) = registry.transfer_asset(&operator, &seller, &buyer, asset_id) {
            self.rollback_sale(listing_id, asset_id, seller, price, seller_proceeds, platform_fee);
            return Err(err);
        }

        let refund = attached - price;
        if refund > Decimal::ZERO {
            if let Err(err) = outlet.pay(&buyer, refund) {
                self.rollback_sale(
                    listing_id,
                    asset_id,
                    seller,
                    price,
                    seller_proceeds,
                    platform_fee,
                );
                // Compensating transfer: the buyer owns the asset at this
                // point, so the buyer identity authorizes moving it back.
                registry.transfer_asset(&buyer, &buyer, &seller, asset_id)?;
                return Err(err);
            }
        }

        tracing::info!(
            listing = %listing_id,
            asset = %asset_id,
            price = %price,
            fee = %platform_fee,
            "sale settled"
        );
        self.events.append(Event::Sold {
            listing_id,
            asset_id,
            seller,
            buyer,
            price,
            platform_fee,
        });
        Ok(SaleReceipt {
            listing_id,
            asset_id,
            seller,
            buyer,
            price,
            platform_fee,
            seller_proceeds,
            refund,
            royalty_receiver,
            royalty_amount,
        })
    }

    /// Reverse every effect of an in-progress sale. Only called while the
    /// re-entrancy guard is held, before the Sold event is emitted.
    fn rollback_sale(
        &mut self,
        listing_id: ListingId,
        asset_id: AssetId,
        seller: AccountId,
        price: Decimal,
        seller_proceeds: Decimal,
        platform_fee: Decimal,
    ) {
        if let Some(listing) = self.listings.get_mut(&listing_id) {
            listing.state = ListingState::Active;
        }
        self.by_asset.insert(asset_id, listing_id);
        self.active.insert(listing_id);
        let fee_recipient = self.fee_recipient;
        self.pending.uncredit(&seller, seller_proceeds);
        self.pending.uncredit(&fee_recipient, platform_fee);
        self.pending.unreceive_cash(price);
    }

    /// Cancel a listing. Seller or marketplace admin only.
    ///
    /// # Errors
    /// `ListingNotFound` / `ListingNotAuthorized` / `ListingNotActive`.
    pub fn cancel(&mut self, caller: &AccountId, listing_id: ListingId) -> Result<()> {
        let listing = self
            .listings
            .get(&listing_id)
            .ok_or(AssetmarkError::ListingNotFound(listing_id))?;
        if listing.seller != *caller && !self.access.has(Role::MarketAdmin, caller) {
            return Err(AssetmarkError::ListingNotAuthorized { listing_id });
        }
        let asset_id = listing.asset_id;

        let listing = self
            .listings
            .get_mut(&listing_id)
            .ok_or(AssetmarkError::ListingNotFound(listing_id))?;
        listing.mark_cancelled()?;
        self.by_asset.remove(&asset_id);
        self.active.remove(&listing_id);

        self.events.append(Event::Cancelled { listing_id });
        Ok(())
    }

    /// Change the asking price. Seller only, Active only.
    ///
    /// # Errors
    /// `ListingNotFound` / `ListingNotAuthorized` / `ListingNotActive` /
    /// `InvalidPrice`.
    pub fn update_price(
        &mut self,
        caller: &AccountId,
        listing_id: ListingId,
        price: Decimal,
    ) -> Result<()> {
        if price <= Decimal::ZERO {
            return Err(AssetmarkError::InvalidPrice);
        }
        let listing = self
            .listings
            .get_mut(&listing_id)
            .ok_or(AssetmarkError::ListingNotFound(listing_id))?;
        if listing.seller != *caller {
            return Err(AssetmarkError::ListingNotAuthorized { listing_id });
        }
        if !listing.is_active() {
            return Err(AssetmarkError::ListingNotActive {
                listing_id,
                state: listing.state.to_string(),
            });
        }
        listing.price = price;
        self.events.append(Event::PriceUpdated {
            scope: PriceScope::Listing(listing_id),
            price,
        });
        Ok(())
    }

    // =================================================================
    // Pull payments
    // =================================================================

    /// Pull the caller's entire pending balance out of the system.
    ///
    /// The balance is zeroed **before** the payout hook runs; a failed
    /// payout restores it and surfaces the error.
    ///
    /// # Errors
    /// `NothingToWithdraw` / `ReentrantCall`, or the payout failure.
    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        self.guard.enter()?;
        let out = self.withdraw_locked(caller, outlet);
        self.guard.exit();
        out
    }

    fn withdraw_locked(
        &mut self,
        caller: &AccountId,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        let amount = self.pending.take_all(caller)?;

        if let Err(err) = outlet.pay(caller, amount) {
            self.pending.restore(*caller, amount);
            return Err(err);
        }
        self.pending.record_payout(amount);

        tracing::debug!(account = %caller, amount = %amount, "pending balance withdrawn");
        self.events.append(Event::Withdrawn {
            account: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Book base currency sent directly to the marketplace outside any
    /// sale. It accrues as surplus until swept by
    /// [`emergency_withdraw`](Self::emergency_withdraw).
    pub fn credit_stray_funds(&mut self, amount: Decimal) {
        self.pending.receive_cash(amount);
    }

    // =================================================================
    // Admin
    // =================================================================

    /// Change the platform fee. Applies to future sales only.
    ///
    /// # Errors
    /// `RoleRequired` / `FeeTooHigh` (above
    /// [`constants::MAX_PLATFORM_FEE_BPS`]).
    pub fn set_platform_fee_bps(&mut self, caller: &AccountId, bps: u32) -> Result<()> {
        self.access.ensure(Role::MarketAdmin, caller)?;
        if bps > constants::MAX_PLATFORM_FEE_BPS {
            return Err(AssetmarkError::FeeTooHigh {
                bps,
                max: constants::MAX_PLATFORM_FEE_BPS,
            });
        }
        self.platform_fee_bps = bps;
        Ok(())
    }

    /// Change where the platform fee accrues. Already-credited balances
    /// stay with the old recipient.
    ///
    /// # Errors
    /// `RoleRequired` / `NilAccount`.
    pub fn set_fee_recipient(&mut self, caller: &AccountId, recipient: AccountId) -> Result<()> {
        self.access.ensure(Role::MarketAdmin, caller)?;
        if recipient.is_nil() {
            return Err(AssetmarkError::NilAccount {
                field: "fee_recipient",
            });
        }
        self.fee_recipient = recipient;
        Ok(())
    }

    /// Sweep stray cash — anything held beyond what pending balances are
    /// owed. Can never touch escrowed sale proceeds.
    ///
    /// # Errors
    /// `RoleRequired` / `NothingToWithdraw` / `ReentrantCall`, or the
    /// payout failure (state restored).
    pub fn emergency_withdraw(
        &mut self,
        caller: &AccountId,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        self.access.ensure(Role::MarketAdmin, caller)?;
        self.guard.enter()?;
        let out = self.emergency_withdraw_locked(caller, outlet);
        self.guard.exit();
        out
    }

    fn emergency_withdraw_locked(
        &mut self,
        caller: &AccountId,
        outlet: &mut dyn FundsOutlet,
    ) -> Result<Decimal> {
        let surplus = self.pending.surplus();
        if surplus <= Decimal::ZERO {
            return Err(AssetmarkError::NothingToWithdraw(*caller));
        }

        self.pending.record_payout(surplus);
        if let Err(err) = outlet.pay(caller, surplus) {
            self.pending.receive_cash(surplus);
            return Err(err);
        }

        self.events.append(Event::Withdrawn {
            account: *caller,
            amount: surplus,
        });
        Ok(surplus)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Point lookup by listing id.
    #[must_use]
    pub fn listing(&self, listing_id: ListingId) -> Option<&Listing> {
        self.listings.get(&listing_id)
    }

    /// All Active listings, in id order. Served from the active index —
    /// cost is proportional to the number of *active* listings, not to
    /// every listing ever created.
    #[must_use]
    pub fn active_listings(&self) -> Vec<&Listing> {
        self.active
            .iter()
            .filter_map(|id| self.listings.get(id))
            .collect()
    }

    /// The Active listing for an asset, if any.
    #[must_use]
    pub fn listing_for_asset(&self, asset_id: AssetId) -> Option<&Listing> {
        self.by_asset
            .get(&asset_id)
            .and_then(|id| self.listings.get(id))
    }

    /// An account's withdrawable balance.
    #[must_use]
    pub fn pending_of(&self, account: &AccountId) -> Decimal {
        self.pending.balance_of(account)
    }

    /// Check the escrow conservation invariant.
    ///
    /// # Errors
    /// Returns `EscrowConservationViolation` if pending balances exceed
    /// cash on hand.
    pub fn verify_conservation(&self) -> Result<()> {
        self.pending.verify_conservation()
    }

    /// The operator identity sellers pre-authorize on the registry.
    #[must_use]
    pub fn operator(&self) -> AccountId {
        self.operator
    }

    /// Current platform fee in basis points.
    #[must_use]
    pub fn platform_fee_bps(&self) -> u32 {
        self.platform_fee_bps
    }

    /// Current fee recipient.
    #[must_use]
    pub fn fee_recipient(&self) -> AccountId {
        self.fee_recipient
    }

    /// The marketplace's append-only event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }
}
