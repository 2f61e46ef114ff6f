//! Collaborator seams between components and the outside world.
//!
//! Cross-component calls (marketplace → registry, gateway → ledger) and
//! calls to externally-controlled code (currency transfers, payout hooks)
//! all go through these traits. Components receive implementations `&mut`
//! per call, which keeps every component testable in isolation with fakes
//! and makes the external-call boundary explicit at each call site.
//!
//! Implementations may be adversarial: they can fail, and the callers are
//! written so that any failure rolls the whole operation back. Invariant-
//! protecting state is always mutated before these traits are invoked.

use rust_decimal::Decimal;

use crate::{AccountId, AssetId, Result};

/// Standard fungible-balance interface, treated opaquely.
///
/// External currencies accepted by the gateway implement this; so does
/// the credit ledger itself.
pub trait FungibleCurrency {
    /// Current balance of `account`.
    fn balance_of(&self, account: &AccountId) -> Decimal;

    /// Remaining allowance from `owner` to `spender`.
    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal;

    /// Set `spender`'s allowance over `owner`'s balance.
    fn approve(&mut self, owner: &AccountId, spender: &AccountId, amount: Decimal) -> Result<()>;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<()>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<()>;
}

/// Standard single-owner asset interface, treated opaquely.
///
/// The registry implements this; the marketplace consumes it.
pub trait AssetOps {
    /// Current owner of the asset.
    fn owner_of(&self, asset_id: AssetId) -> Result<AccountId>;

    /// Whether `operator` may move the asset (owner, per-asset approvee,
    /// or blanket operator).
    fn is_approved_or_owner(&self, operator: &AccountId, asset_id: AssetId) -> Result<bool>;

    /// Transfer the asset from `from` to `to` on behalf of `operator`.
    fn transfer_asset(
        &mut self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        asset_id: AssetId,
    ) -> Result<()>;

    /// Royalty metadata for a sale at `sale_price`: (receiver, amount).
    fn royalty_info(&self, asset_id: AssetId, sale_price: Decimal) -> Result<(AccountId, Decimal)>;
}

/// The gateway → ledger trust seam: debit a holder directly, without a
/// per-call allowance. Only callers on the ledger's authorized-spender
/// list succeed.
pub trait CreditSpender {
    /// Debit `amount` credits from `holder` on behalf of `caller`.
    fn spend_on_behalf(
        &mut self,
        caller: &AccountId,
        holder: &AccountId,
        amount: Decimal,
    ) -> Result<()>;

    /// Current credit balance of `holder`.
    fn credit_balance(&self, holder: &AccountId) -> Decimal;
}

/// Opaque hook through which base currency leaves the system: refunds,
/// pull-payment withdrawals, reserve payouts.
pub trait FundsOutlet {
    /// Pay `amount` of base currency to `to`. May fail; the caller rolls
    /// back its own state when it does.
    fn pay(&mut self, to: &AccountId, amount: Decimal) -> Result<()>;
}
