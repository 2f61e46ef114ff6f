//! Error types for the Assetmark settlement core.
//!
//! All errors use the `AM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Registry errors
//! - 2xx: Credit ledger errors
//! - 3xx: Payment gateway errors
//! - 4xx: Marketplace errors
//! - 5xx: Guards / roles / general errors
//!
//! Every failure also classifies into an [`ErrorKind`] so callers can
//! branch on the failure class without string-matching messages. A failed
//! operation rolls back its entire transition — no error here ever leaves
//! partial state behind.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, AssetId, ListingId, Role};

/// Coarse failure classification. Stable across error variants; the
/// variant carries the detail, the kind carries the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed, empty, or zero-valued arguments.
    InvalidInput,
    /// Role, ownership, or approval failure.
    Unauthorized,
    /// Unknown identifier.
    NotFound,
    /// Duplicate registration, double-listing, or a terminal-state replay.
    Conflict,
    /// Payment, balance, reserve, or supply-headroom shortfall.
    InsufficientFunds,
    /// The component's pause gate is closed.
    Paused,
    /// The component's re-entrancy guard is held.
    Reentrant,
}

/// Central error enum for all Assetmark operations.
#[derive(Debug, Error)]
pub enum AssetmarkError {
    // =================================================================
    // Registry Errors (1xx)
    // =================================================================
    /// The requested asset record does not exist.
    #[error("AM_ERR_100: Asset not found: {0}")]
    AssetNotFound(AssetId),

    /// A required string field was empty (possibly after normalization).
    #[error("AM_ERR_101: Required field is empty: {field}")]
    EmptyField { field: &'static str },

    /// An asset with the same normalized external id was already registered.
    #[error("AM_ERR_102: Duplicate external id (normalized): {normalized}")]
    DuplicateExternalId { normalized: String },

    /// Caller does not own the asset.
    #[error("AM_ERR_103: Caller is not the owner of {asset_id}")]
    NotAssetOwner { asset_id: AssetId },

    /// Caller is neither owner, per-asset approvee, nor operator.
    #[error("AM_ERR_104: Transfer of {asset_id} not authorized for caller")]
    TransferNotAuthorized { asset_id: AssetId },

    // =================================================================
    // Credit Ledger Errors (2xx)
    // =================================================================
    /// Not enough credits to debit.
    #[error("AM_ERR_200: Insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: Decimal, available: Decimal },

    /// The reserve does not actually hold enough base currency to pay out,
    /// regardless of what supply/price arithmetic would allow.
    #[error("AM_ERR_201: Insufficient reserve: requested {requested}, reserve holds {reserve}")]
    InsufficientReserve { requested: Decimal, reserve: Decimal },

    /// Minting the requested credits would exceed the supply cap.
    #[error("AM_ERR_202: Supply cap exceeded: requested {requested}, headroom {headroom}")]
    SupplyCapExceeded { requested: Decimal, headroom: Decimal },

    /// Allowance is too small for the requested `transfer_from`.
    #[error("AM_ERR_203: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Decimal, available: Decimal },

    /// Caller is not on the authorized-spender trust list.
    #[error("AM_ERR_204: Account {0} is not an authorized spender")]
    NotAuthorizedSpender(AccountId),

    // =================================================================
    // Payment Gateway Errors (3xx)
    // =================================================================
    /// The currency code is not configured on the gateway.
    #[error("AM_ERR_300: Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Attached base currency does not cover the configured price.
    #[error("AM_ERR_301: Insufficient payment: required {required}, attached {attached}")]
    InsufficientPayment { required: Decimal, attached: Decimal },

    /// The payer's credit balance cannot cover the configured price.
    #[error("AM_ERR_302: Insufficient credit balance: need {needed}, have {available}")]
    InsufficientCreditBalance { needed: Decimal, available: Decimal },

    /// An opaque external transfer reverted.
    #[error("AM_ERR_303: External transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// The payer's external token balance cannot cover the configured price.
    #[error("AM_ERR_304: Insufficient {currency} balance: need {needed}, have {available}")]
    InsufficientTokenBalance {
        currency: String,
        needed: Decimal,
        available: Decimal,
    },

    // =================================================================
    // Marketplace Errors (4xx)
    // =================================================================
    /// The requested listing does not exist.
    #[error("AM_ERR_400: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The listing is Sold or Cancelled; terminal states never reopen.
    #[error("AM_ERR_401: Listing {listing_id} is {state}, not ACTIVE")]
    ListingNotActive { listing_id: ListingId, state: String },

    /// Listing or update price must be positive.
    #[error("AM_ERR_402: Price must be positive")]
    InvalidPrice,

    /// The asset already has an active listing (one per asset).
    #[error("AM_ERR_403: {asset_id} is already listed as {listing_id}")]
    AssetAlreadyListed {
        asset_id: AssetId,
        listing_id: ListingId,
    },

    /// Buyer and seller are the same account.
    #[error("AM_ERR_404: Self-trade blocked: buyer and seller are the same account")]
    SelfTrade,

    /// The caller has no pending balance to pull.
    #[error("AM_ERR_405: Nothing to withdraw for account {0}")]
    NothingToWithdraw(AccountId),

    /// Platform fee above the hard cap.
    #[error("AM_ERR_406: Fee {bps} bps exceeds maximum {max} bps")]
    FeeTooHigh { bps: u32, max: u32 },

    /// Caller is neither the listing's seller nor a marketplace admin.
    #[error("AM_ERR_407: Caller may not manage listing {listing_id}")]
    ListingNotAuthorized { listing_id: ListingId },

    // =================================================================
    // Guards / Roles / General (5xx)
    // =================================================================
    /// The component is paused; mutating operations are blocked.
    #[error("AM_ERR_500: Component is paused")]
    ComponentPaused,

    /// The re-entrancy guard is held by an in-progress operation.
    #[error("AM_ERR_501: Re-entrant call blocked")]
    ReentrantCall,

    /// Caller does not hold the required role.
    #[error("AM_ERR_502: Role {role} required")]
    RoleRequired { role: Role },

    /// An amount argument was zero where a positive value is required.
    #[error("AM_ERR_503: Amount must be positive")]
    ZeroAmount,

    /// The all-zero account was supplied where a real account is required.
    #[error("AM_ERR_504: Nil account not allowed: {field}")]
    NilAccount { field: &'static str },

    /// Escrow conservation violated — critical safety alert. Pending
    /// withdrawals must never exceed cash actually held.
    #[error("AM_ERR_505: Escrow conservation violated: {reason}")]
    EscrowConservationViolation { reason: String },
}

impl AssetmarkError {
    /// The taxonomy class of this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyField { .. }
            | Self::InvalidPrice
            | Self::SelfTrade
            | Self::NothingToWithdraw(_)
            | Self::FeeTooHigh { .. }
            | Self::ZeroAmount
            | Self::NilAccount { .. } => ErrorKind::InvalidInput,

            Self::NotAssetOwner { .. }
            | Self::TransferNotAuthorized { .. }
            | Self::NotAuthorizedSpender(_)
            | Self::ListingNotAuthorized { .. }
            | Self::RoleRequired { .. } => ErrorKind::Unauthorized,

            Self::AssetNotFound(_) | Self::ListingNotFound(_) | Self::UnknownCurrency(_) => {
                ErrorKind::NotFound
            }

            Self::DuplicateExternalId { .. }
            | Self::AssetAlreadyListed { .. }
            | Self::ListingNotActive { .. }
            | Self::EscrowConservationViolation { .. } => ErrorKind::Conflict,

            Self::InsufficientCredits { .. }
            | Self::InsufficientReserve { .. }
            | Self::SupplyCapExceeded { .. }
            | Self::InsufficientAllowance { .. }
            | Self::InsufficientPayment { .. }
            | Self::InsufficientCreditBalance { .. }
            | Self::TransferFailed { .. }
            | Self::InsufficientTokenBalance { .. } => ErrorKind::InsufficientFunds,

            Self::ComponentPaused => ErrorKind::Paused,
            Self::ReentrantCall => ErrorKind::Reentrant,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AssetmarkError>;
