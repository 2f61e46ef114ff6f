//! Listings and their terminal state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetmark_types::{AccountId, AssetId, AssetmarkError, ListingId, Result};

/// Lifecycle state of a listing.
///
/// Transitions are **monotonic**: `Active → Sold` and `Active → Cancelled`
/// only. Terminal listings never reopen; relisting mints a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingState {
    /// Open for purchase at the asking price.
    Active,
    /// Purchased. Proceeds sit in the pull-payment ledger. **Irreversible.**
    Sold,
    /// Withdrawn by the seller or an admin. **Irreversible.**
    Cancelled,
}

impl ListingState {
    /// Can this listing transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Active, Self::Sold | Self::Cancelled))
    }
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Sold => write!(f, "SOLD"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A fixed-price listing of a registry asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Sequential id, allocated from 1.
    pub id: ListingId,
    /// The asset offered for sale.
    pub asset_id: AssetId,
    /// Account that created the listing (and still owns the asset while
    /// the listing is Active).
    pub seller: AccountId,
    /// Asking price in base currency. Seller-mutable while Active.
    pub price: Decimal,
    /// Lifecycle state.
    pub state: ListingState,
    /// When the listing was created.
    pub listed_at: DateTime<Utc>,
}

impl Listing {
    /// Create a new Active listing.
    #[must_use]
    pub fn new(id: ListingId, asset_id: AssetId, seller: AccountId, price: Decimal) -> Self {
        Self {
            id,
            asset_id,
            seller,
            price,
            state: ListingState::Active,
            listed_at: Utc::now(),
        }
    }

    /// Whether the listing can still be bought, cancelled, or repriced.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ListingState::Active
    }

    /// Transition to Sold.
    ///
    /// # Errors
    /// Returns `ListingNotActive` unless the listing is Active.
    pub fn mark_sold(&mut self) -> Result<()> {
        self.transition(ListingState::Sold)
    }

    /// Transition to Cancelled.
    ///
    /// # Errors
    /// Returns `ListingNotActive` unless the listing is Active.
    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.transition(ListingState::Cancelled)
    }

    fn transition(&mut self, target: ListingState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(AssetmarkError::ListingNotActive {
                listing_id: self.id,
                state: self.state.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }
}
