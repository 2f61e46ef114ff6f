//! Globally unique identifiers used throughout Assetmark.
//!
//! Account identity uses UUIDv7 for time-ordered lexicographic sorting.
//! Asset and listing ids are plain sequential counters starting at 1 —
//! they are allocated by exactly one component each, so a `u64` newtype
//! is all the uniqueness they need.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Unique identifier for an account (user, treasury, fee recipient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The all-zero account. Never a valid counterparty; operations that
    /// require a real account reject it.
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the all-zero account.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Sequential identifier for a registered asset record. The registry
/// allocates these starting from 1; id 0 is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ListingId
// ---------------------------------------------------------------------------

/// Sequential identifier for a marketplace listing, starting from 1.
/// A new sale of the same asset always creates a new listing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ListingId(pub u64);

impl ListingId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CurrencyCode
// ---------------------------------------------------------------------------

/// Type alias for currency identifiers accepted by the payment gateway
/// (e.g., "BASE", "CREDITS", "USDC").
pub type CurrencyCode = String;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
