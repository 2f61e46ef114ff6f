//! Append-only event log for downstream mirrors.
//!
//! Every successful state transition emits exactly one [`Event`]; a failed
//! operation emits nothing. Each component owns its own [`EventLog`];
//! records carry a monotonic sequence number and a SHA-256 hash of the
//! serialized event so mirrors can detect gaps and tampering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, AssetId, ListingId};

/// Which price changed in a [`Event::PriceUpdated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceScope {
    /// The credit ledger's unit price.
    CreditUnit,
    /// A gateway currency's service price.
    Currency(String),
    /// A marketplace listing's asking price.
    Listing(ListingId),
}

/// A state transition worth announcing to downstream mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new asset record was registered.
    AssetRegistered {
        asset_id: AssetId,
        owner: AccountId,
        normalized_external_id: String,
    },
    /// The registrar confirmed an asset record.
    AssetVerified { asset_id: AssetId },
    /// Credits were minted against attached base currency.
    CreditsPurchased {
        payer: AccountId,
        amount: Decimal,
        credits: Decimal,
    },
    /// Credits were burned and base currency paid out of the reserve.
    CreditsRedeemed {
        holder: AccountId,
        credits: Decimal,
        amount: Decimal,
    },
    /// A metered-service payment was collected.
    PaymentReceived {
        payer: AccountId,
        currency: String,
        amount: Decimal,
        usage_count: u64,
    },
    /// An administrative or seller price change.
    PriceUpdated { scope: PriceScope, price: Decimal },
    /// An asset was listed for sale.
    Listed {
        listing_id: ListingId,
        asset_id: AssetId,
        seller: AccountId,
        price: Decimal,
    },
    /// A listing was sold and proceeds split into pending balances.
    Sold {
        listing_id: ListingId,
        asset_id: AssetId,
        seller: AccountId,
        buyer: AccountId,
        price: Decimal,
        platform_fee: Decimal,
    },
    /// A listing was cancelled by its seller or an admin.
    Cancelled { listing_id: ListingId },
    /// A pending balance was pulled out of the system.
    Withdrawn { account: AccountId, amount: Decimal },
}

impl Event {
    /// Stable uppercase label, for log lines and mirror routing.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AssetRegistered { .. } => "ASSET_REGISTERED",
            Self::AssetVerified { .. } => "ASSET_VERIFIED",
            Self::CreditsPurchased { .. } => "CREDITS_PURCHASED",
            Self::CreditsRedeemed { .. } => "CREDITS_REDEEMED",
            Self::PaymentReceived { .. } => "PAYMENT_RECEIVED",
            Self::PriceUpdated { .. } => "PRICE_UPDATED",
            Self::Listed { .. } => "LISTED",
            Self::Sold { .. } => "SOLD",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Withdrawn { .. } => "WITHDRAWN",
        }
    }
}

/// One entry in the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 1 per log.
    pub seq: u64,
    /// The transition that occurred.
    pub event: Event,
    /// SHA-256 of the serialized event payload.
    pub payload_hash: [u8; 32],
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    /// Hex rendering of the payload hash.
    #[must_use]
    pub fn payload_hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }
}

/// Append-only, per-component event sink.
///
/// Records are never removed or reordered; `seq` gaps would indicate a
/// bug, and mirrors may rely on contiguity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_seq: 1,
        }
    }

    /// Append an event, assigning the next sequence number.
    pub fn append(&mut self, event: Event) {
        let payload = serde_json::to_vec(&event).expect("event serialization is infallible");
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        let payload_hash: [u8; 32] = hasher.finalize().into();

        self.records.push(EventRecord {
            seq: self.next_seq,
            event,
            payload_hash,
            recorded_at: Utc::now(),
        });
        self.next_seq += 1;
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// The most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Number of records appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
