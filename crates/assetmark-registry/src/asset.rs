//! The asset record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetmark_types::{AccountId, AssetId};

/// A registered asset record.
///
/// Created once at registration and never destroyed. `owner` changes on
/// transfer; `verified` is flipped (once) by the registrar; everything
/// else is immutable for the life of the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Sequential id, allocated from 1.
    pub id: AssetId,
    /// Current owner.
    pub owner: AccountId,
    /// Canonical form of the real-world identifier; globally unique
    /// across all records ever registered.
    pub normalized_external_id: String,
    /// Pointer to the canonical off-chain metadata document.
    pub metadata_uri: String,
    /// Display title.
    pub title: String,
    /// Display attribution (inventor, author, issuer).
    pub attribution: String,
    /// Registrar confirmation flag. Starts `false`.
    pub verified: bool,
    /// Royalty receiver recorded at registration (the first owner).
    pub royalty_receiver: AccountId,
    /// Royalty in basis points.
    pub royalty_bps: u32,
    /// When the record was registered.
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_serde_roundtrip() {
        let owner = AccountId::new();
        let asset = Asset {
            id: AssetId(1),
            owner,
            normalized_external_id: "US1234567".to_string(),
            metadata_uri: "https://meta.example/records/US1234567".to_string(),
            title: "Process for widget lamination".to_string(),
            attribution: "A. Inventor".to_string(),
            verified: false,
            royalty_receiver: owner,
            royalty_bps: 250,
            registered_at: Utc::now(),
        };
        let json = serde_json::to_string(&asset).unwrap();
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, asset.id);
        assert_eq!(back.normalized_external_id, asset.normalized_external_id);
        assert!(!back.verified);
    }
}
