//! The asset registry: registration, verification, ownership.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;

use assetmark_types::{
    constants, AccessControl, AccountId, AssetId, AssetOps, AssetmarkError, Event, EventLog,
    RegistryConfig, Result, Role,
};

use crate::asset::Asset;
use crate::normalize::normalize_external_id;

/// Issues and tracks unique asset records.
///
/// Uniqueness is keyed on the normalized external id: a spelling variant
/// of an already-registered identifier is a [`AssetmarkError::DuplicateExternalId`]
/// conflict, not a new record. Records are never destroyed.
pub struct AssetRegistry {
    config: RegistryConfig,
    access: AccessControl,
    /// All records, by sequential id.
    assets: HashMap<AssetId, Asset>,
    /// Normalized external id → record. The dedup index.
    by_external_id: HashMap<String, AssetId>,
    /// Per-asset approval, cleared on every transfer.
    approvals: HashMap<AssetId, AccountId>,
    /// Owner → blanket operators (marketplace pre-authorization).
    operators: HashMap<AccountId, HashSet<AccountId>>,
    /// Next id to allocate; ids start at 1.
    next_id: AssetId,
    events: EventLog,
}

impl AssetRegistry {
    /// Create an empty registry.
    ///
    /// # Panics
    /// Panics if the configured default royalty exceeds
    /// [`constants::MAX_ROYALTY_BPS`].
    #[must_use]
    pub fn new(config: RegistryConfig, access: AccessControl) -> Self {
        assert!(
            config.default_royalty_bps <= constants::MAX_ROYALTY_BPS,
            "default royalty {} bps exceeds maximum {}",
            config.default_royalty_bps,
            constants::MAX_ROYALTY_BPS
        );
        Self {
            config,
            access,
            assets: HashMap::new(),
            by_external_id: HashMap::new(),
            approvals: HashMap::new(),
            operators: HashMap::new(),
            next_id: AssetId(1),
            events: EventLog::new(),
        }
    }

    // =================================================================
    // Registration
    // =================================================================

    fn require_non_empty(value: &str, field: &'static str) -> Result<()> {
        if value.trim().is_empty() {
            Err(AssetmarkError::EmptyField { field })
        } else {
            Ok(())
        }
    }

    /// Register a new asset record.
    ///
    /// All string fields are required; the external id must survive
    /// normalization and must not collide with any record ever
    /// registered. The first owner becomes the royalty receiver at the
    /// configured default rate.
    ///
    /// # Errors
    /// - `NilAccount` / `EmptyField` on missing inputs
    /// - `DuplicateExternalId` if the normalized id already exists
    pub fn register(
        &mut self,
        owner: AccountId,
        metadata_uri: &str,
        title: &str,
        attribution: &str,
        external_id: &str,
    ) -> Result<AssetId> {
        if owner.is_nil() {
            return Err(AssetmarkError::NilAccount { field: "owner" });
        }
        Self::require_non_empty(metadata_uri, "metadata_uri")?;
        Self::require_non_empty(title, "title")?;
        Self::require_non_empty(attribution, "attribution")?;
        Self::require_non_empty(external_id, "external_id")?;

        let normalized = normalize_external_id(external_id);
        if normalized.is_empty() {
            return Err(AssetmarkError::EmptyField {
                field: "external_id",
            });
        }
        if self.by_external_id.contains_key(&normalized) {
            return Err(AssetmarkError::DuplicateExternalId { normalized });
        }

        let id = self.next_id;
        self.next_id = self.next_id.next();

        let asset = Asset {
            id,
            owner,
            normalized_external_id: normalized.clone(),
            metadata_uri: metadata_uri.to_string(),
            title: title.to_string(),
            attribution: attribution.to_string(),
            verified: false,
            royalty_receiver: owner,
            royalty_bps: self.config.default_royalty_bps,
            registered_at: Utc::now(),
        };
        self.assets.insert(id, asset);
        self.by_external_id.insert(normalized.clone(), id);

        self.events.append(Event::AssetRegistered {
            asset_id: id,
            owner,
            normalized_external_id: normalized,
        });
        Ok(id)
    }

    /// Confirm a record. Registrar role only.
    ///
    /// Re-verifying an already-verified record is a no-op success and
    /// emits no second event.
    ///
    /// # Errors
    /// - `RoleRequired` if the caller is not a registrar
    /// - `AssetNotFound` on an unknown id
    pub fn verify(&mut self, caller: &AccountId, asset_id: AssetId) -> Result<()> {
        self.access.ensure(Role::Registrar, caller)?;
        let asset = self
            .assets
            .get_mut(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;

        if asset.verified {
            return Ok(());
        }
        asset.verified = true;
        self.events.append(Event::AssetVerified { asset_id });
        Ok(())
    }

    // =================================================================
    // Ownership
    // =================================================================

    /// Set or clear the per-asset approval. Owner only.
    ///
    /// # Errors
    /// - `AssetNotFound` on an unknown id
    /// - `NotAssetOwner` if the caller does not own the asset
    pub fn approve(
        &mut self,
        caller: &AccountId,
        asset_id: AssetId,
        approved: Option<AccountId>,
    ) -> Result<()> {
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        if asset.owner != *caller {
            return Err(AssetmarkError::NotAssetOwner { asset_id });
        }
        match approved {
            Some(account) => {
                self.approvals.insert(asset_id, account);
            }
            None => {
                self.approvals.remove(&asset_id);
            }
        }
        Ok(())
    }

    /// Grant or revoke a blanket operator over every asset the owner
    /// holds, now and in the future. This is how sellers pre-authorize
    /// the marketplace.
    pub fn set_operator(&mut self, owner: AccountId, operator: AccountId, approved: bool) {
        let entry = self.operators.entry(owner).or_default();
        if approved {
            entry.insert(operator);
        } else {
            entry.remove(&operator);
        }
    }

    /// Transfer ownership. The caller must be the owner, the per-asset
    /// approvee, or a blanket operator of `from`; `from` must be the
    /// current owner. The per-asset approval is cleared.
    ///
    /// # Errors
    /// - `AssetNotFound` / `NilAccount`
    /// - `NotAssetOwner` if `from` is not the current owner
    /// - `TransferNotAuthorized` if the caller has no standing
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        from: &AccountId,
        to: &AccountId,
        asset_id: AssetId,
    ) -> Result<()> {
        if to.is_nil() {
            return Err(AssetmarkError::NilAccount { field: "to" });
        }
        let authorized = self.is_authorized(caller, asset_id)?;
        let asset = self
            .assets
            .get_mut(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        if asset.owner != *from {
            return Err(AssetmarkError::NotAssetOwner { asset_id });
        }
        if !authorized {
            return Err(AssetmarkError::TransferNotAuthorized { asset_id });
        }

        asset.owner = *to;
        self.approvals.remove(&asset_id);
        Ok(())
    }

    fn is_authorized(&self, operator: &AccountId, asset_id: AssetId) -> Result<bool> {
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        if asset.owner == *operator {
            return Ok(true);
        }
        if self.approvals.get(&asset_id) == Some(operator) {
            return Ok(true);
        }
        Ok(self
            .operators
            .get(&asset.owner)
            .is_some_and(|ops| ops.contains(operator)))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Look up a record by id.
    #[must_use]
    pub fn asset(&self, asset_id: AssetId) -> Option<&Asset> {
        self.assets.get(&asset_id)
    }

    /// Look up a record by external id, in any spelling.
    #[must_use]
    pub fn find_by_external_id(&self, external_id: &str) -> Option<&Asset> {
        let normalized = normalize_external_id(external_id);
        self.by_external_id
            .get(&normalized)
            .and_then(|id| self.assets.get(id))
    }

    /// The canonical off-chain metadata URI for a record.
    ///
    /// # Errors
    /// Returns `AssetNotFound` on an unknown id.
    pub fn token_uri(&self, asset_id: AssetId) -> Result<String> {
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        Ok(format!(
            "{}{}",
            self.config.base_uri, asset.normalized_external_id
        ))
    }

    /// Royalty owed on a sale at `sale_price`: `price * bps / 10_000`.
    ///
    /// # Errors
    /// Returns `AssetNotFound` on an unknown id.
    pub fn royalty_amount(&self, asset_id: AssetId, sale_price: Decimal) -> Result<Decimal> {
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        Ok(sale_price * Decimal::from(asset.royalty_bps) / Decimal::from(constants::BPS_DENOMINATOR))
    }

    /// Total records ever registered.
    #[must_use]
    pub fn total_registered(&self) -> u64 {
        self.assets.len() as u64
    }

    /// The registry's append-only event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

impl AssetOps for AssetRegistry {
    fn owner_of(&self, asset_id: AssetId) -> Result<AccountId> {
        self.assets
            .get(&asset_id)
            .map(|a| a.owner)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))
    }

    fn is_approved_or_owner(&self, operator: &AccountId, asset_id: AssetId) -> Result<bool> {
        self.is_authorized(operator, asset_id)
    }

    fn transfer_asset(
        &mut self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        asset_id: AssetId,
    ) -> Result<()> {
        self.transfer(operator, from, to, asset_id)
    }

    fn royalty_info(&self, asset_id: AssetId, sale_price: Decimal) -> Result<(AccountId, Decimal)> {
        let asset = self
            .assets
            .get(&asset_id)
            .ok_or(AssetmarkError::AssetNotFound(asset_id))?;
        let amount = self.royalty_amount(asset_id, sale_price)?;
        Ok((asset.royalty_receiver, amount))
    }
}
