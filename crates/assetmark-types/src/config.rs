//! Configuration types for the Assetmark components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, AccountId, CurrencyCode};

/// Configuration for the asset registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prefix for off-chain metadata documents; the canonical document
    /// for an asset lives at `{base_uri}{normalized_external_id}`.
    pub base_uri: String,
    /// Royalty basis points recorded on every new asset record.
    pub default_royalty_bps: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_uri: "https://meta.assetmark.dev/records/".to_string(),
            default_royalty_bps: constants::DEFAULT_ROYALTY_BPS,
        }
    }
}

/// Configuration for the credit ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base currency per credit. Admin-mutable later, always positive.
    pub unit_price: Decimal,
    /// Maximum credits ever outstanding.
    pub max_supply: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            unit_price: Decimal::new(
                constants::DEFAULT_UNIT_PRICE_MANTISSA,
                constants::DEFAULT_UNIT_PRICE_SCALE,
            ),
            max_supply: Decimal::from(constants::MAX_CREDIT_SUPPLY),
        }
    }
}

/// How the gateway collects a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyKind {
    /// Native base currency attached to the call; excess refunded.
    Base,
    /// Ledger credits debited through the authorized-spender seam.
    Credits,
    /// An opaque external fungible token pulled via `transfer_from`.
    External,
}

/// One currency accepted by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency code (e.g., "BASE", "CREDITS", "USDC").
    pub code: CurrencyCode,
    /// Collection mechanism.
    pub kind: CurrencyKind,
    /// Price of one metered query in this currency. Always positive.
    pub price: Decimal,
}

/// Configuration for the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Accepted currencies. Codes must be unique.
    pub currencies: Vec<CurrencyConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            currencies: vec![
                CurrencyConfig {
                    code: constants::BASE_CURRENCY.to_string(),
                    kind: CurrencyKind::Base,
                    price: Decimal::new(5, 4), // 0.0005
                },
                CurrencyConfig {
                    code: constants::CREDIT_CURRENCY.to_string(),
                    kind: CurrencyKind::Credits,
                    price: Decimal::new(25, 0), // 25 credits per query
                },
            ],
        }
    }
}

/// Configuration for the escrow marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Platform fee in basis points, capped at
    /// [`constants::MAX_PLATFORM_FEE_BPS`] (enforced by the marketplace).
    pub platform_fee_bps: u32,
    /// Account credited with the platform fee on every sale.
    pub fee_recipient: AccountId,
}

impl MarketConfig {
    /// Config with the default fee and the given recipient.
    #[must_use]
    pub fn with_recipient(fee_recipient: AccountId) -> Self {
        Self {
            platform_fee_bps: constants::DEFAULT_PLATFORM_FEE_BPS,
            fee_recipient,
        }
    }
}
