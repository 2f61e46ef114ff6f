//! System-wide constants for the Assetmark settlement core.

/// Basis-point denominator for fee and royalty math.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Hard cap on the marketplace platform fee (10%).
pub const MAX_PLATFORM_FEE_BPS: u32 = 1_000;

/// Default marketplace platform fee (2.5%).
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 250;

/// Hard cap on per-asset royalty metadata (10%).
pub const MAX_ROYALTY_BPS: u32 = 1_000;

/// Default royalty recorded at registration (2.5%).
pub const DEFAULT_ROYALTY_BPS: u32 = 250;

/// Maximum credits that can ever be outstanding.
pub const MAX_CREDIT_SUPPLY: u64 = 10_000_000;

/// Default credit unit price in base currency (0.00002).
pub const DEFAULT_UNIT_PRICE_MANTISSA: i64 = 2;
/// Scale for [`DEFAULT_UNIT_PRICE_MANTISSA`].
pub const DEFAULT_UNIT_PRICE_SCALE: u32 = 5;

/// Well-known currency code for the native base currency.
pub const BASE_CURRENCY: &str = "BASE";

/// Well-known currency code for ledger credits.
pub const CREDIT_CURRENCY: &str = "CREDITS";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Assetmark";
