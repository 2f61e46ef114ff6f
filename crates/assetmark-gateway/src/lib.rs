//! # assetmark-gateway
//!
//! **Payment Gateway**: collects metered-service payments in several
//! independently priced currencies — attached base currency (excess
//! refunded atomically), opaque external tokens (pulled via a
//! pre-authorized transfer), and ledger credits (debited through the
//! authorized-spender seam).
//!
//! ## Payment Flow
//!
//! ```text
//! verify funds → collect → increment usage counter → emit receipt
//! ```
//!
//! One atomic step per payment; a failure at any point leaves no partial
//! state behind. Per-account usage and paid-per-currency counters are
//! monotonic non-decreasing.

pub mod gateway;
pub mod stats;

pub use gateway::{PaymentGateway, PaymentReceipt};
pub use stats::UsageStats;
