//! # assetmark-market
//!
//! **Escrow Marketplace**: lists registry assets at fixed prices,
//! executes atomic sale-for-payment, and splits proceeds between seller
//! and platform fee recipient through a pull-payment ledger.
//!
//! ## Listing State Machine
//!
//! ```text
//!   ┌────────┐   buy    ┌──────┐
//!   │ ACTIVE ├─────────▶│ SOLD │
//!   └───┬────┘          └──────┘
//!       │ cancel
//!       ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Sold and Cancelled are terminal; a new sale of the same asset always
//! creates a new listing id. Proceeds never leave the marketplace on
//! their own — the credited party pulls them with `withdraw()`, which
//! zeroes the balance **before** the payout hook runs.

pub mod listing;
pub mod market;
pub mod pending;

pub use listing::{Listing, ListingState};
pub use market::{Marketplace, SaleReceipt};
pub use pending::PendingWithdrawals;
