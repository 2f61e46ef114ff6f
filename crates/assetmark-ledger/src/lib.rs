//! # assetmark-ledger
//!
//! **Credit Ledger**: fungible balances with fixed-price mint-against-
//! reserve and burn-for-refund, plus a trust-delegation mechanism letting
//! a designated component debit balances without a per-call allowance.
//!
//! ## Value Flow
//!
//! ```text
//! purchase() → credits minted at floor(amount / unit_price), reserve grows
//! redeem()   → credits burned, reserve pays out (reserve-checked)
//! spend_on_behalf() → authorized spender debits a holder directly
//! ```
//!
//! The redemption invariant is the heart of this crate: **the reserve
//! never pays out more base currency than it actually holds**, no matter
//! what the supply/price arithmetic would allow after an admin reprice or
//! reserve withdrawal.

pub mod ledger;

pub use ledger::CreditLedger;
