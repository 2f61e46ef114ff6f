//! # assetmark-types
//!
//! Shared types, errors, and configuration for the **Assetmark**
//! settlement core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AssetId`], [`ListingId`], [`CurrencyCode`]
//! - **Errors**: [`AssetmarkError`] with `AM_ERR_` prefix codes and the
//!   [`ErrorKind`] taxonomy
//! - **Event log**: [`Event`], [`EventRecord`], [`EventLog`]
//! - **Role capabilities**: [`Role`], [`AccessControl`]
//! - **Guards**: [`ReentrancyGuard`], [`PauseGate`]
//! - **Collaborator seams**: [`FungibleCurrency`], [`AssetOps`],
//!   [`CreditSpender`], [`FundsOutlet`]
//! - **Configuration**: [`RegistryConfig`], [`LedgerConfig`],
//!   [`GatewayConfig`], [`MarketConfig`]
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod guard;
pub mod ids;
pub mod interfaces;
pub mod roles;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fakes;

// Re-export all primary types at crate root for ergonomic imports:
//   use assetmark_types::{AccountId, AssetmarkError, Event, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use guard::*;
pub use ids::*;
pub use interfaces::*;
pub use roles::*;

// Constants are accessed via `assetmark_types::constants::FOO`
// (not re-exported to avoid name collisions).
