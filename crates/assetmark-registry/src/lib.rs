//! # assetmark-registry
//!
//! **Asset Registry**: issues unique, externally-deduplicated asset
//! records, tracks single ownership with approve-then-transfer semantics,
//! exposes a registrar-only verification flag and static royalty metadata.
//!
//! ## Record Flow
//!
//! ```text
//! register() → dedup on normalized external id → sequential AssetId
//!           → verify() (REGISTRAR role)
//!           → approve()/set_operator() → transfer()
//! ```
//!
//! The registry implements [`assetmark_types::AssetOps`], the opaque
//! single-owner interface the marketplace trades against.

pub mod asset;
pub mod normalize;
pub mod registry;

pub use asset::Asset;
pub use normalize::normalize_external_id;
pub use registry::AssetRegistry;
