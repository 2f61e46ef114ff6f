//! Per-component defense guards.
//!
//! Two small gates shared by every component:
//!
//! - [`ReentrancyGuard`] — a busy flag set on entry to any operation that
//!   calls out to opaque collaborator code and cleared on exit. A call
//!   arriving while the flag is set fails with `AM_ERR_501`. State is
//!   always mutated before external calls as the primary defense; this
//!   guard is the second layer.
//! - [`PauseGate`] — a global stop checked at the top of every mutating
//!   entry point. Blocks new operations; cannot affect in-flight ones
//!   (none persist across steps).

use serde::{Deserialize, Serialize};

use crate::{AssetmarkError, Result};

/// Busy-flag re-entrancy guard.
///
/// Usage pattern inside a component:
///
/// ```ignore
/// pub fn buy(&mut self, ...) -> Result<SaleReceipt> {
///     self.guard.enter()?;
///     let out = self.buy_locked(...);
///     self.guard.exit();
///     out
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReentrancyGuard {
    busy: bool,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard.
    ///
    /// # Errors
    /// Returns [`AssetmarkError::ReentrantCall`] if already held.
    pub fn enter(&mut self) -> Result<()> {
        if self.busy {
            return Err(AssetmarkError::ReentrantCall);
        }
        self.busy = true;
        Ok(())
    }

    /// Release the guard. Safe to call when not held.
    pub fn exit(&mut self) {
        self.busy = false;
    }

    /// Whether an operation is currently in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Global pause flag for a component.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PauseGate {
    paused: bool,
}

impl PauseGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate. Mutating entry points fail until [`unpause`](Self::unpause).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Reopen the gate.
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Whether the gate is closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Guard a mutating entry point.
    ///
    /// # Errors
    /// Returns [`AssetmarkError::ComponentPaused`] while paused.
    pub fn ensure_active(&self) -> Result<()> {
        if self.paused {
            Err(AssetmarkError::ComponentPaused)
        } else {
            Ok(())
        }
    }
}
