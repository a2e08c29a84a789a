//! Lifecycle states of a view model.

use serde::{Deserialize, Serialize};

/// Where a view model is in its lifecycle.
///
/// ```text
/// Unmounted ──mount──▶ Mounting ──setup done──▶ Mounted
///                                                  │
///                         Disposed ◀──teardown── Unmounting ◀──unmount──┘
/// ```
///
/// `Disposed` is absorbing. The mounted flag flips on entry to `Mounting`,
/// before any asynchronous setup runs, and flips back on entry to
/// `Unmounting`.
///
/// # Examples
///
/// ```
/// use mvvm_core::LifecycleState;
///
/// assert!(LifecycleState::Mounting.is_mounted());
/// assert!(!LifecycleState::Unmounting.is_mounted());
/// assert!(LifecycleState::Disposed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created but never mounted.
    #[default]
    Unmounted,

    /// Mount flag set, asynchronous setup in flight.
    Mounting,

    /// Fully mounted.
    Mounted,

    /// Mount flag cleared, asynchronous teardown in flight.
    Unmounting,

    /// Resources released. The instance must not be reused.
    Disposed,
}

impl LifecycleState {
    /// Returns `true` while the mount flag is set.
    #[inline]
    #[must_use]
    pub const fn is_mounted(self) -> bool {
        matches!(self, Self::Mounting | Self::Mounted)
    }

    /// Returns `true` once the instance is disposed.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Returns a short human-readable label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unmounted => "unmounted",
            Self::Mounting => "mounting",
            Self::Mounted => "mounted",
            Self::Unmounting => "unmounting",
            Self::Disposed => "disposed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
