//! Type identity for view model classes.
//!
//! The store indexes live instances by their concrete type so that callers
//! can look a view model up "by class". [`ViewModelKind`] is keyed by
//! [`TypeId`], never by the type name: two identically named types in
//! different modules are different kinds.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// A stable identity for a view model type.
///
/// Equality and hashing use the [`TypeId`] only. The type name is carried for
/// diagnostics and debug-build id prefixes.
///
/// # Examples
///
/// ```
/// use mvvm_core::ViewModelKind;
///
/// struct TodoList;
/// struct TodoItem;
///
/// assert_eq!(ViewModelKind::of::<TodoList>(), ViewModelKind::of::<TodoList>());
/// assert_ne!(ViewModelKind::of::<TodoList>(), ViewModelKind::of::<TodoItem>());
/// assert_eq!(ViewModelKind::of::<TodoList>().short_name(), "TodoList");
/// ```
#[derive(Clone, Copy)]
pub struct ViewModelKind {
    type_id: TypeId,
    name: &'static str,
}

impl ViewModelKind {
    /// Returns the kind of `T`.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the underlying [`TypeId`].
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name without its module path or generic arguments.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for ViewModelKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ViewModelKind {}

impl Hash for ViewModelKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ViewModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewModelKind").field(&self.name).finish()
    }
}

impl fmt::Display for ViewModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Serialize for ViewModelKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}
