//! View model identifiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The identifier of a view model instance within a store.
///
/// Uses a newtype pattern so that a raw string can't be passed where an id
/// is expected. Ids are immutable once assigned; the same id may be shared by
/// several bound views on purpose (a fixed id), in which case they all resolve
/// to one instance.
///
/// # Examples
///
/// ```
/// use mvvm_core::ViewModelId;
///
/// let id = ViewModelId::new("my-test");
/// assert_eq!(id.as_str(), "my-test");
/// assert_eq!(id, ViewModelId::from("my-test"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewModelId(String);

impl ViewModelId {
    /// Creates a new id from anything string-like.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is the empty string.
    ///
    /// Empty ids are treated as "no id" by the generator.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ViewModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ViewModelId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ViewModelId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ViewModelId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ViewModelId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}
