//! Observable payload storage.
//!
//! [`PayloadCell`] holds a view model's payload inside a
//! [`tokio::sync::watch`] channel. Writers go through
//! [`replace_if_changed`](PayloadCell::replace_if_changed), which compares
//! structurally and only notifies subscribers when the value actually
//! changed.

use tokio::sync::watch;

/// The current payload of a view model, observable by subscribers.
///
/// # Examples
///
/// ```
/// use mvvm_store::PayloadCell;
///
/// let cell = PayloadCell::new(vec![1, 2]);
/// let mut rx = cell.subscribe();
///
/// assert!(!cell.replace_if_changed(vec![1, 2]));
/// assert!(!rx.has_changed().unwrap());
///
/// assert!(cell.replace_if_changed(vec![3]));
/// assert!(rx.has_changed().unwrap());
/// assert_eq!(cell.get(), vec![3]);
/// ```
#[derive(Debug)]
pub struct PayloadCell<P> {
    tx: watch::Sender<P>,
}

impl<P: PartialEq> PayloadCell<P> {
    /// Creates a cell holding `initial`.
    #[must_use]
    pub fn new(initial: P) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Replaces the payload if it differs from the current one.
    ///
    /// Returns `true` if the value was replaced (and subscribers notified).
    pub fn replace_if_changed(&self, payload: P) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == payload {
                false
            } else {
                *current = payload;
                true
            }
        })
    }

    /// Runs `f` with a reference to the current payload.
    ///
    /// Do not call back into the cell from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Subscribes to payload changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<P> {
        self.tx.subscribe()
    }
}

impl<P: PartialEq + Clone> PayloadCell<P> {
    /// Returns a clone of the current payload.
    #[must_use]
    pub fn get(&self) -> P {
        self.tx.borrow().clone()
    }
}

impl<P: PartialEq + Default> Default for PayloadCell<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}
