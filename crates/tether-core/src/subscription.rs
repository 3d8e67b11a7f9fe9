#![forbid(unsafe_code)]

//! Consumer-owned callback holders and the weak handles boxes keep to them.
//!
//! A [`Subscription<T>`] is owned by whoever creates it: a widget, a
//! derivation step, or application code. Boxes only ever see a
//! [`WeakSubscriptionRef<T>`], so dropping the subscription is the way to
//! detach it.
//!
//! # Invariants
//!
//! 1. A box never extends the lifetime of a subscription it notifies.
//! 2. Replacing a callback never replays past values.
//! 3. Notifying a dead [`WeakSubscriptionRef`] is a silent no-op.
//! 4. No internal borrow is held while a callback runs, so a callback may
//!    replace its own subscription's callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

/// How a subscription is treated at the moment it is attached to a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Only future writes are delivered.
    #[default]
    Lazy,
    /// The current value is delivered once before `attach` returns, then
    /// every future write.
    Immediate,
}

impl Delivery {
    /// Whether the current value is delivered on attach.
    #[must_use]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Immediate)
    }
}

struct Slot<T> {
    callback: RefCell<Option<Callback<T>>>,
}

impl<T> Slot<T> {
    fn deliver(&self, value: &T) {
        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback {
            callback(value);
        }
    }
}

/// An independently owned holder of a single optional callback.
///
/// Attach it to one or more [`ValueBox`](crate::ValueBox)es; it receives
/// every write for as long as it is alive. Dropping it is the only way to
/// stop notifications.
pub struct Subscription<T> {
    slot: Rc<Slot<T>>,
}

impl<T: 'static> Subscription<T> {
    /// Create a subscription that runs `callback` on every delivered value.
    pub fn new(callback: impl Fn(&T) + 'static) -> Self {
        let callback: Callback<T> = Rc::new(callback);
        Self {
            slot: Rc::new(Slot {
                callback: RefCell::new(Some(callback)),
            }),
        }
    }

    /// Create a subscription with no callback yet.
    ///
    /// Deliveries to an empty subscription are dropped until a callback is
    /// installed with [`set_callback`](Self::set_callback).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            slot: Rc::new(Slot {
                callback: RefCell::new(None),
            }),
        }
    }

    /// Replace the callback. Past values are not replayed.
    pub fn set_callback(&self, callback: impl Fn(&T) + 'static) {
        let callback: Callback<T> = Rc::new(callback);
        *self.slot.callback.borrow_mut() = Some(callback);
    }

    /// Remove the callback while keeping the subscription attached.
    pub fn clear_callback(&self) {
        self.slot.callback.borrow_mut().take();
    }

    /// Whether a callback is currently installed.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.slot.callback.borrow().is_some()
    }

    /// Invoke the callback with `value`, exactly as a box would.
    pub fn notify(&self, value: &T) {
        self.slot.deliver(value);
    }

    /// Create the non-owning handle a box stores in its subscriber list.
    #[must_use]
    pub fn downgrade(&self) -> WeakSubscriptionRef<T> {
        WeakSubscriptionRef {
            slot: Rc::downgrade(&self.slot),
        }
    }
}

impl<T: 'static> Default for Subscription<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("has_callback", &self.slot.callback.borrow().is_some())
            .finish()
    }
}

/// Non-owning handle to a [`Subscription`].
///
/// Boxes keep these in their subscriber lists. Once the subscription is
/// dropped the handle is dead and is skipped (and later pruned).
pub struct WeakSubscriptionRef<T> {
    slot: Weak<Slot<T>>,
}

impl<T> WeakSubscriptionRef<T> {
    /// Whether the referenced subscription still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.slot.strong_count() > 0
    }

    /// Deliver `value` if the subscription is alive. Returns `false` for a
    /// dead handle.
    pub(crate) fn notify(&self, value: &T) -> bool {
        match self.slot.upgrade() {
            Some(slot) => {
                slot.deliver(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for WeakSubscriptionRef<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Weak::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for WeakSubscriptionRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSubscriptionRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}
