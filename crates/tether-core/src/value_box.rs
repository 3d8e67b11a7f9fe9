#![forbid(unsafe_code)]

//! Observable single-value container.
//!
//! # Design
//!
//! [`ValueBox<T>`] is a cheap-clone handle to shared `Rc<RefCell<..>>`
//! state: the current value, a write counter, and an ordered list of
//! [`WeakSubscriptionRef`]s. Clones of a box read and write the same slot.
//!
//! # Invariants
//!
//! 1. The value is always defined; construction never notifies.
//! 2. Every write notifies, including writes of an equal value.
//! 3. Live subscribers are notified in attachment order.
//! 4. Dead subscribers are skipped and pruned after the traversal that
//!    found them.
//! 5. No borrow of the box is held while a subscriber runs, so callbacks may
//!    read the box or write it again (processed depth-first).
//!
//! # Failure Modes
//!
//! - **Callback panics**: the panic propagates out of `write`. Subscribers
//!   after the failing one in that cascade are not notified; the box keeps
//!   the written value and stays usable.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::subscription::{Delivery, Subscription, WeakSubscriptionRef};

struct BoxState<T> {
    value: T,
    /// Number of writes since construction.
    version: u64,
    subscribers: Vec<WeakSubscriptionRef<T>>,
    /// Internal subscriptions owned by a derived box.
    retained: Vec<Box<dyn Any>>,
}

/// An observable value container.
///
/// Cloning a `ValueBox` creates a new handle to the **same** state.
pub struct ValueBox<T> {
    state: Rc<RefCell<BoxState<T>>>,
}

impl<T> Clone for ValueBox<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ValueBox")
            .field("value", &state.value)
            .field("version", &state.version)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> ValueBox<T> {
    /// Create a box holding `initial`. Nothing is notified.
    pub fn new(initial: T) -> Self {
        Self {
            state: Rc::new(RefCell::new(BoxState {
                value: initial,
                version: 0,
                subscribers: Vec::new(),
                retained: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same box.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow().value)
    }

    /// Replace the value, then notify every live subscriber with it.
    pub fn write(&self, value: T) {
        self.modify(|slot| *slot = value);
    }

    /// Mutate the value in place, then notify exactly like [`write`](Self::write).
    ///
    /// # Panics
    ///
    /// Panics if `f` accesses this same box.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        let (value, subscribers) = {
            let mut state = self.state.borrow_mut();
            f(&mut state.value);
            state.version += 1;
            (state.value.clone(), state.subscribers.clone())
        };
        self.deliver(&value, &subscribers);
    }

    /// Register `subscription` for future writes.
    ///
    /// With [`Delivery::Immediate`] the current value is delivered once
    /// before returning. Attaching the same subscription twice delivers
    /// every write to it twice.
    pub fn attach(&self, subscription: &Subscription<T>, delivery: Delivery) {
        self.state
            .borrow_mut()
            .subscribers
            .push(subscription.downgrade());
        if delivery.is_immediate() {
            let value = self.get();
            subscription.notify(&value);
        }
    }

    /// Number of writes since construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    /// Number of attached subscribers that are still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.is_alive())
            .count()
    }

    /// Whether both handles point at the same box.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Derive a box that tracks `f` applied to this one.
    ///
    /// See [`map`](crate::map).
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> ValueBox<U> {
        crate::derive::map(self, f)
    }

    /// Keep `guard` alive for as long as this box lives.
    pub(crate) fn retain(&self, guard: Box<dyn Any>) {
        self.state.borrow_mut().retained.push(guard);
    }

    pub(crate) fn downgrade(&self) -> WeakValueBox<T> {
        WeakValueBox {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Notify `subscribers` in order and drop the dead ones from the list.
    fn deliver(&self, value: &T, subscribers: &[WeakSubscriptionRef<T>]) {
        #[cfg(feature = "tracing")]
        let version = self.version();

        let mut pruned = 0_usize;
        for subscriber in subscribers {
            if !subscriber.notify(value) {
                pruned += 1;
            }
        }
        if pruned > 0 {
            self.state
                .borrow_mut()
                .subscribers
                .retain(WeakSubscriptionRef::is_alive);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            message = "value_box.write",
            version,
            delivered = subscribers.len() - pruned,
            pruned
        );
    }
}

/// Back-reference from an internal derivation subscription to the box it
/// feeds.
pub(crate) struct WeakValueBox<T> {
    state: Weak<RefCell<BoxState<T>>>,
}

impl<T> WeakValueBox<T> {
    pub(crate) fn upgrade(&self) -> Option<ValueBox<T>> {
        self.state.upgrade().map(|state| ValueBox { state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder<T: Clone + 'static>() -> (Subscription<T>, Rc<RefCell<Vec<T>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = Subscription::new(move |v: &T| sink.borrow_mut().push(v.clone()));
        (sub, log)
    }

    #[test]
    fn construction_does_not_notify() {
        let b = ValueBox::new(1);
        let (sub, log) = recorder();
        b.attach(&sub, Delivery::Lazy);
        assert!(log.borrow().is_empty());
        assert_eq!(b.version(), 0);
    }

    #[test]
    fn writes_are_delivered_in_order() {
        let b = ValueBox::new(0);
        let (sub, log) = recorder();
        b.attach(&sub, Delivery::Lazy);
        for v in [3, 1, 4, 1, 5] {
            b.write(v);
        }
        assert_eq!(*log.borrow(), vec![3, 1, 4, 1, 5]);
        assert_eq!(b.version(), 5);
        assert_eq!(b.get(), 5);
    }

    #[test]
    fn equal_writes_still_notify() {
        let b = ValueBox::new(42);
        let (sub, log) = recorder();
        b.attach(&sub, Delivery::Lazy);
        b.write(42);
        b.write(42);
        assert_eq!(*log.borrow(), vec![42, 42]);
    }

    #[test]
    fn immediate_delivery_sends_current_value_first() {
        let b = ValueBox::new("start".to_string());
        let (sub, log) = recorder();
        b.attach(&sub, Delivery::Immediate);
        b.write("next".to_string());
        assert_eq!(*log.borrow(), vec!["start".to_string(), "next".to_string()]);
    }

    #[test]
    fn notification_follows_attach_order() {
        let b = ValueBox::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..4)
            .map(|i| {
                let o = Rc::clone(&order);
                Subscription::new(move |_: &i32| o.borrow_mut().push(i))
            })
            .collect();
        for sub in &subs {
            b.attach(sub, Delivery::Lazy);
        }
        b.write(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn double_attach_notifies_twice() {
        let b = ValueBox::new(0);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = Subscription::new(move |_: &i32| c.set(c.get() + 1));
        b.attach(&sub, Delivery::Lazy);
        b.attach(&sub, Delivery::Lazy);
        b.write(1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn dropped_subscription_is_skipped_and_pruned() {
        let b = ValueBox::new(0);
        let (keep, kept_log) = recorder();
        let (gone, gone_log) = recorder();
        b.attach(&gone, Delivery::Lazy);
        b.attach(&keep, Delivery::Lazy);
        assert_eq!(b.subscriber_count(), 2);

        drop(gone);
        assert_eq!(b.subscriber_count(), 1);
        b.write(7);

        assert!(gone_log.borrow().is_empty());
        assert_eq!(*kept_log.borrow(), vec![7]);
        assert_eq!(b.state.borrow().subscribers.len(), 1, "dead ref pruned");
    }

    #[test]
    fn one_subscription_on_many_boxes() {
        let a = ValueBox::new(0);
        let b = ValueBox::new(0);
        let (sub, log) = recorder();
        a.attach(&sub, Delivery::Lazy);
        b.attach(&sub, Delivery::Lazy);
        a.write(1);
        b.write(2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn modify_notifies_with_mutated_value() {
        let b = ValueBox::new(vec![1, 2]);
        let (sub, log) = recorder();
        b.attach(&sub, Delivery::Lazy);
        b.modify(|v| v.push(3));
        assert_eq!(*log.borrow(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn clones_share_state() {
        let a = ValueBox::new(1);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.write(9);
        assert_eq!(a.get(), 9);
        assert!(!a.ptr_eq(&ValueBox::new(9)));
    }

    #[test]
    fn reentrant_write_is_depth_first() {
        let b = ValueBox::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let handle = b.clone();
        let o = Rc::clone(&order);
        let first = Subscription::new(move |v: &i32| {
            o.borrow_mut().push(("first", *v));
            if *v == 1 {
                handle.write(2);
            }
        });
        let o = Rc::clone(&order);
        let second = Subscription::new(move |v: &i32| o.borrow_mut().push(("second", *v)));

        b.attach(&first, Delivery::Lazy);
        b.attach(&second, Delivery::Lazy);
        b.write(1);

        assert_eq!(
            *order.borrow(),
            vec![("first", 1), ("first", 2), ("second", 2), ("second", 1)]
        );
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn callback_panic_stops_cascade_but_box_survives() {
        let b = ValueBox::new(0);
        let bomb = Subscription::new(|v: &i32| {
            if *v == 1 {
                panic!("boom");
            }
        });
        let (after, log) = recorder();
        b.attach(&bomb, Delivery::Lazy);
        b.attach(&after, Delivery::Lazy);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| b.write(1)));
        assert!(result.is_err());
        assert!(log.borrow().is_empty(), "later subscriber not reached");
        assert_eq!(b.get(), 1);

        b.write(2);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn debug_format() {
        let b = ValueBox::new(42);
        let dbg = format!("{b:?}");
        assert!(dbg.contains("ValueBox"));
        assert!(dbg.contains("42"));
    }
}
