#![forbid(unsafe_code)]

//! Wiring sources to consumers.
//!
//! [`bind`] attaches an explicit subscription to a source. [`bind_to`]
//! resolves the subscription from the consumer itself through the
//! [`Designated`] capability, so a widget can be bound without the caller
//! knowing which of its fields receives the value.
//!
//! Source and subscription types are checked statically: binding a
//! `ValueBox<u32>` to an entity whose designated subscription is a
//! `Subscription<String>` does not compile.
//!
//! [`BindingScope`] collects subscriptions and derived boxes for one
//! consumer so they can be released together.

use std::any::Any;
use std::fmt;

use crate::collection::{CollectionBox, CollectionChange, CollectionSubscription};
use crate::subscription::{Delivery, Subscription};
use crate::value_box::ValueBox;

/// A source that accepts one kind of subscription.
pub trait Bindable {
    /// The subscription type this source notifies.
    type Subscription;

    /// Register `subscription` with the given attach-time delivery.
    fn attach(&self, subscription: &Self::Subscription, delivery: Delivery);
}

impl<T: Clone + 'static> Bindable for ValueBox<T> {
    type Subscription = Subscription<T>;

    fn attach(&self, subscription: &Subscription<T>, delivery: Delivery) {
        ValueBox::attach(self, subscription, delivery);
    }
}

impl<T: Clone + 'static> Bindable for CollectionBox<T> {
    type Subscription = CollectionSubscription<T>;

    fn attach(&self, subscription: &CollectionSubscription<T>, delivery: Delivery) {
        CollectionBox::attach(self, subscription, delivery);
    }
}

/// An entity that declares exactly one subscription through which it
/// accepts bound values.
///
/// ```
/// use tether_core::{bind_to, Delivery, Designated, Subscription, ValueBox};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// struct Caption {
///     text: Rc<RefCell<String>>,
///     input: Subscription<String>,
/// }
///
/// impl Caption {
///     fn new() -> Self {
///         let text = Rc::new(RefCell::new(String::new()));
///         let sink = Rc::clone(&text);
///         let input = Subscription::new(move |v: &String| *sink.borrow_mut() = v.clone());
///         Self { text, input }
///     }
/// }
///
/// impl Designated for Caption {
///     type Subscription = Subscription<String>;
///     fn designated_subscription(&self) -> &Subscription<String> {
///         &self.input
///     }
/// }
///
/// let title = ValueBox::new("draft".to_string());
/// let caption = Caption::new();
/// bind_to(&title, &caption, Delivery::Immediate);
/// assert_eq!(*caption.text.borrow(), "draft");
/// title.write("final".to_string());
/// assert_eq!(*caption.text.borrow(), "final");
/// ```
pub trait Designated {
    /// The single subscription type this entity accepts.
    type Subscription;

    /// The subscription that [`bind_to`] attaches.
    fn designated_subscription(&self) -> &Self::Subscription;
}

/// Attach `target` to `source`.
pub fn bind<S: Bindable>(source: &S, target: &S::Subscription, delivery: Delivery) {
    source.attach(target, delivery);
}

/// Attach `entity`'s designated subscription to `source`.
pub fn bind_to<S, E>(source: &S, entity: &E, delivery: Delivery)
where
    S: Bindable,
    E: Designated<Subscription = S::Subscription> + ?Sized,
{
    source.attach(entity.designated_subscription(), delivery);
}

/// Collects subscriptions and derived boxes for a logical consumer.
///
/// Dropping the scope (or calling [`clear`](Self::clear)) releases
/// everything it holds, which detaches every subscription it created.
///
/// # Invariants
///
/// 1. Held values are released in reverse registration order.
/// 2. After release, no callback created through this scope fires.
/// 3. `binding_count` equals the number of values currently held.
#[derive(Default)]
pub struct BindingScope {
    held: Vec<Box<dyn Any>>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self { held: Vec::new() }
    }

    /// Keep `value` alive until the scope is released.
    pub fn hold<H: Any>(&mut self, value: H) -> &mut Self {
        self.held.push(Box::new(value));
        self
    }

    /// Subscribe `callback` to `source` for the lifetime of the scope.
    pub fn subscribe<T: Clone + 'static>(
        &mut self,
        source: &ValueBox<T>,
        delivery: Delivery,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let subscription = Subscription::new(callback);
        source.attach(&subscription, delivery);
        self.hold(subscription)
    }

    /// Subscribe `on_change` to every structural event of `source` for the
    /// lifetime of the scope.
    ///
    /// Only the kind slots are filled, so [`Delivery::Immediate`] delivers
    /// nothing on attach.
    pub fn subscribe_collection<T: Clone + 'static>(
        &mut self,
        source: &CollectionBox<T>,
        delivery: Delivery,
        on_change: impl Fn(&CollectionChange<T>, &[T]) + Clone + 'static,
    ) -> &mut Self {
        let subscription = CollectionSubscription::new()
            .on_insert(on_change.clone())
            .on_remove(on_change.clone())
            .on_update(on_change);
        source.attach(&subscription, delivery);
        self.hold(subscription)
    }

    /// Keep a derived box alive and hand back a handle to it.
    pub fn retain<V: Clone + Any>(&mut self, derived: V) -> V {
        self.held.push(Box::new(derived.clone()));
        derived
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.held.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Release everything now; the scope stays usable.
    pub fn clear(&mut self) {
        while let Some(value) = self.held.pop() {
            drop(value);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.held.len())
            .finish()
    }
}
