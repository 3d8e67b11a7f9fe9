#![forbid(unsafe_code)]

//! Reactive value binding: observable boxes, weak subscriptions,
//! derivations and structural collection changes.
//!
//! - [`ValueBox`]: a shared value that notifies subscribers on every write.
//! - [`Subscription`]: a consumer-owned callback holder; boxes only keep a
//!   [`WeakSubscriptionRef`] to it.
//! - [`map`], [`reduce`], [`combine2`], [`combine3`]: boxes derived from
//!   other boxes, kept current eagerly.
//! - [`CollectionBox`]: an observable sequence emitting
//!   [`CollectionChange`] events, with [`CollectionBox::map`] updating only
//!   the touched elements of the derived sequence.
//! - [`bind`], [`bind_to`], [`Designated`]: wiring sources to consumers.
//!
//! # Architecture
//!
//! Every box is an `Rc<RefCell<..>>` handle, so the whole crate is
//! single-threaded and synchronous. A write delivers to every live
//! subscriber, in attach order, before it returns. Subscribers are stored
//! as `Weak` handles and pruned lazily during delivery.
//!
//! # Example
//!
//! ```
//! use tether_core::{Delivery, Subscription, ValueBox};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let source = ValueBox::new(3);
//! let squared = source.map(|x| x * x);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let sub = Subscription::new(move |v: &i32| sink.borrow_mut().push(*v));
//! squared.attach(&sub, Delivery::Lazy);
//!
//! source.write(4);
//! source.write(-2);
//! assert_eq!(*seen.borrow(), vec![16, 4]);
//! ```

pub mod binding;
pub mod collection;
pub mod derive;
pub mod error;
pub mod subscription;
pub mod value_box;

pub use binding::{Bindable, BindingScope, Designated, bind, bind_to};
pub use collection::{ChangeKind, CollectionBox, CollectionChange, CollectionSubscription};
pub use derive::{combine2, combine3, map, reduce};
pub use error::{BindError, Result};
pub use subscription::{Delivery, Subscription, WeakSubscriptionRef};
pub use value_box::ValueBox;
