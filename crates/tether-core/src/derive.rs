#![forbid(unsafe_code)]

//! Derivation combinators: boxes computed from other boxes.
//!
//! Every derived box strongly owns the internal [`Subscription`]s attached
//! to its sources, plus a handle to each source. The internal callbacks only
//! hold a weak reference back to the derived box, so a derivation lives
//! exactly as long as someone holds the derived box (or something
//! downstream of it), and dropping it silently detaches it from its sources.
//! Intermediate steps of a chain such as `a.map(f).map(g)` need no separate
//! holder.
//!
//! Derivations are eager: a source write recomputes and writes the derived
//! box before the source's `write` returns.
//!
//! # Glitches
//!
//! Multi-source derivations recompute once per source write using the
//! most recently observed value of every other source. Writing two sources
//! back to back therefore produces two recomputations and two downstream
//! notifications, the first of which mixes one new and one stale input.

use std::cell::RefCell;
use std::rc::Rc;

use crate::subscription::{Delivery, Subscription};
use crate::value_box::ValueBox;

/// Derive a box holding `f(source)`.
///
/// The result starts at `f` of the source's current value and is rewritten
/// with `f(new)` exactly once per source write.
pub fn map<T, U>(source: &ValueBox<T>, f: impl Fn(&T) -> U + 'static) -> ValueBox<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let derived = ValueBox::new(source.with(&f));
    let target = derived.downgrade();
    let link = Subscription::new(move |value: &T| {
        if let Some(target) = target.upgrade() {
            target.write(f(value));
        }
    });
    source.attach(&link, Delivery::Lazy);
    derived.retain(Box::new(link));
    derived.retain(Box::new(source.clone()));

    #[cfg(feature = "tracing")]
    tracing::debug!(message = "derive.map", sources = 1_usize);

    derived
}

/// Derive a box from any number of same-typed sources.
///
/// `f` receives the latest observed value of every source, in slice order.
/// Internal subscriptions are attached in slice order, so when one write
/// reaches several sources (through a shared upstream), recomputations run
/// in that order.
pub fn reduce<T, R>(sources: &[ValueBox<T>], f: impl Fn(&[T]) -> R + 'static) -> ValueBox<R>
where
    T: Clone + 'static,
    R: Clone + 'static,
{
    let observed = Rc::new(RefCell::new(
        sources.iter().map(ValueBox::get).collect::<Vec<T>>(),
    ));
    let compute: Rc<dyn Fn(&Vec<T>) -> R> =
        Rc::new(move |values: &Vec<T>| f(values.as_slice()));
    let derived = ValueBox::new(compute(&*observed.borrow()));

    for (index, source) in sources.iter().enumerate() {
        link_source(source, &derived, &observed, &compute, move |values, value| {
            values[index] = value.clone();
        });
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(message = "derive.reduce", sources = sources.len());

    derived
}

/// Derive a box from two sources of different types.
///
/// Same per-source recomputation rules as [`reduce`].
pub fn combine2<A, B, R>(
    a: &ValueBox<A>,
    b: &ValueBox<B>,
    f: impl Fn(&A, &B) -> R + 'static,
) -> ValueBox<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + 'static,
{
    let observed = Rc::new(RefCell::new((a.get(), b.get())));
    let compute: Rc<dyn Fn(&(A, B)) -> R> = Rc::new(move |(va, vb): &(A, B)| f(va, vb));
    let derived = ValueBox::new(compute(&*observed.borrow()));

    link_source(a, &derived, &observed, &compute, |values, value| {
        values.0 = value.clone();
    });
    link_source(b, &derived, &observed, &compute, |values, value| {
        values.1 = value.clone();
    });

    #[cfg(feature = "tracing")]
    tracing::debug!(message = "derive.reduce", sources = 2_usize);

    derived
}

/// Derive a box from three sources of different types.
///
/// Same per-source recomputation rules as [`reduce`].
pub fn combine3<A, B, C, R>(
    a: &ValueBox<A>,
    b: &ValueBox<B>,
    c: &ValueBox<C>,
    f: impl Fn(&A, &B, &C) -> R + 'static,
) -> ValueBox<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    R: Clone + 'static,
{
    let observed = Rc::new(RefCell::new((a.get(), b.get(), c.get())));
    let compute: Rc<dyn Fn(&(A, B, C)) -> R> =
        Rc::new(move |(va, vb, vc): &(A, B, C)| f(va, vb, vc));
    let derived = ValueBox::new(compute(&*observed.borrow()));

    link_source(a, &derived, &observed, &compute, |values, value| {
        values.0 = value.clone();
    });
    link_source(b, &derived, &observed, &compute, |values, value| {
        values.1 = value.clone();
    });
    link_source(c, &derived, &observed, &compute, |values, value| {
        values.2 = value.clone();
    });

    #[cfg(feature = "tracing")]
    tracing::debug!(message = "derive.reduce", sources = 3_usize);

    derived
}

/// Attach one internal subscription to `source` that records the new value
/// into `observed` and rewrites `derived` from the full observation.
fn link_source<S, O, R>(
    source: &ValueBox<S>,
    derived: &ValueBox<R>,
    observed: &Rc<RefCell<O>>,
    compute: &Rc<dyn Fn(&O) -> R>,
    store: impl Fn(&mut O, &S) + 'static,
) where
    S: Clone + 'static,
    O: 'static,
    R: Clone + 'static,
{
    let target = derived.downgrade();
    let observed = Rc::clone(observed);
    let compute = Rc::clone(compute);
    let link = Subscription::new(move |value: &S| {
        let Some(target) = target.upgrade() else {
            return;
        };
        {
            let mut values = observed.borrow_mut();
            store(&mut *values, value);
        }
        let result = compute(&*observed.borrow());
        target.write(result);
    });
    source.attach(&link, Delivery::Lazy);
    derived.retain(Box::new(link));
    derived.retain(Box::new(source.clone()));
}
