#![forbid(unsafe_code)]

//! Observable ordered sequences with structural change events.
//!
//! # Design
//!
//! [`CollectionBox<T>`] has the same shape as [`ValueBox`]: shared state
//! behind a cheap-clone handle and an ordered list of weak subscriber
//! handles. Instead of a bare value, every mutator emits a
//! [`CollectionChange`] describing what moved.
//!
//! | Mutator | Precondition | Event |
//! |---------|--------------|-------|
//! | `insert(e, i)` | `i <= len` | `Insert {i}` |
//! | `remove_at(i)` | `i < len` | `Remove {i}` + removed element |
//! | `update(i, e)` | `i < len` | `Update {i}` |
//! | `replace_all(seq)` | none | `Remove {0..old}` then `Insert {0..new}` |
//!
//! `replace_all` never computes a minimal diff; callers that want finer
//! events issue discrete mutations themselves.
//!
//! # Invariants
//!
//! 1. Event indices are strictly ascending.
//! 2. `Insert` indices are positions in the sequence after the insertion;
//!    `Remove` indices are positions before the removal.
//! 3. A failed precondition mutates nothing and emits nothing.
//! 4. [`CollectionBox::map`] mirrors each event 1:1 and only evaluates the
//!    transform for inserted or updated elements.
//! 5. Callbacks receive the sequence as it stood right after their event;
//!    no borrow of the box is held while they run.
//! 6. Every subscriber sees a collection's events in mutation order.
//!
//! # Reentrancy
//!
//! A callback may read, edit, attach to or derive from any collection,
//! including the one notifying it. An edit to another collection runs its
//! whole cascade before returning (depth-first). An edit to the collection
//! that is currently notifying takes effect immediately, but its event is
//! queued and delivered once the current event has reached every
//! subscriber, so structural mirrors never see an event out of order.
//!
//! # Failure Modes
//!
//! - **Index out of range**: the panicking mutators panic with the
//!   [`BindError`] message; the `try_*` forms return it.
//! - **Callback panic**: not caught. Queued events of that collection are
//!   discarded and the collection stays usable.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{BindError, Result};
use crate::subscription::Delivery;
use crate::value_box::ValueBox;

/// Kind of structural edit carried by a [`CollectionChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Remove,
    Update,
}

/// A structural edit emitted by a [`CollectionBox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange<T> {
    kind: ChangeKind,
    indices: Vec<usize>,
    /// Removed elements in index order; empty unless `kind` is `Remove`.
    removed: Vec<T>,
}

impl<T> CollectionChange<T> {
    /// Elements were inserted at `indices` (positions after insertion).
    #[must_use]
    pub fn insert(indices: Vec<usize>) -> Self {
        Self {
            kind: ChangeKind::Insert,
            indices,
            removed: Vec::new(),
        }
    }

    /// `removed` elements were taken from `indices` (positions before removal).
    #[must_use]
    pub fn remove(indices: Vec<usize>, removed: Vec<T>) -> Self {
        debug_assert_eq!(indices.len(), removed.len());
        Self {
            kind: ChangeKind::Remove,
            indices,
            removed,
        }
    }

    /// Elements at `indices` were replaced in place.
    #[must_use]
    pub fn update(indices: Vec<usize>) -> Self {
        Self {
            kind: ChangeKind::Update,
            indices,
            removed: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn removed(&self) -> &[T] {
        &self.removed
    }
}

type ChangeCallback<T> = Rc<dyn Fn(&CollectionChange<T>, &[T])>;
type ValueCallback<T> = Rc<dyn Fn(&[T])>;

struct Slots<T> {
    insert: Option<ChangeCallback<T>>,
    remove: Option<ChangeCallback<T>>,
    update: Option<ChangeCallback<T>>,
    value: Option<ValueCallback<T>>,
}

impl<T> Slots<T> {
    fn for_kind(&self, kind: ChangeKind) -> Option<ChangeCallback<T>> {
        match kind {
            ChangeKind::Insert => self.insert.clone(),
            ChangeKind::Remove => self.remove.clone(),
            ChangeKind::Update => self.update.clone(),
        }
    }
}

/// A subscription with one callback slot per change kind plus a
/// whole-value slot.
///
/// For every event the matching kind slot runs first, then the value slot.
/// Every callback receives the sequence as it is after the edit.
///
/// ```
/// use tether_core::{CollectionBox, CollectionSubscription, Delivery};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let inserted = Rc::new(Cell::new(0));
/// let seen = Rc::clone(&inserted);
/// let sub = CollectionSubscription::<&str>::new()
///     .on_insert(move |change, _items| seen.set(seen.get() + change.indices().len()));
///
/// let list = CollectionBox::new(["a", "b"]);
/// list.attach(&sub, Delivery::Lazy);
/// list.push("c");
/// assert_eq!(inserted.get(), 1);
/// ```
pub struct CollectionSubscription<T> {
    slots: Rc<RefCell<Slots<T>>>,
}

impl<T: 'static> CollectionSubscription<T> {
    /// Create a subscription with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                insert: None,
                remove: None,
                update: None,
                value: None,
            })),
        }
    }

    /// Set the callback for `Insert` events.
    #[must_use]
    pub fn on_insert(self, f: impl Fn(&CollectionChange<T>, &[T]) + 'static) -> Self {
        let f: ChangeCallback<T> = Rc::new(f);
        self.slots.borrow_mut().insert = Some(f);
        self
    }

    /// Set the callback for `Remove` events.
    #[must_use]
    pub fn on_remove(self, f: impl Fn(&CollectionChange<T>, &[T]) + 'static) -> Self {
        let f: ChangeCallback<T> = Rc::new(f);
        self.slots.borrow_mut().remove = Some(f);
        self
    }

    /// Set the callback for `Update` events.
    #[must_use]
    pub fn on_update(self, f: impl Fn(&CollectionChange<T>, &[T]) + 'static) -> Self {
        let f: ChangeCallback<T> = Rc::new(f);
        self.slots.borrow_mut().update = Some(f);
        self
    }

    /// Set the whole-value callback, run after every event and on
    /// immediate attach.
    #[must_use]
    pub fn on_value(self, f: impl Fn(&[T]) + 'static) -> Self {
        let f: ValueCallback<T> = Rc::new(f);
        self.slots.borrow_mut().value = Some(f);
        self
    }

    /// Empty every slot; the subscription stays attached.
    pub fn clear_callbacks(&self) {
        let mut slots = self.slots.borrow_mut();
        slots.insert = None;
        slots.remove = None;
        slots.update = None;
        slots.value = None;
    }

    /// Dispatch `change` exactly as a collection would.
    pub fn notify_change(&self, change: &CollectionChange<T>, items: &[T]) {
        let (kind_slot, value_slot) = {
            let slots = self.slots.borrow();
            (slots.for_kind(change.kind()), slots.value.clone())
        };
        if let Some(callback) = kind_slot {
            callback(change, items);
        }
        if let Some(callback) = value_slot {
            callback(items);
        }
    }

    /// Run only the whole-value slot.
    pub fn notify_value(&self, items: &[T]) {
        let value_slot = self.slots.borrow().value.clone();
        if let Some(callback) = value_slot {
            callback(items);
        }
    }

    pub(crate) fn downgrade(&self) -> WeakCollectionRef<T> {
        WeakCollectionRef {
            slots: Rc::downgrade(&self.slots),
        }
    }
}

impl<T: 'static> Default for CollectionSubscription<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CollectionSubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        f.debug_struct("CollectionSubscription")
            .field("insert", &slots.insert.is_some())
            .field("remove", &slots.remove.is_some())
            .field("update", &slots.update.is_some())
            .field("value", &slots.value.is_some())
            .finish()
    }
}

pub(crate) struct WeakCollectionRef<T> {
    slots: Weak<RefCell<Slots<T>>>,
}

impl<T: 'static> WeakCollectionRef<T> {
    fn is_alive(&self) -> bool {
        self.slots.strong_count() > 0
    }

    fn notify(&self, change: &CollectionChange<T>, items: &[T]) -> bool {
        match self.slots.upgrade() {
            Some(slots) => {
                CollectionSubscription { slots }.notify_change(change, items);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for WeakCollectionRef<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Weak::clone(&self.slots),
        }
    }
}

struct CollectionState<T> {
    /// Shared with in-flight events; edited copy-on-write.
    items: Rc<Vec<T>>,
    /// Number of events emitted since construction.
    version: u64,
    subscribers: Vec<WeakCollectionRef<T>>,
    retained: Vec<Box<dyn Any>>,
    /// Events waiting for the running delivery loop.
    pending: VecDeque<(CollectionChange<T>, Rc<Vec<T>>)>,
    publishing: bool,
}

/// Ends a delivery loop, also when a callback unwinds.
struct PublishGuard<'a, T> {
    state: &'a RefCell<CollectionState<T>>,
}

impl<T> Drop for PublishGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.publishing = false;
            state.pending.clear();
        }
    }
}

/// An observable ordered sequence.
///
/// Cloning a `CollectionBox` creates a new handle to the **same** sequence.
pub struct CollectionBox<T> {
    state: Rc<RefCell<CollectionState<T>>>,
}

impl<T> Clone for CollectionBox<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CollectionBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CollectionBox")
            .field("items", &*state.items)
            .field("version", &state.version)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> CollectionBox<T> {
    /// Create a collection holding `initial`. Nothing is notified.
    pub fn new(initial: impl IntoIterator<Item = T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(CollectionState {
                items: Rc::new(initial.into_iter().collect()),
                version: 0,
                subscribers: Vec::new(),
                retained: Vec::new(),
                pending: VecDeque::new(),
                publishing: false,
            })),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    /// Clone of the element at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.borrow().items.get(index).cloned()
    }

    /// Clone of the whole sequence.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.state.borrow().items.to_vec()
    }

    /// Run `f` over the current sequence without cloning it.
    ///
    /// `f` sees a snapshot, so it may edit the collection; the edit does
    /// not show in the slice it was given.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let items = self.snapshot();
        f(items.as_slice())
    }

    /// Number of change events emitted since construction.
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

    /// Whether both handles point at the same collection.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Register `subscription` for future events.
    ///
    /// With [`Delivery::Immediate`] the value slot receives the current
    /// sequence once before returning; no structural event is synthesized.
    pub fn attach(&self, subscription: &CollectionSubscription<T>, delivery: Delivery) {
        self.state
            .borrow_mut()
            .subscribers
            .push(subscription.downgrade());
        if delivery.is_immediate() {
            let items = self.snapshot();
            subscription.notify_value(items.as_slice());
        }
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// # Errors
    ///
    /// [`BindError::IndexOutOfBounds`] when `index > len`.
    pub fn try_insert(&self, value: T, index: usize) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(BindError::out_of_bounds("insert", index, len));
        }
        self.apply_insert(vec![index], vec![value]);
        Ok(())
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// # Panics
    ///
    /// Panics when `index > len`.
    #[track_caller]
    pub fn insert(&self, value: T, index: usize) {
        if let Err(err) = self.try_insert(value, index) {
            panic!("{err}");
        }
    }

    /// Append `value`; emits `Insert {len}`.
    pub fn push(&self, value: T) {
        let index = self.len();
        self.apply_insert(vec![index], vec![value]);
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// [`BindError::IndexOutOfBounds`] when `index >= len`.
    pub fn try_remove_at(&self, index: usize) -> Result<T> {
        let removed = self
            .get(index)
            .ok_or_else(|| BindError::out_of_bounds("remove_at", index, self.len()))?;
        self.apply_remove(vec![index]);
        Ok(removed)
    }

    /// Remove and return the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len`.
    #[track_caller]
    pub fn remove_at(&self, index: usize) -> T {
        match self.try_remove_at(index) {
            Ok(removed) => removed,
            Err(err) => panic!("{err}"),
        }
    }

    /// Replace the element at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// [`BindError::IndexOutOfBounds`] when `index >= len`.
    pub fn try_update(&self, index: usize, value: T) -> Result<T> {
        let previous = self
            .get(index)
            .ok_or_else(|| BindError::out_of_bounds("update", index, self.len()))?;
        self.apply_update(vec![index], vec![value]);
        Ok(previous)
    }

    /// Replace the element at `index`, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len`.
    #[track_caller]
    pub fn update(&self, index: usize, value: T) -> T {
        match self.try_update(index, value) {
            Ok(previous) => previous,
            Err(err) => panic!("{err}"),
        }
    }

    /// Replace the whole sequence.
    ///
    /// Always emits `Remove` of every old index followed by `Insert` of
    /// every new index, even when either side is empty.
    pub fn replace_all(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        let old_len = self.len();
        self.apply_remove((0..old_len).collect());
        let new_len = items.len();
        self.apply_insert((0..new_len).collect(), items);
    }

    /// Derive a collection holding `f` of every element.
    ///
    /// Each source event produces exactly one event of the same kind and
    /// indices on the derived collection. `f` runs only for inserted and
    /// updated elements.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> CollectionBox<U> {
        let derived = CollectionBox::new(self.with(|items| items.iter().map(&f).collect::<Vec<U>>()));
        let f = Rc::new(f);
        let target = derived.downgrade();

        let subscription = CollectionSubscription::new()
            .on_insert({
                let target = target.clone();
                let f = Rc::clone(&f);
                move |change: &CollectionChange<T>, items: &[T]| {
                    if let Some(target) = target.upgrade() {
                        let values = change.indices().iter().map(|&i| f(&items[i])).collect();
                        target.apply_insert(change.indices().to_vec(), values);
                    }
                }
            })
            .on_remove({
                let target = target.clone();
                move |change: &CollectionChange<T>, _items: &[T]| {
                    if let Some(target) = target.upgrade() {
                        target.apply_remove(change.indices().to_vec());
                    }
                }
            })
            .on_update(move |change: &CollectionChange<T>, items: &[T]| {
                if let Some(target) = target.upgrade() {
                    let values = change.indices().iter().map(|&i| f(&items[i])).collect();
                    target.apply_update(change.indices().to_vec(), values);
                }
            });

        self.attach(&subscription, Delivery::Lazy);
        derived.retain(Box::new(subscription));
        derived.retain(Box::new(self.clone()));

        #[cfg(feature = "tracing")]
        tracing::debug!(message = "collection.map", sources = 1_usize);

        derived
    }

    /// Derive a [`ValueBox`] holding `f` of the whole sequence, recomputed
    /// after every event.
    ///
    /// `replace_all` emits two events and therefore recomputes twice, the
    /// first time over an empty sequence.
    pub fn aggregate<R: Clone + 'static>(&self, f: impl Fn(&[T]) -> R + 'static) -> ValueBox<R> {
        let derived = ValueBox::new(self.with(&f));
        let target = derived.downgrade();
        let subscription = CollectionSubscription::new().on_value(move |items: &[T]| {
            if let Some(target) = target.upgrade() {
                target.write(f(items));
            }
        });

        self.attach(&subscription, Delivery::Lazy);
        derived.retain(Box::new(subscription));
        derived.retain(Box::new(self.clone()));

        #[cfg(feature = "tracing")]
        tracing::debug!(message = "collection.aggregate", sources = 1_usize);

        derived
    }

    pub(crate) fn retain(&self, guard: Box<dyn Any>) {
        self.state.borrow_mut().retained.push(guard);
    }

    fn downgrade(&self) -> WeakCollectionBox<T> {
        WeakCollectionBox {
            state: Rc::downgrade(&self.state),
        }
    }

    fn snapshot(&self) -> Rc<Vec<T>> {
        Rc::clone(&self.state.borrow().items)
    }

    /// `indices` ascending, each a position after insertion.
    fn apply_insert(&self, indices: Vec<usize>, values: Vec<T>) {
        {
            let mut state = self.state.borrow_mut();
            let items = Rc::make_mut(&mut state.items);
            for (&index, value) in indices.iter().zip(values) {
                items.insert(index, value);
            }
            state.version += 1;
        }
        self.publish(CollectionChange::insert(indices));
    }

    /// `indices` ascending, each a position before removal.
    fn apply_remove(&self, indices: Vec<usize>) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let items = Rc::make_mut(&mut state.items);
            let mut removed: Vec<T> = indices
                .iter()
                .rev()
                .map(|&index| items.remove(index))
                .collect();
            removed.reverse();
            state.version += 1;
            removed
        };
        self.publish(CollectionChange::remove(indices, removed));
    }

    fn apply_update(&self, indices: Vec<usize>, values: Vec<T>) {
        {
            let mut state = self.state.borrow_mut();
            let items = Rc::make_mut(&mut state.items);
            for (&index, value) in indices.iter().zip(values) {
                items[index] = value;
            }
            state.version += 1;
        }
        self.publish(CollectionChange::update(indices));
    }

    /// Queue `change` with the sequence it produced, then deliver the queue
    /// unless a delivery loop for this collection is already running.
    fn publish(&self, change: CollectionChange<T>) {
        {
            let mut state = self.state.borrow_mut();
            let items = Rc::clone(&state.items);
            state.pending.push_back((change, items));
            if state.publishing {
                return;
            }
            state.publishing = true;
        }

        let _guard = PublishGuard { state: &self.state };
        loop {
            let next = self.state.borrow_mut().pending.pop_front();
            let Some((change, items)) = next else {
                break;
            };
            self.dispatch(&change, items.as_slice());
        }
    }

    fn dispatch(&self, change: &CollectionChange<T>, items: &[T]) {
        let subscribers = self.state.borrow().subscribers.clone();
        let mut pruned = 0_usize;
        for subscriber in &subscribers {
            if !subscriber.notify(change, items) {
                pruned += 1;
            }
        }
        if pruned > 0 {
            self.state
                .borrow_mut()
                .subscribers
                .retain(WeakCollectionRef::is_alive);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            message = "collection.change",
            kind = ?change.kind(),
            indices = change.indices().len(),
            delivered = subscribers.len() - pruned,
            pruned
        );
    }
}

struct WeakCollectionBox<T> {
    state: Weak<RefCell<CollectionState<T>>>,
}

impl<T> WeakCollectionBox<T> {
    fn upgrade(&self) -> Option<CollectionBox<T>> {
        self.state.upgrade().map(|state| CollectionBox { state })
    }
}

impl<T> Clone for WeakCollectionBox<T> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}
