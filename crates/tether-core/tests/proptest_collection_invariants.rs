#![forbid(unsafe_code)]

//! Property-based invariant tests for collection boxes.
//!
//! For any sequence of edits:
//!
//! 1. The collection matches a plain `Vec` model.
//! 2. A mapped collection always equals the model mapped element-wise.
//! 3. Every event carries strictly ascending indices.
//! 4. The mapped collection emits exactly the same event shapes as its
//!    source.
//! 5. The transform runs only for inserted or updated elements.
//! 6. Out-of-range edits change nothing and emit nothing.
//! 7. An aggregate always equals the fold of the current sequence.

use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tether_core::{
    BindError, ChangeKind, CollectionBox, CollectionChange, CollectionSubscription, Delivery,
};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Insert { seed: usize, value: i32 },
    Remove { seed: usize },
    Update { seed: usize, value: i32 },
    Replace(Vec<i32>),
    /// Index past the end; always rejected.
    OutOfRange { over: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), -50i32..50).prop_map(|(seed, value)| Op::Insert { seed, value }),
        3 => any::<usize>().prop_map(|seed| Op::Remove { seed }),
        3 => (any::<usize>(), -50i32..50).prop_map(|(seed, value)| Op::Update { seed, value }),
        1 => proptest::collection::vec(-50i32..50, 0..8).prop_map(Op::Replace),
        1 => (0usize..4).prop_map(|over| Op::OutOfRange { over }),
    ]
}

fn ops() -> impl Strategy<Value = (Vec<i32>, Vec<Op>)> {
    (
        proptest::collection::vec(-50i32..50, 0..12),
        proptest::collection::vec(op(), 0..40),
    )
}

// ── Helpers ─────────────────────────────────────────────────────────────

type Shape = (ChangeKind, Vec<usize>);

fn shapes<T: Clone + 'static>(
    source: &CollectionBox<T>,
) -> (CollectionSubscription<T>, Rc<RefCell<Vec<Shape>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let push = move |change: &CollectionChange<T>, _: &[T]| {
        sink.borrow_mut()
            .push((change.kind(), change.indices().to_vec()));
    };
    let sub = CollectionSubscription::new()
        .on_insert(push.clone())
        .on_remove(push.clone())
        .on_update(push);
    source.attach(&sub, Delivery::Lazy);
    (sub, log)
}

/// Apply `op` to both the box and the model; returns how many elements the
/// transform should have been evaluated for.
fn apply(list: &CollectionBox<i32>, model: &mut Vec<i32>, op: &Op) -> usize {
    match op {
        Op::Insert { seed, value } => {
            let index = seed % (model.len() + 1);
            list.insert(*value, index);
            model.insert(index, *value);
            1
        }
        Op::Remove { seed } if !model.is_empty() => {
            let index = seed % model.len();
            let removed = list.remove_at(index);
            assert_eq!(removed, model.remove(index));
            0
        }
        Op::Update { seed, value } if !model.is_empty() => {
            let index = seed % model.len();
            let previous = list.update(index, *value);
            assert_eq!(previous, std::mem::replace(&mut model[index], *value));
            1
        }
        Op::Remove { .. } | Op::Update { .. } => 0,
        Op::Replace(items) => {
            list.replace_all(items.iter().copied());
            model.clone_from(items);
            items.len()
        }
        Op::OutOfRange { over } => {
            let len = model.len();
            assert_eq!(
                list.try_insert(0, len + 1 + over),
                Err(BindError::out_of_bounds("insert", len + 1 + over, len))
            );
            assert!(list.try_remove_at(len + over).is_err());
            assert!(list.try_update(len + over, 0).is_err());
            0
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1–5. Model agreement and mapping locality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn collection_and_map_follow_model((initial, ops) in ops()) {
        let list = CollectionBox::new(initial.clone());
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);
        let mapped = list.map(move |v| {
            counter.set(counter.get() + 1);
            i64::from(*v) * 10
        });
        let (_src_sub, source_events) = shapes(&list);
        let (_map_sub, mapped_events) = shapes(&mapped);

        let mut model = initial.clone();
        let mut expected_calls = initial.len();
        prop_assert_eq!(calls.get(), expected_calls);

        for op in &ops {
            expected_calls += apply(&list, &mut model, op);
            prop_assert_eq!(list.to_vec(), model.clone());
            let model_mapped: Vec<i64> = model.iter().map(|v| i64::from(*v) * 10).collect();
            prop_assert_eq!(mapped.to_vec(), model_mapped);
            prop_assert_eq!(calls.get(), expected_calls);
        }

        for (_, indices) in source_events.borrow().iter() {
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]), "indices not ascending: {:?}", indices);
        }
        prop_assert_eq!(&*source_events.borrow(), &*mapped_events.borrow());
        prop_assert_eq!(list.version(), source_events.borrow().len() as u64);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Rejected edits
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn out_of_range_edits_are_inert(initial in proptest::collection::vec(any::<i32>(), 0..10), over in 0usize..5) {
        let list = CollectionBox::new(initial.clone());
        let (_sub, events) = shapes(&list);
        let len = initial.len();

        prop_assert!(list.try_insert(1, len + 1 + over).is_err());
        prop_assert!(list.try_remove_at(len + over).is_err());
        prop_assert!(list.try_update(len + over, 1).is_err());

        prop_assert_eq!(list.to_vec(), initial);
        prop_assert!(events.borrow().is_empty());
        prop_assert_eq!(list.version(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Aggregate
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregate_equals_fold((initial, ops) in ops()) {
        let list = CollectionBox::new(initial.clone());
        let total = list.aggregate(|items| items.iter().map(|v| i64::from(*v)).sum::<i64>());
        let mut model = initial;
        for op in &ops {
            apply(&list, &mut model, op);
            prop_assert_eq!(total.get(), model.iter().map(|v| i64::from(*v)).sum::<i64>());
        }
    }
}
