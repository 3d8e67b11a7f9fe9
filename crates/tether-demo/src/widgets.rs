#![forbid(unsafe_code)]

//! Toy console widgets that accept bound values through a designated
//! subscription.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::Rc;

use tether_core::{CollectionChange, CollectionSubscription, Designated, Subscription};

/// A single line of text.
pub struct Label {
    caption: String,
    text: Rc<RefCell<Option<String>>>,
    updates: Rc<Cell<usize>>,
    input: Subscription<String>,
}

impl Label {
    #[must_use]
    pub fn new(caption: impl Into<String>) -> Self {
        let text = Rc::new(RefCell::new(None));
        let updates = Rc::new(Cell::new(0));
        let (sink, counter) = (Rc::clone(&text), Rc::clone(&updates));
        let input = Subscription::new(move |value: &String| {
            *sink.borrow_mut() = Some(value.clone());
            counter.set(counter.get() + 1);
        });
        Self {
            caption: caption.into(),
            text,
            updates,
            input,
        }
    }

    /// Last received text, if any value arrived yet.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }

    /// Number of values received.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.get()
    }

    #[must_use]
    pub fn render(&self) -> String {
        match &*self.text.borrow() {
            Some(text) => format!("{}: {text}", self.caption),
            None => format!("{}: -", self.caption),
        }
    }
}

impl Designated for Label {
    type Subscription = Subscription<String>;

    fn designated_subscription(&self) -> &Subscription<String> {
        &self.input
    }
}

/// A list of rows kept in step with a bound collection by applying each
/// structural edit.
///
/// The view copies the whole sequence once, from the first value
/// delivery it sees; structural events that arrive before that copy are
/// skipped.
pub struct ListView {
    title: String,
    rows: Rc<RefCell<Vec<String>>>,
    edits: Rc<Cell<usize>>,
    synced: Rc<Cell<bool>>,
    input: CollectionSubscription<String>,
}

impl ListView {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let rows = Rc::new(RefCell::new(Vec::new()));
        let edits = Rc::new(Cell::new(0));
        let synced = Rc::new(Cell::new(false));

        let input = CollectionSubscription::new()
            .on_insert({
                let (rows, edits, synced) = (Rc::clone(&rows), Rc::clone(&edits), Rc::clone(&synced));
                move |change: &CollectionChange<String>, items: &[String]| {
                    if !synced.get() {
                        return;
                    }
                    let mut rows = rows.borrow_mut();
                    for &index in change.indices() {
                        rows.insert(index, items[index].clone());
                    }
                    edits.set(edits.get() + 1);
                }
            })
            .on_remove({
                let (rows, edits, synced) = (Rc::clone(&rows), Rc::clone(&edits), Rc::clone(&synced));
                move |change: &CollectionChange<String>, _: &[String]| {
                    if !synced.get() {
                        return;
                    }
                    let mut rows = rows.borrow_mut();
                    for &index in change.indices().iter().rev() {
                        rows.remove(index);
                    }
                    edits.set(edits.get() + 1);
                }
            })
            .on_update({
                let (rows, edits, synced) = (Rc::clone(&rows), Rc::clone(&edits), Rc::clone(&synced));
                move |change: &CollectionChange<String>, items: &[String]| {
                    if !synced.get() {
                        return;
                    }
                    let mut rows = rows.borrow_mut();
                    for &index in change.indices() {
                        rows[index].clone_from(&items[index]);
                    }
                    edits.set(edits.get() + 1);
                }
            })
            .on_value({
                let (rows, synced) = (Rc::clone(&rows), Rc::clone(&synced));
                move |items: &[String]| {
                    if !synced.replace(true) {
                        *rows.borrow_mut() = items.to_vec();
                    }
                }
            });

        Self {
            title: title.into(),
            rows,
            edits,
            synced,
            input,
        }
    }

    /// Whether the view has copied the bound sequence yet.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.get()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.rows.borrow().clone()
    }

    /// Number of structural edits applied.
    #[must_use]
    pub fn edits(&self) -> usize {
        self.edits.get()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let rows = self.rows.borrow();
        let mut out = format!("{} ({})", self.title, rows.len());
        for (index, row) in rows.iter().enumerate() {
            let _ = write!(out, "\n  {index}: {row}");
        }
        out
    }
}

impl Designated for ListView {
    type Subscription = CollectionSubscription<String>;

    fn designated_subscription(&self) -> &CollectionSubscription<String> {
        &self.input
    }
}
