#![forbid(unsafe_code)]

//! The demo's reactive model: a cart of priced items and the display
//! values derived from it.

use std::fmt;

use tether_core::{BindingScope, CollectionBox, Delivery, ValueBox, bind_to};

use crate::error::{DemoError, Result};
use crate::widgets::{Label, ListView};

/// A priced line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub cents: u64,
}

impl Item {
    #[must_use]
    pub fn new(name: impl Into<String>, cents: u64) -> Self {
        Self {
            name: name.into(),
            cents,
        }
    }

    /// Parse `name:price`.
    pub fn parse_pair(input: &str) -> Result<Self> {
        let (name, price) = input
            .split_once(':')
            .ok_or_else(|| DemoError::parse(input, "expected name:price"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DemoError::parse(input, "empty item name"));
        }
        Ok(Self::new(name, parse_cents(price.trim())?))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, Money::new("", self.cents))
    }
}

/// An amount rendered with a currency symbol and two decimals.
#[derive(Debug, Clone, Copy)]
pub struct Money<'a> {
    symbol: &'a str,
    cents: u64,
}

impl<'a> Money<'a> {
    #[must_use]
    pub fn new(symbol: &'a str, cents: u64) -> Self {
        Self { symbol, cents }
    }
}

impl fmt::Display for Money<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{:02}", self.symbol, self.cents / 100, self.cents % 100)
    }
}

/// Parse a non-negative price with at most two decimals into cents.
pub fn parse_cents(input: &str) -> Result<u64> {
    let invalid = || DemoError::parse(input, "expected a price such as 4 or 4.25");
    let (whole, fraction) = input.split_once('.').unwrap_or((input, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    let fraction: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Cart items plus the widgets bound to values derived from them.
///
/// Derived boxes are held by the cart's [`BindingScope`]; only the item
/// collection is kept as a named handle.
pub struct Cart {
    items: CollectionBox<Item>,
    list_view: ListView,
    total: Label,
    count: Label,
    scope: BindingScope,
}

impl Cart {
    /// Build an empty cart and bind its widgets with `delivery`.
    #[must_use]
    pub fn new(currency: &str, delivery: Delivery) -> Self {
        let items = CollectionBox::new(Vec::<Item>::new());
        let list_view = ListView::new("Cart");
        let total = Label::new("Total");
        let count = Label::new("Items");
        let mut scope = BindingScope::new();

        let symbol = currency.to_string();
        let rows = scope.retain(items.map(move |item: &Item| {
            format!("{:<16} {:>10}", item.name, Money::new(&symbol, item.cents).to_string())
        }));
        bind_to(&rows, &list_view, delivery);

        let symbol = currency.to_string();
        let total_text = scope.retain(
            items
                .aggregate(|items| items.iter().map(|item| item.cents).sum::<u64>())
                .map(move |cents| Money::new(&symbol, *cents).to_string()),
        );
        bind_to(&total_text, &total, delivery);

        let count_text = scope.retain(
            items
                .aggregate(<[Item]>::len)
                .map(|n| if *n == 1 { "1 item".to_string() } else { format!("{n} items") }),
        );
        bind_to(&count_text, &count, delivery);

        tracing::debug!(
            message = "cart.bound",
            eager = delivery.is_immediate(),
            derived = scope.binding_count()
        );

        Self {
            items,
            list_view,
            total,
            count,
            scope,
        }
    }

    #[must_use]
    pub fn items(&self) -> &CollectionBox<Item> {
        &self.items
    }

    #[must_use]
    pub fn list_view(&self) -> &ListView {
        &self.list_view
    }

    #[must_use]
    pub fn total(&self) -> &Label {
        &self.total
    }

    #[must_use]
    pub fn count(&self) -> &Label {
        &self.count
    }

    pub fn add(&self, item: Item) {
        self.items.push(item);
    }

    pub fn remove(&self, index: usize) -> Result<Item> {
        Ok(self.items.try_remove_at(index)?)
    }

    pub fn set(&self, index: usize, item: Item) -> Result<Item> {
        Ok(self.items.try_update(index, item)?)
    }

    pub fn replace(&self, items: Vec<Item>) {
        self.items.replace_all(items);
    }

    /// One-line summary from the bound labels.
    #[must_use]
    pub fn status(&self) -> String {
        format!("{} | {}", self.count.render(), self.total.render())
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!("{}\n{}", self.list_view.render(), self.status())
    }
}

impl fmt::Debug for Cart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cart")
            .field("items", &self.items.len())
            .field("scope", &self.scope)
            .finish()
    }
}
