#![forbid(unsafe_code)]

//! The interactive session: reads commands, edits the cart and prints
//! what the bound widgets show.

use std::io::{BufRead, Write};

use tether_core::Delivery;

use crate::cart::Cart;
use crate::command::Command;
use crate::error::Result;

/// Whether the session should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    cart: Cart,
}

impl App {
    #[must_use]
    pub fn new(currency: &str, delivery: Delivery) -> Self {
        Self {
            cart: Cart::new(currency, delivery),
        }
    }

    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Run commands from `input` until it ends or `quit` is read.
    ///
    /// Recoverable errors are printed and the session continues; I/O
    /// failures end it.
    pub fn run(&self, input: impl BufRead, out: &mut impl Write) -> Result<()> {
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            let outcome = Command::parse(&line).and_then(|command| match command {
                Some(command) => self.execute(command, out),
                None => Ok(Flow::Continue),
            });
            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(message = "demo.command_failed", line = number + 1, error = %err);
                    writeln!(out, "error: {err}")?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    pub fn execute(&self, command: Command, out: &mut impl Write) -> Result<Flow> {
        tracing::debug!(message = "demo.command", command = ?command);
        match command {
            Command::Add(item) => {
                writeln!(out, "added {item}")?;
                self.cart.add(item);
            }
            Command::Remove(index) => {
                let removed = self.cart.remove(index)?;
                writeln!(out, "removed {removed}")?;
            }
            Command::Set { index, item } => {
                let line = format!("set {index} to {item}");
                let previous = self.cart.set(index, item)?;
                writeln!(out, "{line} (was {previous})")?;
            }
            Command::Replace(items) => {
                writeln!(out, "replaced cart with {} items", items.len())?;
                self.cart.replace(items);
            }
            Command::Show => {
                writeln!(out, "{}", self.cart.render())?;
                return Ok(Flow::Continue);
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        writeln!(out, "{}", self.cart.status())?;
        Ok(Flow::Continue)
    }
}
