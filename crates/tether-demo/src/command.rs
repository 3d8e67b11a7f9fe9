#![forbid(unsafe_code)]

//! Line-oriented session commands.

use crate::cart::{Item, parse_cents};
use crate::error::{DemoError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <name> <price>`
    Add(Item),
    /// `remove <index>`
    Remove(usize),
    /// `set <index> <name> <price>`
    Set { index: usize, item: Item },
    /// `replace <name>:<price>,...`
    Replace(Vec<Item>),
    /// `show`
    Show,
    /// `quit`
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

        let command = match verb {
            "add" => Self::Add(parse_item(line, rest)?),
            "remove" => Self::Remove(parse_index(line, rest)?),
            "set" => {
                let (index, item) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| DemoError::parse(line, "usage: set <index> <name> <price>"))?;
                Self::Set {
                    index: parse_index(line, index)?,
                    item: parse_item(line, item.trim())?,
                }
            }
            "replace" => Self::Replace(
                rest.split(',')
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty())
                    .map(Item::parse_pair)
                    .collect::<Result<Vec<_>>>()?,
            ),
            "show" => Self::Show,
            "quit" | "exit" => Self::Quit,
            other => return Err(DemoError::parse(line, format!("unknown command `{other}`"))),
        };
        Ok(Some(command))
    }
}

/// `<name words...> <price>`; the last word is the price.
fn parse_item(line: &str, args: &str) -> Result<Item> {
    let (name, price) = args
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| DemoError::parse(line, "expected <name> <price>"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(DemoError::parse(line, "empty item name"));
    }
    Ok(Item::new(name, parse_cents(price)?))
}

fn parse_index(line: &str, arg: &str) -> Result<usize> {
    arg.trim()
        .parse()
        .map_err(|_| DemoError::parse(line, format!("`{arg}` is not an index")))
}
