#![forbid(unsafe_code)]

//! Command-line arguments for the demo.
//!
//! Every flag can be overridden through a `TETHER_DEMO_*` environment
//! variable, which wins over the command line.

use std::env;
use std::path::PathBuf;

use clap::Parser;
use tether_core::Delivery;

use crate::error::{DemoError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "tether-demo",
    about = "Shopping-cart console wired together with tether value bindings",
    version,
    after_help = "\
ENVIRONMENT VARIABLES:
    TETHER_DEMO_SCRIPT     Override --script
    TETHER_DEMO_LOG        Override --log
    TETHER_DEMO_EAGER      Override --eager (1/true to enable)
    TETHER_DEMO_CURRENCY   Override --currency"
)]
pub struct Cli {
    /// Read commands from this file instead of stdin.
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `tether_core=trace`.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log: String,

    /// Push current values to widgets as soon as they are bound.
    #[arg(long)]
    pub eager: bool,

    /// Currency symbol used for prices.
    #[arg(long, value_name = "SYMBOL", default_value = "$")]
    pub currency: String,
}

impl Cli {
    /// Parse the process arguments and apply environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut cli = Self::parse();
        cli.apply_overrides(|key| env::var(key).ok())?;
        Ok(cli)
    }

    /// Apply `TETHER_DEMO_*` overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("TETHER_DEMO_SCRIPT") {
            self.script = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("TETHER_DEMO_LOG") {
            self.log = val;
        }
        if let Some(val) = lookup("TETHER_DEMO_EAGER") {
            self.eager = match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(DemoError::invalid(format!(
                        "TETHER_DEMO_EAGER must be a boolean, got `{other}`"
                    )));
                }
            };
        }
        if let Some(val) = lookup("TETHER_DEMO_CURRENCY") {
            self.currency = val;
        }
        Ok(())
    }

    /// Attach-time delivery for widget bindings.
    #[must_use]
    pub fn delivery(&self) -> Delivery {
        if self.eager {
            Delivery::Immediate
        } else {
            Delivery::Lazy
        }
    }
}
