#![forbid(unsafe_code)]

//! Console shopping cart driven by tether bindings.
//!
//! Items live in a `CollectionBox`; display rows, the item count and the
//! total are derived from it and bound to toy widgets. Commands are read
//! line by line from stdin or a script file.

pub mod app;
pub mod cart;
pub mod cli;
pub mod command;
pub mod error;
pub mod widgets;

use std::fs::File;
use std::io::{self, BufReader, Write};

use tracing_subscriber::EnvFilter;

pub use app::{App, Flow};
pub use cli::Cli;
pub use error::{DemoError, Result};

pub fn run_from_env() -> Result<()> {
    let cli = Cli::from_env()?;
    init_logging(&cli.log)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)
}

/// Run one session as configured by `cli`, writing to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let app = App::new(&cli.currency, cli.delivery());
    tracing::info!(
        message = "demo.start",
        script = ?cli.script,
        eager = cli.eager,
        currency = %cli.currency
    );
    match &cli.script {
        Some(path) => {
            if !path.exists() {
                return Err(DemoError::MissingScript { path: path.clone() });
            }
            app.run(BufReader::new(File::open(path)?), out)
        }
        None => app.run(io::stdin().lock(), out),
    }
}

/// Install the stderr log subscriber filtered by `directive`.
pub fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|err| DemoError::invalid(format!("--log `{directive}`: {err}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| DemoError::Logging {
            message: err.to_string(),
        })
}
