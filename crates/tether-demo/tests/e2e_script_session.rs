#![forbid(unsafe_code)]

//! Script-driven sessions through the public `run` entry point.

use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;
use tether_demo::{Cli, DemoError, run};

fn cli_for(script: PathBuf, extra: &[&str]) -> Cli {
    let script = script.to_string_lossy().into_owned();
    let args = ["tether-demo", "--script", script.as_str()]
        .into_iter()
        .chain(extra.iter().copied());
    Cli::try_parse_from(args).expect("arguments parse")
}

fn run_script(lines: &str, extra: &[&str]) -> String {
    let mut file = tempfile::NamedTempFile::new().expect("temp script");
    file.write_all(lines.as_bytes()).expect("write script");
    let cli = cli_for(file.path().to_path_buf(), extra);
    let mut out = Vec::new();
    run(&cli, &mut out).expect("session runs");
    String::from_utf8(out).expect("utf-8 output")
}

#[test]
fn full_cart_session() {
    let out = run_script(
        "\
# weekly shop
add apple 1.20
add bread 2.50
add cheese 6
set 1 rye bread 3.10
remove 0
show
",
        &[],
    );

    assert!(out.contains("set 1 to rye bread:3.10 (was bread:2.50)"));
    assert!(out.contains("removed apple:1.20"));
    assert!(out.contains("Cart (2)"));
    assert!(out.contains("0: rye bread"));
    assert!(out.contains("1: cheese"));
    assert!(out.ends_with("Items: 2 items | Total: $9.10\n"));
}

#[test]
fn eager_binding_and_currency_flag() {
    let out = run_script("show\nreplace tea:2,milk:1.5\n", &["--eager", "--currency", "€"]);
    assert!(out.starts_with("Cart (0)\nItems: 0 items | Total: €0.00\n"));
    assert!(out.contains("replaced cart with 2 items\nItems: 2 items | Total: €3.50"));
}

#[test]
fn lazy_binding_shows_placeholders_until_first_edit() {
    let out = run_script("show\n", &[]);
    assert_eq!(out, "Cart (0)\nItems: - | Total: -\n");
}

#[test]
fn bad_commands_are_reported_inline() {
    let out = run_script("remove 5\nadd 3\nadd pen 1\n", &[]);
    let errors = out.lines().filter(|l| l.starts_with("error: ")).count();
    assert_eq!(errors, 2);
    assert!(out.contains("Items: 1 item | Total: $1.00"));
}

#[test]
fn missing_script_is_an_argument_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cli = cli_for(dir.path().join("absent.txt"), &[]);
    let err = run(&cli, &mut Vec::new()).expect_err("script is missing");
    assert!(matches!(err, DemoError::MissingScript { .. }));
    assert_eq!(err.exit_code(), 2);
}
