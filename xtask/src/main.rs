//! Development automation tasks for the ODP session workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::Context;

/// One `cargo` invocation and the message shown when it fails
struct CargoStep {
    args: &'static [&'static str],
    failure: &'static str,
}

const FMT: CargoStep = CargoStep {
    args: &["fmt", "--all", "--", "--check"],
    failure: "Format check failed. Run 'cargo fmt --all' to fix.",
};
const CLIPPY: CargoStep = CargoStep {
    args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    failure: "Clippy run failed. See output above.",
};
const TEST: CargoStep =
    CargoStep { args: &["test", "--workspace", "--all-targets"], failure: "Tests failed" };
const EXAMPLES: CargoStep = CargoStep {
    args: &["build", "-p", "odp-session-infra", "--examples"],
    failure: "Examples failed to build",
};
const DENY: CargoStep = CargoStep { args: &["deny", "check"], failure: "cargo-deny found issues" };
const AUDIT: CargoStep =
    CargoStep { args: &["audit"], failure: "cargo-audit found vulnerabilities" };

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run(&FMT),
        Some("clippy") => run(&CLIPPY),
        Some("test") => run(&TEST),
        Some("examples") => run(&EXAMPLES),
        Some("deny") => require_tool("deny", "cargo-deny").and_then(|()| run(&DENY)),
        Some("audit") => require_tool("audit", "cargo-audit").and_then(|()| run(&AUDIT)),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("ODP Session Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci        Run all CI checks (fmt, clippy, test, examples, deny, audit)");
    println!("    fmt       Check Rust code formatting");
    println!("    clippy    Run Clippy lints");
    println!("    test      Run all tests");
    println!("    examples  Build the infra examples");
    println!("    deny      Check dependencies with cargo-deny");
    println!("    audit     Audit dependencies for security vulnerabilities");
    println!("    help      Show this help message");
}

/// Run all CI checks in sequence
fn run_ci() -> anyhow::Result<()> {
    let steps: [(&str, &CargoStep, Option<(&str, &str)>); 6] = [
        ("Checking Rust format", &FMT, None),
        ("Running Clippy", &CLIPPY, None),
        ("Running tests", &TEST, None),
        ("Building examples", &EXAMPLES, None),
        ("Checking dependencies", &DENY, Some(("deny", "cargo-deny"))),
        ("Auditing dependencies", &AUDIT, Some(("audit", "cargo-audit"))),
    ];

    println!("==> Running CI checks...");
    for (index, (label, step, tool)) in steps.iter().enumerate() {
        println!("\n==> Step {}/{}: {label}...", index + 1, steps.len());
        if let Some((subcommand, package)) = tool {
            require_tool(subcommand, package)?;
        }
        run(step)?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

fn run(step: &CargoStep) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(step.args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", step.args.join(" ")))?;

    if !status.success() {
        anyhow::bail!(step.failure);
    }
    Ok(())
}

/// Fail early with an install hint when a cargo plugin is missing
fn require_tool(subcommand: &str, package: &str) -> anyhow::Result<()> {
    let installed = Command::new("cargo")
        .args([subcommand, "--version"])
        .output()
        .is_ok_and(|output| output.status.success());

    if !installed {
        eprintln!("{package} is not installed.");
        eprintln!("Install it with: cargo install {package}");
        anyhow::bail!("{package} not found");
    }
    Ok(())
}
