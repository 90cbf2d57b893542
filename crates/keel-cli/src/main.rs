//! keel CLI - load exported artifacts and drive them from the shell.
//!
//! The artifact file is the whole contract: the CLI reconstitutes the O(1)
//! runtime from the JSON tables and never re-verifies.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use keel_check::{Machine, VarKind};

#[derive(Parser)]
#[command(name = "keel", version, about = "Inspect and drive exported keel artifacts")]
struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print artifact metadata and the verification stamp.
    Info {
        /// Exported artifact (JSON).
        file: PathBuf,
    },
    /// Apply a sequence of events from the initial state and print each
    /// intermediate state.
    Apply {
        /// Exported artifact (JSON).
        file: PathBuf,
        /// Comma-separated event names, applied in order.
        #[arg(short, long, value_delimiter = ',', required = true)]
        events: Vec<String>,
        /// Packed id of the starting state (defaults to the initial state).
        #[arg(long)]
        from: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    match cli.command {
        Command::Info { file } => cmd_info(&file),
        Command::Apply { file, events, from } => cmd_apply(&file, &events, from),
    }
}

fn load(file: &Path) -> Result<Machine> {
    Machine::import_from(file).with_context(|| format!("loading artifact {}", file.display()))
}

fn cmd_info(file: &Path) -> Result<()> {
    let machine = load(file)?;
    let stamp = machine.stamp();

    println!("Machine: {}", machine.name());
    println!("  Variables:");
    for vi in machine.layout().vars() {
        let v = vi.var();
        match v.kind() {
            VarKind::Bool => println!("    {} : bool", vi.name()),
            VarKind::Enum => {
                let labels: Vec<&str> = vi.labels().iter().map(|l| l.as_ref()).collect();
                println!("    {} : enum {{{}}}", vi.name(), labels.join(", "));
            }
            VarKind::Int => println!("    {} : int [{}, {}]", vi.name(), v.min(), v.max()),
        }
    }
    println!("  Events:");
    for name in machine.events() {
        println!("    {}", name);
    }
    println!("  States: {}", stamp.state_count);
    println!(
        "  Verified: WFC={} CC={} (max repair depth {}) at {}",
        stamp.wfc, stamp.cc, stamp.max_repair_depth, stamp.verified_at
    );
    Ok(())
}

fn cmd_apply(file: &Path, events: &[String], from: Option<u32>) -> Result<()> {
    let machine = load(file)?;
    let mut s = match from {
        Some(id) => machine.state(id),
        None => machine.initial_state(),
    };

    println!("start: {}", s);
    for event in events {
        s = machine
            .apply(&s, event)
            .with_context(|| format!("applying {:?}", event))?;
        println!("{} -> {}", event, s);
    }
    Ok(())
}
