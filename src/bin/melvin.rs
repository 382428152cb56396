//! Thin CLI front-end over `melvin_core::ReasoningEngine`.
//!
//! Deliberately minimal: a demo shell for exercising `open`/`learn`/
//! `reason`/`maintain` against a directory-backed store, not a production
//! front-end.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use melvin_core::{MelvinConfig, ReasoningEngine};

#[derive(Parser)]
#[command(name = "melvin", about = "Graph-native associative reasoning engine")]
struct Cli {
    /// Directory holding the `.melvin` store files.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Teach the graph a sentence.
    Learn { text: String },
    /// Ask the graph a question.
    Reason {
        text: String,
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
    },
    /// Run decay + prune + mining once.
    Maintain {
        #[arg(long, default_value_t = 3600.0)]
        dt_secs: f64,
    },
    /// Print node/edge/path counts.
    Stats,
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("melvin")
}

fn main() -> melvin_core::MelvinResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let dir = cli.store_dir.unwrap_or_else(default_store_dir);
    let store = melvin_core::FileStore::open(&dir)?;
    let mut engine = ReasoningEngine::new(store, MelvinConfig::default());

    match cli.command {
        Command::Learn { text } => {
            let nodes = engine.learn(&text)?;
            println!("learned {} nodes", nodes.len());
        }
        Command::Reason { text, timeout_secs } => {
            let result = engine.reason(&text, Some(Duration::from_secs(timeout_secs)))?;
            println!("{} (confidence {:.2})", result.sentence, result.confidence);
        }
        Command::Maintain { dt_secs } => {
            let report = engine.run_maintenance_pass(dt_secs)?;
            println!(
                "pruned {} edges, created {} leap edges",
                report.edges_pruned, report.leap_edges_created
            );
        }
        Command::Stats => {
            println!(
                "nodes={} edges={} paths={}",
                engine.node_count()?,
                engine.edge_count()?,
                engine.path_count()?
            );
        }
    }

    Ok(())
}
