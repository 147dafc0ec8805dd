//! followgraph CLI - users, follows and recommendations over a graph store.
//!
//! Usage:
//!   followgraph register -u alice -e alice@example.com -n Alice -p secret
//!   followgraph follow bob -u alice -p secret
//!   followgraph connections -u alice
//!   followgraph recommend -u alice
//!   followgraph top --limit 5
//!   followgraph search ali
//!
//! Set `RUST_LOG=followgraph=debug` to see store activity on stderr.

use anyhow::Result;
use clap::Parser;
use followgraph::cli::{self, Cli};
use followgraph::config::FollowGraphConfig;
use followgraph::FollowGraph;
use tracing::debug;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = FollowGraphConfig::load(&cli.config);
    if let Some(uri) = cli.store {
        debug!(%uri, "store overridden on the command line");
        config.store.uri = uri;
    }

    let graph = FollowGraph::open(&config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::execute(&graph, cli.command, cli.json, &mut out)
}
