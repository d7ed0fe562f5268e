//! Termweave CLI — external term reference resolution and transclusion.
//!
//! Collects `[[xref: spec, term]]` references from a specification's
//! Markdown corpus, resolves them against external GitHub repositories,
//! and injects the resolved definitions into rendered HTML.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
