//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use termweave_core::{CollectConfig, collect, load_dataset};
use termweave_shared::{DEFAULT_INDEX_TTL_SECS, RunConfig};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Termweave — resolve and transclude external term references.
#[derive(Parser)]
#[command(
    name = "termweave",
    version,
    about = "Resolve external term references and transclude their definitions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect external term references and build the dataset.
    Collect {
        /// Directory containing specs.json and the document corpus.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Cache directory for remote lookup results.
        #[arg(long, default_value = ".cache/termweave")]
        cache_dir: PathBuf,

        /// Output directory for the dataset files.
        #[arg(short, long, default_value = "output")]
        out: PathBuf,

        /// GitHub API token. Anonymous requests work but hit the
        /// unauthenticated rate limit quickly.
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Term-index cache freshness window, in seconds.
        #[arg(long, default_value_t = DEFAULT_INDEX_TTL_SECS)]
        index_ttl: u64,
    },

    /// Inject resolved definitions into a rendered HTML document.
    Transclude {
        /// Rendered HTML file carrying term placeholders.
        input: PathBuf,

        /// Dataset directory (where `collect` wrote xrefs-data.json).
        #[arg(short, long, default_value = "output")]
        dataset: PathBuf,

        /// Output file. Defaults to rewriting the input in place.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Workspace crates covered by the default log filter. `EnvFilter`
/// directives only match whole target prefixes up to a `::` boundary,
/// so a bare `termweave=` directive would never match the
/// underscore-separated crate names.
const LOG_TARGETS: &[&str] = &[
    "termweave_cli",
    "termweave_core",
    "termweave_resolver",
    "termweave_github",
    "termweave_cache",
    "termweave_extractor",
    "termweave_transclude",
    "termweave_shared",
];

fn default_directives(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose)));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Collect {
            dir,
            cache_dir,
            out,
            token,
            index_ttl,
        } => cmd_collect(dir, cache_dir, out, token, index_ttl).await,
        Command::Transclude {
            input,
            dataset,
            out,
        } => cmd_transclude(&input, &dataset, out.as_deref()),
    }
}

async fn cmd_collect(
    dir: PathBuf,
    cache_dir: PathBuf,
    out: PathBuf,
    token: Option<String>,
    index_ttl: u64,
) -> Result<()> {
    let config = CollectConfig {
        base_dir: dir,
        run: RunConfig {
            cache_dir,
            output_dir: out,
            github_token: token,
            index_ttl: Duration::from_secs(index_ttl),
            ..RunConfig::default()
        },
    };

    let result = collect(config).await?;
    println!(
        "{} references, {} resolved → {} ({:.1}s)",
        result.record_count,
        result.resolved_count,
        result.dataset_path.display(),
        result.elapsed.as_secs_f64(),
    );
    Ok(())
}

fn cmd_transclude(input: &Path, dataset_dir: &Path, out: Option<&Path>) -> Result<()> {
    let html = std::fs::read_to_string(input)?;
    let dataset = load_dataset(dataset_dir)?;
    info!(records = dataset.xrefs.len(), "loaded dataset");

    let transcluded = termweave_transclude::transclude(&html, &dataset);

    let target = out.unwrap_or(input);
    std::fs::write(target, transcluded)?;
    println!("transcluded definitions written to {}", target.display());
    Ok(())
}
