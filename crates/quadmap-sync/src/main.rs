//! CLI entry point for the quadmap-sync schema reconciler.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use quadmap_sync::config::{OutputFormat, SyncConfig};
use quadmap_sync::diff::reconcile;
use quadmap_sync::plan::AlterPlan;

#[derive(Parser)]
#[command(name = "quadmap-sync")]
#[command(about = "Print the schema changes that bring a graph store in line with a declared schema")]
struct Cli {
    /// Declared schema JSON (predicates and types).
    #[arg(short, long)]
    declared: Option<PathBuf>,

    /// Live schema JSON as returned by `schema {}`.
    #[arg(short, long)]
    live: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Also drop live predicates missing from the declared schema.
    #[arg(long)]
    drop_unlisted: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Config file prefix (default: quadmap).
    #[arg(short, long, default_value = "quadmap")]
    config: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = SyncConfig::load(&cli.config)?;
    if let Some(path) = cli.declared {
        config.declared_schema = path;
    }
    if let Some(path) = cli.live {
        config.live_schema = Some(path);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    config.drop_unlisted |= cli.drop_unlisted;

    let declared = config.read_declared()?;
    let live = config.read_live()?;
    tracing::info!(
        declared = %config.declared_schema.display(),
        live_predicates = live.predicates.len(),
        "Reconciling schema"
    );

    let diff = reconcile(&declared, &live);
    tracing::info!(
        missing = diff.summary.missing_predicates,
        changed = diff.summary.changed_predicates,
        missing_types = diff.summary.missing_types,
        changed_types = diff.summary.changed_types,
        unlisted = diff.unlisted.len(),
        "Schema diff computed"
    );

    let plan = AlterPlan::from_diff(&diff, config.drop_unlisted);
    if plan.is_empty() {
        tracing::info!("Schema already up to date");
        return Ok(());
    }
    println!("{}", plan.render(config.format)?);
    Ok(())
}
