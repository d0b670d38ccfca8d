mod batch;
mod collect;
mod config;
mod pr;
mod report;
mod score;
mod size;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::batch::{PullRequestBatch, RepoPaths};
use crate::collect::savings::resolve_source;
use crate::collect::{Collector, SavingsProvider, SystemRunner};
use crate::config::{Config, SavingsSource};
use crate::pr::{InputError, Repo};

/// port-score: ranks merged upstream pull requests by how cheap they are to
/// port, weighing code-size savings against commits, files, lines changed and
/// divergence from the target branch.
#[derive(Parser, Debug)]
#[command(name = "port-score", version, about)]
struct Cli {
    /// Pull request table: JSON rows with byte savings, or a plain list of
    /// identifiers ('#' = primary repository, 'r' = restricted repository)
    #[arg(value_name = "PR_TABLE")]
    pr_table: PathBuf,

    /// Root of the primary repository's working copy
    #[arg(value_name = "PRIMARY_PATH")]
    primary_path: PathBuf,

    /// Root of the restricted repository's working copy
    #[arg(value_name = "RESTRICTED_PATH")]
    restricted_path: PathBuf,

    /// Configuration file (defaults to .port-score.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print raw metrics and batch maxima before the ranking
    #[arg(long)]
    details: bool,

    /// Also write the ranking as a markdown file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let _main_span = info_span!("port_score", table = %cli.pr_table.display()).entered();

    info!("loading configuration");
    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env()?;
            config
        }
        None => Config::load()?,
    };
    debug!(?config, "configuration loaded");

    let runner = SystemRunner::new(config.tools.timeout());
    let collector = Collector::new(&runner, &config.tools);

    check_file(&cli.pr_table)?;
    let paths = RepoPaths {
        primary: check_repository(&collector, &cli.primary_path).await?,
        restricted: check_repository(&collector, &cli.restricted_path).await?,
    };

    info!("reading pull request table");
    let list = pr::input::load(&cli.pr_table)?;
    let source = resolve_source(config.savings.source, list.format);
    info!(records = list.records.len(), source = ?source, "pull request table loaded");

    if source == SavingsSource::Build {
        config.build.validate()?;
    } else {
        SavingsProvider::Supplied.check_inputs(&list.records)?;
    }

    if config.tools.update_before_run {
        collector.prepare_repository(Repo::Primary, &paths.primary).await?;
        collector.prepare_repository(Repo::Restricted, &paths.restricted).await?;
    }

    let mut batch = match source {
        SavingsSource::Build => {
            let provider =
                SavingsProvider::measured(&collector, config.build.clone(), &paths.primary).await?;
            let mut batch = PullRequestBatch::new(list.records, provider);
            batch.baseline_established()?;
            batch
        }
        _ => PullRequestBatch::new(list.records, SavingsProvider::Supplied),
    };

    batch.collect(&collector, &paths).await?;

    info!(maxima = ?batch.maxima(), "scoring");
    batch.score()?;

    let built_report = batch.report()?;
    report::output(&built_report, cli.details, cli.output.as_deref())?;
    batch.finish()?;
    info!(phase = %batch.phase(), "finished");

    Ok(())
}

fn check_file(path: &Path) -> Result<(), InputError> {
    if !path.exists() {
        return Err(InputError::MissingPath(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Absolute path of a git working copy, or the reason it cannot be used.
async fn check_repository(collector: &Collector<'_>, path: &Path) -> Result<PathBuf, InputError> {
    if !path.exists() {
        return Err(InputError::MissingPath(path.to_path_buf()));
    }
    let absolute = path
        .canonicalize()
        .map_err(|_| InputError::MissingPath(path.to_path_buf()))?;
    if !absolute.is_dir() || !collector.is_work_tree(&absolute).await {
        return Err(InputError::NotARepository(path.to_path_buf()));
    }
    Ok(absolute)
}
