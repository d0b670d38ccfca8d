use std::path::Path;
use tracing::{debug, info, warn};

use super::{CollectError, Collector, FormatError, Invocation, Step};
use crate::config::{BuildConfig, SavingsSource};
use crate::pr::input::InputFormat;
use crate::pr::{InputError, PullRequestRecord, Repo};
use crate::size::Size;

const BASELINE: &str = "baseline";

/// Settle `auto`: tables carry their own savings, plain lists need builds.
pub fn resolve_source(source: SavingsSource, format: InputFormat) -> SavingsSource {
    match (source, format) {
        (SavingsSource::Auto, InputFormat::Table) => SavingsSource::Input,
        (SavingsSource::Auto, InputFormat::List) => SavingsSource::Build,
        (explicit, _) => explicit,
    }
}

/// Where a pull request's bytes-saved figure comes from.
#[derive(Debug, Clone)]
pub enum SavingsProvider {
    /// "Bytes saved" from the input table, taken as code bytes
    Supplied,
    /// Built at the pull request's checkout and compared with the baseline
    Measured { build: BuildConfig, baseline: Size },
}

impl SavingsProvider {
    /// Every record must carry a supplied figure for the `Supplied` provider.
    pub fn check_inputs(&self, records: &[PullRequestRecord]) -> Result<(), InputError> {
        if let SavingsProvider::Supplied = self {
            if let Some(missing) = records.iter().find(|r| r.supplied_savings.is_none()) {
                return Err(InputError::MissingSavings(missing.label()));
            }
        }
        Ok(())
    }

    /// Check out `build.reference` in the primary working copy, measure it,
    /// and return to the target branch.
    pub async fn measured(
        collector: &Collector<'_>,
        build: BuildConfig,
        primary_path: &Path,
    ) -> Result<Self, CollectError> {
        let reference = build.reference.clone().unwrap_or_default();
        info!(reference = %reference, "measuring baseline build");

        let measured = match collector
            .checkout_ref(BASELINE, Step::Baseline, primary_path, &reference)
            .await
        {
            Ok(()) => measure(collector, &build, BASELINE, primary_path).await,
            Err(e) => Err(e),
        };

        // The target branch is checked out again even when measuring failed.
        let restored = collector
            .checkout_ref(
                BASELINE,
                Step::Restore,
                primary_path,
                Repo::Primary.target_branch(),
            )
            .await;
        let baseline = match (measured, restored) {
            (Ok(baseline), Ok(())) => baseline,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), restored) => {
                if let Err(restore_error) = restored {
                    warn!(error = %restore_error, "could not restore primary target branch");
                }
                return Err(e);
            }
        };

        info!(baseline = %baseline, "baseline established");
        Ok(SavingsProvider::Measured { build, baseline })
    }

    pub fn baseline(&self) -> Option<Size> {
        match self {
            SavingsProvider::Supplied => None,
            SavingsProvider::Measured { baseline, .. } => Some(*baseline),
        }
    }

    /// Bytes saved by `record`, whose pull request is checked out at `repo_path`.
    /// Negative when the pull request grows the build.
    pub async fn bytes_saved(
        &self,
        collector: &Collector<'_>,
        record: &PullRequestRecord,
        repo_path: &Path,
    ) -> Result<Size, CollectError> {
        match self {
            SavingsProvider::Supplied => record
                .supplied_savings
                .map(|bytes| Size::new(bytes, 0))
                .ok_or_else(|| CollectError::Collection {
                    target: record.label(),
                    step: Step::Savings,
                    detail: "no byte savings in the input table".to_string(),
                }),
            SavingsProvider::Measured { build, baseline } => {
                let size = measure(collector, build, &record.label(), repo_path).await?;
                Ok(*baseline - size)
            }
        }
    }
}

/// Clean, build, and read the size report of the working copy at `path`.
async fn measure(
    collector: &Collector<'_>,
    build: &BuildConfig,
    target: &str,
    path: &Path,
) -> Result<Size, CollectError> {
    if let Some(clean) = Invocation::from_argv(&build.clean, path) {
        collector
            .run_step(target, Step::Clean, &clean.envs(&build.env))
            .await?;
    }

    let command = Invocation::from_argv(&build.command, path).ok_or_else(|| {
        CollectError::Collection {
            target: target.to_string(),
            step: Step::Build,
            detail: "no build command configured".to_string(),
        }
    })?;
    collector
        .run_step(target, Step::Build, &command.envs(&build.env))
        .await?;

    let size_tool = Invocation::from_argv(&build.size, path).ok_or_else(|| {
        CollectError::Collection {
            target: target.to_string(),
            step: Step::SizeReport,
            detail: "no size command configured".to_string(),
        }
    })?;
    let report = collector
        .run_step(target, Step::SizeReport, &size_tool.envs(&build.env))
        .await?;

    let size = parse_size_report(&report)
        .map_err(|e| CollectError::data_format(target, Step::SizeReport, e))?;
    debug!(subject = target, size = %size, "measured build");
    Ok(size)
}

/// Read text and data sizes from a size report: the last-but-one line (the
/// totals row, followed by the report's final newline), tab separated, code
/// size first, data size second.
pub fn parse_size_report(report: &str) -> Result<Size, FormatError> {
    let lines: Vec<&str> = report.split('\n').collect();
    if lines.len() < 2 {
        return Err(FormatError::SizeReport(format!(
            "expected at least two lines, got {:?}",
            report
        )));
    }
    let totals = lines[lines.len() - 2];

    let mut columns = totals.split('\t').map(str::trim);
    let mut column = |name: &str| -> Result<i64, FormatError> {
        columns
            .next()
            .and_then(|c| c.parse::<i64>().ok())
            .ok_or_else(|| FormatError::SizeReport(format!("no {} size in {:?}", name, totals)))
    };
    let text = column("text")?;
    let data = column("data")?;
    Ok(Size::new(text, data))
}
