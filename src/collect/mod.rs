pub mod metadata;
pub mod runner;
pub mod savings;
#[cfg(test)]
pub mod testing;

pub use runner::{Invocation, SystemRunner, ToolRunner};
#[cfg(test)]
pub use runner::ToolOutput;
pub use savings::SavingsProvider;

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::ToolsConfig;
use crate::pr::{Metrics, PullRequestRecord, Repo};
use metadata::{DiffStat, PrView};

/// Stage of collection a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prepare,
    Checkout,
    Metadata,
    Diff,
    Savings,
    Baseline,
    Clean,
    Build,
    SizeReport,
    Restore,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Prepare => "target branch update",
            Step::Checkout => "pull request checkout",
            Step::Metadata => "metadata query",
            Step::Diff => "diff against target branch",
            Step::Savings => "byte savings lookup",
            Step::Baseline => "baseline checkout",
            Step::Clean => "build clean",
            Step::Build => "library build",
            Step::SizeReport => "size report",
            Step::Restore => "target branch restore",
        };
        f.write_str(name)
    }
}

/// Unparseable output from an external tool.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid pull request metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("unexpected diff summary {0:?}")]
    ShortStat(String),

    #[error("unexpected size report: {0}")]
    SizeReport(String),
}

#[derive(Debug, Error)]
pub enum CollectError {
    /// A tool exited non-zero, could not be started or timed out.
    #[error("{target}: {step} failed: {detail}")]
    Collection {
        target: String,
        step: Step,
        detail: String,
    },

    #[error("{target}: {step} returned unreadable output: {source}")]
    DataFormat {
        target: String,
        step: Step,
        #[source]
        source: FormatError,
    },
}

impl CollectError {
    pub fn data_format(target: &str, step: Step, source: FormatError) -> Self {
        CollectError::DataFormat {
            target: target.to_string(),
            step,
            source,
        }
    }
}

/// Gathers raw metrics for pull requests by driving git, gh and the build
/// through a `ToolRunner`.
///
/// Every pull request is checked out into the repository's single working
/// tree, so collection is strictly one pull request at a time.
pub struct Collector<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a ToolsConfig,
}

impl<'a> Collector<'a> {
    pub fn new(runner: &'a dyn ToolRunner, tools: &'a ToolsConfig) -> Self {
        Self { runner, tools }
    }

    /// Run one step and return its stdout. `target` names the pull request
    /// (or `baseline`) in the error.
    pub async fn run_step(
        &self,
        target: &str,
        step: Step,
        invocation: &Invocation,
    ) -> Result<String, CollectError> {
        let failure = |detail: String| CollectError::Collection {
            target: target.to_string(),
            step,
            detail,
        };

        let output = self
            .runner
            .run(invocation)
            .await
            .map_err(|e| failure(format!("`{}`: {}", invocation.command_line(), e)))?;

        if !output.success {
            let code = output
                .code
                .map_or_else(|| "a signal".to_string(), |c| format!("code {}", c));
            return Err(failure(format!(
                "`{}` exited with {}: {}",
                invocation.command_line(),
                code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    fn git(&self, cwd: &Path) -> Invocation {
        Invocation::new(self.tools.git.clone(), cwd)
    }

    fn gh(&self, cwd: &Path) -> Invocation {
        Invocation::new(self.tools.gh.clone(), cwd)
    }

    /// True when `path` lies inside a git working tree.
    pub async fn is_work_tree(&self, path: &Path) -> bool {
        let check = self.git(path).args(["rev-parse", "--is-inside-work-tree"]);
        matches!(self.runner.run(&check).await, Ok(out) if out.success && out.stdout.trim() == "true")
    }

    /// Put `repo`'s target branch at its upstream tip before collecting.
    pub async fn prepare_repository(&self, repo: Repo, path: &Path) -> Result<(), CollectError> {
        let target = repo.tag();
        info!(repo = %repo, branch = repo.target_branch(), "updating target branch");
        self.checkout_ref(target, Step::Prepare, path, repo.target_branch())
            .await?;
        self.run_step(target, Step::Prepare, &self.git(path).arg("pull"))
            .await?;
        Ok(())
    }

    /// Leave `repo`'s working tree on its target branch again.
    pub async fn restore_repository(&self, repo: Repo, path: &Path) -> Result<(), CollectError> {
        debug!(repo = %repo, branch = repo.target_branch(), "restoring target branch");
        self.checkout_ref(repo.tag(), Step::Restore, path, repo.target_branch())
            .await
    }

    pub async fn checkout_ref(
        &self,
        target: &str,
        step: Step,
        path: &Path,
        git_ref: &str,
    ) -> Result<(), CollectError> {
        self.run_step(target, step, &self.git(path).args(["checkout", git_ref]))
            .await?;
        Ok(())
    }

    /// Populate `record` with metrics for the pull request, checked out in
    /// the working copy at `repo_path`.
    ///
    /// The record is only written once every step succeeded.
    #[instrument(skip_all, fields(pr = %record.label()))]
    pub async fn collect(
        &self,
        record: &mut PullRequestRecord,
        repo_path: &Path,
        savings: &SavingsProvider,
    ) -> Result<(), CollectError> {
        let label = record.label();

        self.run_step(
            &label,
            Step::Checkout,
            &self.gh(repo_path).args(["pr", "checkout", record.number.as_str()]),
        )
        .await?;

        let view = self.fetch_metadata(&label, &record.number, repo_path).await?;
        let files = view.ported_files();
        let divergence = self
            .divergence(&label, repo_path, record.repo.target_branch(), &files)
            .await?;
        let bytes_saved = savings.bytes_saved(self, record, repo_path).await?;

        let metrics = Metrics {
            commits: view.commits.len() as u64,
            files_count: files.len() as u64,
            files,
            lines_changed: view.additions + view.deletions,
            divergence,
            bytes_saved,
        };
        debug!(
            commits = metrics.commits,
            files = metrics.files_count,
            lines_changed = metrics.lines_changed,
            divergence = metrics.divergence,
            bytes_saved = metrics.bytes_saved.total(),
            "collected metrics"
        );

        record.title = view.title;
        record.metrics = metrics;
        Ok(())
    }

    async fn fetch_metadata(
        &self,
        label: &str,
        number: &str,
        repo_path: &Path,
    ) -> Result<PrView, CollectError> {
        let query = self.gh(repo_path).args([
            "pr",
            "view",
            number,
            "--json",
            "files,commits,additions,deletions,title",
        ]);
        let json = self.run_step(label, Step::Metadata, &query).await?;
        PrView::parse(&json).map_err(|e| CollectError::data_format(label, Step::Metadata, e))
    }

    /// Sum of added and removed lines between HEAD and the target branch tip,
    /// over `files` only.
    async fn divergence(
        &self,
        label: &str,
        repo_path: &Path,
        branch: &str,
        files: &[String],
    ) -> Result<u64, CollectError> {
        let range = format!("HEAD..{}", branch);
        let mut total = 0;
        for file in files {
            let diff = self.git(repo_path).args([
                "diff",
                "--shortstat",
                range.as_str(),
                "--",
                file.as_str(),
            ]);
            let summary = self.run_step(label, Step::Diff, &diff).await?;
            let stat = DiffStat::parse(&summary)
                .map_err(|e| CollectError::data_format(label, Step::Diff, e))?;
            total += stat.total();
        }
        Ok(total)
    }
}
