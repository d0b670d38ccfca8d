use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collect::{CollectError, Collector, SavingsProvider};
use crate::pr::{PullRequestRecord, Repo};
use crate::report::{self, Report};
use crate::score::{self, Maxima, ScoringError};
use crate::size::Size;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Cannot move from {from} to {to}")]
    Phase { from: Phase, to: Phase },
}

/// Where a run currently is. Phases only move forward, one at a time;
/// `BaselineEstablished` is passed only when sizes are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    BaselineEstablished,
    Collecting,
    Normalizing,
    Reporting,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::BaselineEstablished => "baseline established",
            Phase::Collecting => "collecting",
            Phase::Normalizing => "normalizing",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Working copies of the two repositories.
#[derive(Debug, Clone)]
pub struct RepoPaths {
    pub primary: PathBuf,
    pub restricted: PathBuf,
}

impl RepoPaths {
    pub fn get(&self, repo: Repo) -> &PathBuf {
        match repo {
            Repo::Primary => &self.primary,
            Repo::Restricted => &self.restricted,
        }
    }
}

/// Every pull request of one run, split by repository, together with the
/// state the stages share: batch maxima, the savings source and its baseline,
/// and the current phase.
#[derive(Debug)]
pub struct PullRequestBatch {
    /// Primary pull requests followed by restricted ones, each in input order
    records: Vec<PullRequestRecord>,
    primary_count: usize,
    maxima: Maxima,
    savings: SavingsProvider,
    phase: Phase,
}

impl PullRequestBatch {
    pub fn new(records: Vec<PullRequestRecord>, savings: SavingsProvider) -> Self {
        let (mut primary, restricted): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.repo == Repo::Primary);
        let primary_count = primary.len();
        primary.extend(restricted);

        Self {
            records: primary,
            primary_count,
            maxima: Maxima::default(),
            savings,
            phase: Phase::Uninitialized,
        }
    }

    pub fn primary(&self) -> &[PullRequestRecord] {
        &self.records[..self.primary_count]
    }

    pub fn restricted(&self) -> &[PullRequestRecord] {
        &self.records[self.primary_count..]
    }

    pub fn maxima(&self) -> &Maxima {
        &self.maxima
    }

    pub fn baseline(&self) -> Option<Size> {
        self.savings.baseline()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn next_phase(&self) -> Option<Phase> {
        let measured = matches!(self.savings, SavingsProvider::Measured { .. });
        match self.phase {
            Phase::Uninitialized if measured => Some(Phase::BaselineEstablished),
            Phase::Uninitialized | Phase::BaselineEstablished => Some(Phase::Collecting),
            Phase::Collecting => Some(Phase::Normalizing),
            Phase::Normalizing => Some(Phase::Reporting),
            Phase::Reporting => Some(Phase::Done),
            Phase::Done => None,
        }
    }

    fn advance(&mut self, to: Phase) -> Result<(), BatchError> {
        if self.next_phase() != Some(to) {
            return Err(BatchError::Phase {
                from: self.phase,
                to,
            });
        }
        debug!(from = %self.phase, to = %to, "phase change");
        self.phase = to;
        Ok(())
    }

    /// Mark the savings baseline as in place. Only valid for measured savings.
    pub fn baseline_established(&mut self) -> Result<(), BatchError> {
        self.advance(Phase::BaselineEstablished)
    }

    /// Collect metrics for every pull request, primary repository first, one
    /// at a time, keeping the batch maxima up to date. Each repository is left
    /// on its target branch once its pull requests are done.
    pub async fn collect(
        &mut self,
        collector: &Collector<'_>,
        paths: &RepoPaths,
    ) -> Result<(), BatchError> {
        self.advance(Phase::Collecting)?;
        info!(
            primary = self.primary().len(),
            restricted = self.restricted().len(),
            "calculating metrics for all pull requests"
        );

        let (primary, restricted) = self.records.split_at_mut(self.primary_count);
        for (repo, records) in [(Repo::Primary, primary), (Repo::Restricted, restricted)] {
            if records.is_empty() {
                continue;
            }
            let path = paths.get(repo);
            let collected =
                collect_partition(collector, records, path, &self.savings, &mut self.maxima).await;

            // Restore even after a failure; the collection error wins.
            let restored = collector.restore_repository(repo, path).await;
            match (collected, restored) {
                (Ok(()), restored) => restored?,
                (Err(e), restored) => {
                    if let Err(restore_error) = restored {
                        warn!(repo = %repo, error = %restore_error, "could not restore target branch");
                    }
                    return Err(e.into());
                }
            }
        }

        debug!(maxima = ?self.maxima, "collected all pull requests");
        Ok(())
    }

    /// Score every record against the batch maxima.
    pub fn score(&mut self) -> Result<(), BatchError> {
        self.advance(Phase::Normalizing)?;
        score::score_records(&mut self.records, &self.maxima)?;
        Ok(())
    }

    /// Ranked report of the scored batch.
    pub fn report(&mut self) -> Result<Report, BatchError> {
        self.advance(Phase::Reporting)?;
        Ok(report::build(&self.records, &self.maxima, self.baseline()))
    }

    pub fn finish(&mut self) -> Result<(), BatchError> {
        self.advance(Phase::Done)
    }
}

async fn collect_partition(
    collector: &Collector<'_>,
    records: &mut [PullRequestRecord],
    path: &Path,
    savings: &SavingsProvider,
    maxima: &mut Maxima,
) -> Result<(), CollectError> {
    for record in records.iter_mut() {
        collector.collect(record, path, savings).await?;
        maxima.observe(&record.metrics);
        info!(pr = %record.label(), "done");
    }
    Ok(())
}
