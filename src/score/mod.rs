use thiserror::Error;
use tracing::debug;

use crate::pr::{Metrics, PullRequestRecord};
use crate::size::Size;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("Cannot normalize {metric}: its maximum across the batch is zero")]
    ZeroMaximum { metric: &'static str },

    #[error("Cannot score {pull_request}: commits, files, lines changed and divergence all normalize to zero")]
    ZeroDenominator { pull_request: String },
}

/// Largest value of each scored metric seen in the batch, updated as records
/// are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Maxima {
    pub commits: u64,
    pub files_count: u64,
    pub lines_changed: u64,
    pub divergence: u64,
    pub bytes_saved: Size,
}

impl Maxima {
    pub fn observe(&mut self, metrics: &Metrics) {
        self.commits = self.commits.max(metrics.commits);
        self.files_count = self.files_count.max(metrics.files_count);
        self.lines_changed = self.lines_changed.max(metrics.lines_changed);
        self.divergence = self.divergence.max(metrics.divergence);
        self.bytes_saved = self.bytes_saved.max(metrics.bytes_saved);
    }

    /// Fails on the first metric whose maximum is zero, in scoring order.
    fn check(&self) -> Result<(), ScoringError> {
        let maxima = [
            ("commits", self.commits as f64),
            ("files", self.files_count as f64),
            ("lines changed", self.lines_changed as f64),
            ("divergence", self.divergence as f64),
            ("bytes saved", self.bytes_saved.total() as f64),
        ];
        match maxima.iter().find(|(_, max)| *max == 0.0) {
            Some((metric, _)) => Err(ScoringError::ZeroMaximum { metric: *metric }),
            None => Ok(()),
        }
    }
}

/// Each metric as a percentage of the batch maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub commits: f64,
    pub files_count: f64,
    pub lines_changed: f64,
    pub divergence: f64,
    pub bytes_saved: f64,
}

pub fn normalize(value: f64, max: f64) -> f64 {
    (value / max) * 100.0
}

impl Normalized {
    /// Callers must have checked that no maximum is zero.
    fn from_metrics(metrics: &Metrics, maxima: &Maxima) -> Self {
        Self {
            commits: normalize(metrics.commits as f64, maxima.commits as f64),
            files_count: normalize(metrics.files_count as f64, maxima.files_count as f64),
            lines_changed: normalize(metrics.lines_changed as f64, maxima.lines_changed as f64),
            divergence: normalize(metrics.divergence as f64, maxima.divergence as f64),
            bytes_saved: normalize(
                metrics.bytes_saved.total() as f64,
                maxima.bytes_saved.total() as f64,
            ),
        }
    }

    /// Bytes saved over the mean of the four cost metrics, equally weighted.
    pub fn score(&self) -> Option<f64> {
        let cost = (self.commits + self.files_count + self.lines_changed + self.divergence) / 4.0;
        if cost == 0.0 {
            return None;
        }
        Some(self.bytes_saved / cost)
    }
}

/// Normalize every record against `maxima` and store its score.
///
/// Either every record gets a score or none does.
pub fn score_records(
    records: &mut [PullRequestRecord],
    maxima: &Maxima,
) -> Result<(), ScoringError> {
    if records.is_empty() {
        return Ok(());
    }
    maxima.check()?;

    let scores = records
        .iter()
        .map(|record| {
            let normalized = Normalized::from_metrics(&record.metrics, maxima);
            debug!(pr = %record.label(), ?normalized, "normalized metrics");
            normalized.score().ok_or_else(|| ScoringError::ZeroDenominator {
                pull_request: record.label(),
            })
        })
        .collect::<Result<Vec<f64>, ScoringError>>()?;

    for (record, score) in records.iter_mut().zip(scores) {
        record.score = Some(score);
    }
    Ok(())
}

/// Batch positions of `records` by score, highest first. Ties keep their
/// batch order.
pub fn rank(records: &[PullRequestRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        let a = records[a].score.unwrap_or(f64::NEG_INFINITY);
        let b = records[b].score.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    order
}
