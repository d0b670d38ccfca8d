pub mod types;

pub use types::{Report, ReportRow};

use crate::pr::{PullRequestRecord, Repo};
use crate::score::{self, Maxima};
use crate::size::Size;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a ranked Report from scored records. Records without a score are
/// left out.
pub fn build(records: &[PullRequestRecord], maxima: &Maxima, baseline: Option<Size>) -> Report {
    let rows = score::rank(records)
        .into_iter()
        .filter_map(|position| {
            let record = &records[position];
            let score = record.score?;
            Some(ReportRow {
                position,
                repo: record.repo,
                number: record.number.clone(),
                score,
                commits: record.metrics.commits,
                files_count: record.metrics.files_count,
                files: record.metrics.files.clone(),
                lines_changed: record.metrics.lines_changed,
                divergence: record.metrics.divergence,
                bytes_saved: record.metrics.bytes_saved,
                group: record.group.clone(),
                description: record.description.clone().or_else(|| record.title.clone()),
            })
        })
        .collect();

    Report {
        rows,
        maxima: *maxima,
        baseline,
    }
}

/// Print the ranked table to stdout, optionally preceded by the raw metrics,
/// and write a markdown copy when `output_path` is set.
#[instrument(skip(report), fields(rows = report.rows.len()))]
pub fn output(report: &Report, details: bool, output_path: Option<&Path>) -> Result<(), ReportError> {
    if details {
        print!("{}", render_details(report));
    }
    print!("{}", render_table(report, true));

    if let Some(path) = output_path {
        debug!(path = %path.display(), "writing report to file");
        write_markdown_report(report, path)?;
    }
    Ok(())
}

/// One line per pull request, `<repo-tag>/<number>: <score>`, best first.
fn render_table(report: &Report, color: bool) -> String {
    let mut out = String::new();
    for row in &report.rows {
        let label = format!("{}:", row.label());
        let score = format!("{:.3}", row.score);
        let score = if color {
            colorize_score(row.score, &score).to_string()
        } else {
            score
        };
        out.push_str(&format!("{:<30}{}\n", label, score));
    }
    out
}

/// Raw metrics of each partition followed by the batch maxima.
fn render_details(report: &Report) -> String {
    let mut out = String::new();
    for (heading, repo) in [("Primary PRs:", Repo::Primary), ("Restricted PRs:", Repo::Restricted)] {
        out.push_str(heading);
        out.push('\n');
        for row in report.partition(repo) {
            out.push_str(&format!(
                "  PR: {}, Commits: {}, Files: {}, Lines changed: {}, Diff: {}, Bytes saved: {}\n",
                row.number,
                row.commits,
                row.files_count,
                row.lines_changed,
                row.divergence,
                row.bytes_saved.total()
            ));
            if !row.files.is_empty() {
                out.push_str(&format!("    {}\n", row.files.join(", ")));
            }
        }
    }

    let m = &report.maxima;
    out.push_str(&format!(
        "Max Commits: {}, Max Files: {}, Max Lines changed: {}, Max Diff: {}, Max Bytes saved: {}\n",
        m.commits,
        m.files_count,
        m.lines_changed,
        m.divergence,
        m.bytes_saved.total()
    ));
    if let Some(baseline) = report.baseline {
        out.push_str(&format!("Baseline size: {}\n", baseline));
    }
    out.push('\n');
    out
}

/// Write the ranked table with its raw metrics as a markdown file.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str("# Port cost ranking\n\n");
    if let Some(baseline) = report.baseline {
        md.push_str(&format!("**Baseline size:** {}\n\n", baseline));
    }

    md.push_str("| Rank | Pull request | Score | Commits | Files | Lines changed | Divergence | Bytes saved | Group | Description |\n");
    md.push_str("|---:|---|---:|---:|---:|---:|---:|---:|---|---|\n");
    for (rank, row) in report.rows.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {:.3} | {} | {} | {} | {} | {} | {} | {} |\n",
            rank + 1,
            row.label(),
            row.score,
            row.commits,
            row.files_count,
            row.lines_changed,
            row.divergence,
            row.bytes_saved.total(),
            row.group.as_deref().unwrap_or(""),
            row.description.as_deref().unwrap_or("").replace('|', "\\|"),
        ));
    }

    std::fs::write(path, md)?;
    Ok(())
}

/// Worth porting when the savings outweigh the average cost.
fn colorize_score(score: f64, text: &str) -> colored::ColoredString {
    if score >= 1.0 {
        text.green().bold()
    } else if score >= 0.0 {
        text.yellow()
    } else {
        text.red()
    }
}
