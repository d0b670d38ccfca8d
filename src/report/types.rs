use crate::pr::Repo;
use crate::score::Maxima;
use crate::size::Size;

/// One scored pull request as shown in the report.
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// Position in the batch (primary partition first)
    pub position: usize,
    pub repo: Repo,
    pub number: String,
    pub score: f64,
    pub commits: u64,
    pub files_count: u64,
    /// Counted paths, changelog entries excluded
    pub files: Vec<String>,
    pub lines_changed: u64,
    pub divergence: u64,
    pub bytes_saved: Size,
    pub group: Option<String>,
    /// Input description, or the host's title when the input had none
    pub description: Option<String>,
}

impl ReportRow {
    pub fn label(&self) -> String {
        format!("{}/{}", self.repo, self.number)
    }
}

/// Ranked scores of one batch.
#[derive(Debug)]
pub struct Report {
    /// Highest score first
    pub rows: Vec<ReportRow>,
    pub maxima: Maxima,
    /// Size of the reference build, when sizes were measured
    pub baseline: Option<Size>,
}

impl Report {
    /// Rows of one repository in batch order.
    pub fn partition(&self, repo: Repo) -> Vec<&ReportRow> {
        let mut rows: Vec<&ReportRow> = self.rows.iter().filter(|r| r.repo == repo).collect();
        rows.sort_by_key(|r| r.position);
        rows
    }
}
