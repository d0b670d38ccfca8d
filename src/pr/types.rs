use crate::size::Size;

/// Which repository a pull request was opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repo {
    Primary,
    Restricted,
}

impl Repo {
    /// Branch the pull request would be ported onto.
    pub fn target_branch(&self) -> &'static str {
        match self {
            Repo::Primary => "development",
            Repo::Restricted => "development-restricted",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Repo::Primary => "primary",
            Repo::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raw counters gathered for one pull request.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Number of commits in the pull request
    pub commits: u64,
    /// Changed files, changelog entries excluded
    pub files_count: u64,
    /// Paths of the changed files, changelog entries excluded
    pub files: Vec<String>,
    /// Additions + deletions reported by the code host
    pub lines_changed: u64,
    /// Added + removed lines between the pull request and the target branch tip,
    /// summed over `files`
    pub divergence: u64,
    /// Size reduction relative to the baseline build (negative if it grew)
    pub bytes_saved: Size,
}

/// One pull request of the batch: what the input said about it, what was
/// collected, and its score once the whole batch has been scored.
#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    pub repo: Repo,
    /// Bare pull request number, prefix stripped (e.g. "1234")
    pub number: String,
    /// Free-text description from the input table
    pub description: Option<String>,
    /// Grouping tag from the input table
    pub group: Option<String>,
    /// Byte savings supplied by the input table
    pub supplied_savings: Option<i64>,
    /// Title reported by the code host
    pub title: Option<String>,
    pub metrics: Metrics,
    /// Only meaningful relative to the other records of the same batch
    pub score: Option<f64>,
}

impl PullRequestRecord {
    pub fn new(repo: Repo, number: impl Into<String>) -> Self {
        Self {
            repo,
            number: number.into(),
            description: None,
            group: None,
            supplied_savings: None,
            title: None,
            metrics: Metrics::default(),
            score: None,
        }
    }

    /// `<repo-tag>/<number>`, the name used in logs, errors and the report.
    pub fn label(&self) -> String {
        format!("{}/{}", self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_branches() {
        assert_eq!(Repo::Primary.target_branch(), "development");
        assert_eq!(Repo::Restricted.target_branch(), "development-restricted");
    }

    #[test]
    fn test_record_label() {
        let record = PullRequestRecord::new(Repo::Restricted, "567");
        assert_eq!(record.label(), "restricted/567");
        assert!(record.score.is_none());
    }
}
