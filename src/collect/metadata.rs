use serde::de::IgnoredAny;
use serde::Deserialize;

use super::FormatError;

/// Changelog entries are administrative and never count as ported code.
pub fn is_changelog(path: &str) -> bool {
    path.starts_with("ChangeLog")
}

/// Response of `gh pr view --json files,commits,additions,deletions,title`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrView {
    pub additions: u64,
    pub deletions: u64,
    pub commits: Vec<IgnoredAny>,
    pub files: Vec<ChangedFile>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangedFile {
    pub path: String,
}

impl PrView {
    pub fn parse(json: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Changed paths with changelog entries dropped, in host order.
    pub fn ported_files(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|f| f.path.as_str())
            .filter(|path| !is_changelog(path))
            .map(str::to_string)
            .collect()
    }
}

/// Line counts from a `git diff --shortstat` summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub insertions: u64,
    pub deletions: u64,
}

impl DiffStat {
    pub fn total(&self) -> u64 {
        self.insertions + self.deletions
    }

    /// Parse e.g. ` 2 files changed, 10 insertions(+), 3 deletions(-)`.
    /// Empty output means the path is identical on both sides.
    pub fn parse(summary: &str) -> Result<Self, FormatError> {
        let mut stat = DiffStat::default();
        for part in summary.trim().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let count = part
                .split_whitespace()
                .next()
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| FormatError::ShortStat(summary.trim().to_string()))?;
            if part.ends_with("(+)") {
                stat.insertions += count;
            } else if part.ends_with("(-)") {
                stat.deletions += count;
            }
        }
        Ok(stat)
    }
}
