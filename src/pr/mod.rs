pub mod input;
pub mod types;

pub use types::{Metrics, PullRequestRecord, Repo};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{0}: No such file or directory")]
    MissingPath(PathBuf),

    #[error("{0} is not a file")]
    NotAFile(PathBuf),

    #[error("{0} is not a path to a git repository")]
    NotARepository(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pull request table {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Pull request table {0} lists no pull requests")]
    Empty(PathBuf),

    #[error(
        "Pull request identifiers must start with '#' (primary repository) or 'r' (restricted repository); {0:?} begins with neither"
    )]
    UnknownPrefix(String),

    #[error("Pull request identifier {0:?} has no number")]
    InvalidNumber(String),

    #[error("{0} has no byte savings in the input table; use the build savings source")]
    MissingSavings(String),
}

/// Split an identifier such as `#1234` or `r567` into its repository and
/// bare number.
pub fn parse_identifier(raw: &str) -> Result<(Repo, String), InputError> {
    let id = raw.trim();
    let repo = match id.chars().next() {
        Some('#') => Repo::Primary,
        Some('r') => Repo::Restricted,
        _ => return Err(InputError::UnknownPrefix(id.to_string())),
    };

    let number = id.trim_start_matches(|c: char| !c.is_ascii_digit());
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(InputError::InvalidNumber(id.to_string()));
    }

    Ok((repo, number.to_string()))
}
