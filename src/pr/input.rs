use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::types::PullRequestRecord;
use super::{parse_identifier, InputError};

/// Shape of the pull request table the run was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// JSON array of rows carrying byte savings, group and description
    Table,
    /// Bare identifiers, one per line or comma separated
    List,
}

#[derive(Debug)]
pub struct PullRequestList {
    pub format: InputFormat,
    /// Records in input order, both repositories mixed
    pub records: Vec<PullRequestRecord>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(rename = "main PR")]
    main_pr: String,
    #[serde(rename = "Bytes saved")]
    bytes_saved: ByteSavings,
    #[serde(default)]
    group: Option<serde_json::Value>,
    #[serde(rename = "short description", default)]
    description: Option<String>,
}

/// Tables are often exported from spreadsheets, so numbers may arrive quoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ByteSavings {
    Number(i64),
    Text(String),
}

/// Read and parse the pull request table at `path`.
pub fn load(path: &Path) -> Result<PullRequestList, InputError> {
    let contents = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &contents)
}

/// Parse a pull request table. A document starting with `[` or `{` is treated
/// as the JSON table, anything else as a plain identifier list.
pub fn parse(path: &Path, contents: &str) -> Result<PullRequestList, InputError> {
    let list = if contents.trim_start().starts_with(['[', '{']) {
        PullRequestList {
            format: InputFormat::Table,
            records: parse_table(path, contents)?,
        }
    } else {
        PullRequestList {
            format: InputFormat::List,
            records: parse_list(contents)?,
        }
    };

    if list.records.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    debug!(format = ?list.format, records = list.records.len(), "parsed pull request table");
    Ok(list)
}

fn parse_table(path: &Path, contents: &str) -> Result<Vec<PullRequestRecord>, InputError> {
    let malformed = |reason: String| InputError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let rows: Vec<TableRow> =
        serde_json::from_str(contents).map_err(|e| malformed(e.to_string()))?;

    rows.into_iter()
        .map(|row| -> Result<PullRequestRecord, InputError> {
            let (repo, number) = parse_identifier(&row.main_pr)?;
            let savings = match row.bytes_saved {
                ByteSavings::Number(n) => n,
                ByteSavings::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                    malformed(format!(
                        "\"Bytes saved\" of {} is not an integer: {:?}",
                        row.main_pr, text
                    ))
                })?,
            };

            let mut record = PullRequestRecord::new(repo, number);
            record.supplied_savings = Some(savings);
            record.group = row.group.map(|g| match g {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });
            record.description = row.description;
            Ok(record)
        })
        .collect()
}

fn parse_list(contents: &str) -> Result<Vec<PullRequestRecord>, InputError> {
    contents
        .split(|c: char| c == '\n' || c == ',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| -> Result<PullRequestRecord, InputError> {
            let (repo, number) = parse_identifier(id)?;
            Ok(PullRequestRecord::new(repo, number))
        })
        .collect()
}
