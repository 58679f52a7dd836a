//! Provenance captured when a record is created.
//!
//! # Responsibility
//! - Describe the source-control state a record was produced from.
//! - Probe a working directory for that state without ever failing.
//!
//! # Invariants
//! - A probe returns an empty `SourceControl` when no repository is found or
//!   any probing step fails.
//! - `SourceControl` always serializes as a mapping, possibly empty.

mod git;

pub use git::GitProbe;

use crate::model::value::{FieldValue, Fields};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const REPO_NAME_KEY: &str = "repo_name";
pub const BRANCH_KEY: &str = "branch";
pub const COMMIT_KEY: &str = "commit";

/// Repository name, branch and short commit hash of a working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl SourceControl {
    pub fn is_empty(&self) -> bool {
        self.repo_name.is_none() && self.branch.is_none() && self.commit.is_none()
    }

    /// Generic mapping view with absent entries omitted.
    pub fn to_fields(&self) -> Fields {
        [
            (REPO_NAME_KEY, &self.repo_name),
            (BRANCH_KEY, &self.branch),
            (COMMIT_KEY, &self.commit),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| (key.to_string(), FieldValue::Text(value.clone())))
        })
        .collect()
    }

    /// Builds from a generic mapping. Returns the offending key when an entry
    /// is unknown or not text.
    pub fn from_fields(fields: &Fields) -> Result<Self, String> {
        let mut source_control = Self::default();
        for (key, value) in fields {
            let slot = match key.as_str() {
                REPO_NAME_KEY => &mut source_control.repo_name,
                BRANCH_KEY => &mut source_control.branch,
                COMMIT_KEY => &mut source_control.commit,
                _ => return Err(key.clone()),
            };
            *slot = match value {
                FieldValue::Text(text) => Some(text.clone()),
                FieldValue::Null => None,
                _ => return Err(key.clone()),
            };
        }
        Ok(source_control)
    }
}

/// Source-control probe seam.
pub trait SourceControlProbe {
    fn probe(&self, dir: &Path) -> SourceControl;
}

/// Probe that never detects anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl SourceControlProbe for NoProbe {
    fn probe(&self, _dir: &Path) -> SourceControl {
        SourceControl::default()
    }
}

/// Probe returning a fixed value regardless of directory.
#[derive(Debug, Clone, Default)]
pub struct FixedProbe(pub SourceControl);

impl SourceControlProbe for FixedProbe {
    fn probe(&self, _dir: &Path) -> SourceControl {
        self.0.clone()
    }
}

/// Path of the running executable, if the platform reports one.
pub fn environment_path() -> Option<String> {
    std::env::current_exe()
        .ok()
        .map(|path| path.display().to_string())
}

/// Directory probed for source control when none is given.
pub(crate) fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
