//! Git-backed source-control probe.

use super::{SourceControl, SourceControlProbe};
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

/// Probes a directory by invoking the `git` executable.
#[derive(Debug, Clone)]
pub struct GitProbe {
    program: String,
}

impl Default for GitProbe {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitProbe {
    /// Uses a specific `git` executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn rev_parse(&self, dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(dir)
            .arg("rev-parse")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8(output.stdout).ok()?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl SourceControlProbe for GitProbe {
    fn probe(&self, dir: &Path) -> SourceControl {
        let Some(toplevel) = self.rev_parse(dir, &["--show-toplevel"]) else {
            debug!(
                "event=source_control_probe module=provenance status=skipped dir={}",
                dir.display()
            );
            return SourceControl::default();
        };

        let repo_name = match Path::new(&toplevel).file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => toplevel.clone(),
        };

        // A fresh repository has no HEAD yet; keep the name and skip the rest.
        let branch = self.rev_parse(dir, &["--abbrev-ref", "HEAD"]);
        let commit = self.rev_parse(dir, &["--short", "HEAD"]);

        debug!(
            "event=source_control_probe module=provenance status=ok has_commit={}",
            commit.is_some()
        );
        SourceControl {
            repo_name: Some(repo_name),
            branch,
            commit,
        }
    }
}
