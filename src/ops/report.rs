//! Batch report types.
//!
//! Batch operations never stop at the first bad file. Everything that was
//! skipped lands here as an issue, next to the counts of what was done.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A report generated by one batch operation over a corpus.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    /// Operation name ("rename", "copy", "crops").
    pub operation: String,
    /// Annotation files visited.
    pub files_scanned: usize,
    /// Objects renamed, copied or cropped.
    pub objects_affected: usize,
    /// Files written, in the order they were written.
    pub outputs: Vec<PathBuf>,
    /// Per-file or per-object problems that were skipped over.
    pub issues: Vec<BatchIssue>,
}

/// Why something was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    /// The annotation file could not be parsed.
    Parse,
    /// One object's geometry could not be read.
    MalformedObject,
    /// A paired image or other input is missing.
    MissingResource,
    /// Nothing in the file matched the selection.
    EmptyResult,
    /// Reading an image or writing an output failed.
    Io,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueKind::Parse => "parse error",
            IssueKind::MalformedObject => "malformed object",
            IssueKind::MissingResource => "missing resource",
            IssueKind::EmptyResult => "no match",
            IssueKind::Io => "io error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchIssue {
    pub kind: IssueKind,
    pub path: PathBuf,
    pub message: String,
}

impl BatchReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Record an issue and log it.
    pub fn add(&mut self, kind: IssueKind, path: &Path, message: impl Into<String>) {
        let message = message.into();
        match kind {
            IssueKind::EmptyResult => log::debug!("{}: {message}", path.display()),
            _ => log::warn!("{} ({kind}): {message}", path.display()),
        }
        self.issues.push(BatchIssue {
            kind,
            path: path.to_path_buf(),
            message,
        });
    }

    pub fn record_output(&mut self, path: PathBuf) {
        log::debug!("wrote {}", path.display());
        self.outputs.push(path);
    }

    pub fn files_written(&self) -> usize {
        self.outputs.len()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    /// Issues other than "nothing matched".
    pub fn problem_count(&self) -> usize {
        self.issues.len() - self.count(IssueKind::EmptyResult)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} file(s) scanned, {} object(s) affected, {} file(s) written",
            self.operation,
            self.files_scanned,
            self.objects_affected,
            self.files_written()
        )?;

        let skipped = self.count(IssueKind::EmptyResult);
        if skipped > 0 {
            writeln!(f, "  {skipped} file(s) had no matching objects")?;
        }

        let problems: Vec<&BatchIssue> = self
            .issues
            .iter()
            .filter(|issue| issue.kind != IssueKind::EmptyResult)
            .collect();
        if !problems.is_empty() {
            writeln!(f, "  Skipped ({}):", problems.len())?;
            for issue in problems {
                writeln!(
                    f,
                    "    - [{}] {}: {}",
                    issue.kind,
                    issue.path.display(),
                    issue.message
                )?;
            }
        }

        Ok(())
    }
}
