//! Class inventory report types and terminal formatting.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Per-class object counts across a corpus.
///
/// Only named objects enter `total_named` and the percentages; objects with
/// a missing or empty `<name>` are reported separately as `unlabeled`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClassInventory {
    /// Classes sorted by count descending, then name.
    pub entries: Vec<ClassCount>,
    /// Sum of all entry counts.
    pub total_named: usize,
    /// Objects without a class name.
    pub unlabeled: usize,
    /// Annotation files parsed successfully.
    pub files_scanned: usize,
    /// Files that could not be parsed.
    pub skipped_files: Vec<SkippedFile>,
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// One row of the inventory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassCount {
    pub class_name: String,
    pub count: usize,
    /// Share of `total_named`, in percent.
    pub percentage: f64,
}

/// A file left out of the inventory.
#[derive(Clone, Debug, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub message: String,
}

impl ClassInventory {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassCount> {
        self.entries
            .iter()
            .find(|entry| entry.class_name == class_name)
    }
}

impl fmt::Display for ClassInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Class inventory: {} class(es), {} named object(s) in {} file(s)",
            self.entries.len(),
            self.total_named,
            self.files_scanned
        )?;

        if self.entries.is_empty() {
            writeln!(f, "  No named objects found.")?;
        } else {
            let name_width = self
                .entries
                .iter()
                .map(|entry| entry.class_name.len())
                .max()
                .unwrap_or(0)
                .max("Class".len());

            writeln!(
                f,
                "  {:<name_width$}  {:>11}  {:>10}",
                "Class", "Total Count", "Percentage"
            )?;
            for entry in &self.entries {
                writeln!(
                    f,
                    "  {:<name_width$}  {:>11}  {:>9.1}%  {}",
                    entry.class_name,
                    entry.count,
                    entry.percentage,
                    bar(entry.percentage, self.bar_width)
                )?;
            }
        }

        if self.unlabeled > 0 {
            writeln!(
                f,
                "  ({} unlabeled object(s) not counted)",
                self.unlabeled
            )?;
        }

        for skipped in &self.skipped_files {
            writeln!(
                f,
                "  skipped {}: {}",
                skipped.path.display(),
                skipped.message
            )?;
        }

        Ok(())
    }
}

fn bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage / 100.0) * width as f64).round() as usize;
    "#".repeat(filled.min(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_classes_with_percentages() {
        let inventory = ClassInventory {
            entries: vec![
                ClassCount {
                    class_name: "cat".to_string(),
                    count: 2,
                    percentage: 200.0 / 3.0,
                },
                ClassCount {
                    class_name: "dog".to_string(),
                    count: 1,
                    percentage: 100.0 / 3.0,
                },
            ],
            total_named: 3,
            unlabeled: 1,
            files_scanned: 2,
            skipped_files: vec![],
            bar_width: 20,
        };

        let text = inventory.to_string();
        assert!(text.contains("2 class(es), 3 named object(s) in 2 file(s)"));
        assert!(text.contains("66.7%"));
        assert!(text.contains("33.3%"));
        assert!(text.contains("1 unlabeled object(s)"));
    }

    #[test]
    fn empty_inventory_says_so() {
        let text = ClassInventory::default().to_string();
        assert!(text.contains("No named objects found."));
    }

    #[test]
    fn bar_is_capped_at_width() {
        assert_eq!(bar(100.0, 10).len(), 10);
        assert_eq!(bar(50.0, 10).len(), 5);
        assert_eq!(bar(0.0, 10).len(), 0);
    }
}
