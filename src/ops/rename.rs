use std::collections::BTreeSet;

use super::report::{BatchReport, IssueKind};
use crate::corpus::Corpus;
use crate::error::CurateError;
use crate::voc::AnnotationFile;

/// Rename every object whose class is in `old_names` to `new_name`, across
/// the whole corpus, rewriting the annotation files in place.
///
/// Files without a matching object are left untouched on disk. `new_name`
/// is trimmed, since surrounding whitespace in `<name>` is ignored on read.
pub fn rename_corpus(
    corpus: &Corpus,
    old_names: &BTreeSet<String>,
    new_name: &str,
) -> Result<BatchReport, CurateError> {
    let new_name = new_name.trim();
    if old_names.is_empty() || new_name.is_empty() {
        return Err(CurateError::InvalidArgument {
            message: "rename needs at least one old class name and a non-empty new name"
                .to_string(),
        });
    }

    let mut report = BatchReport::new("rename");

    for entry in corpus.entries() {
        let mut file = match AnnotationFile::parse(&entry.xml_path) {
            Ok(file) => file,
            Err(err) => {
                report.add(IssueKind::Parse, &entry.xml_path, err.to_string());
                continue;
            }
        };
        report.files_scanned += 1;

        let renamed = file.rename_classes(old_names, new_name);
        if renamed == 0 {
            continue;
        }

        if let Err(err) = file.save(&entry.xml_path) {
            report.add(IssueKind::Io, &entry.xml_path, err.to_string());
            continue;
        }

        log::info!(
            "class names in {} updated from {:?} to {new_name}",
            entry.xml_path.display(),
            old_names
        );
        report.objects_affected += renamed;
        report.record_output(entry.xml_path.clone());
    }

    Ok(report)
}
