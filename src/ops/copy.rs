use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::report::{BatchReport, IssueKind};
use crate::corpus::Corpus;
use crate::error::CurateError;
use crate::voc::AnnotationFile;

/// Write a filtered copy of every annotation file into `output_dir`.
///
/// Each copy keeps all non-object content of the original and only the
/// objects whose class is in `selected`, in their original order. Files left
/// with no object are not written.
pub fn copy_filtered(
    corpus: &Corpus,
    output_dir: &Path,
    selected: &BTreeSet<String>,
) -> Result<BatchReport, CurateError> {
    if selected.is_empty() {
        return Err(CurateError::InvalidArgument {
            message: "select at least one class to copy".to_string(),
        });
    }

    fs::create_dir_all(output_dir)?;
    if same_directory(corpus.xml_dir(), output_dir) {
        return Err(CurateError::InvalidArgument {
            message: format!(
                "output directory {} is the annotation directory; copies would overwrite the originals",
                output_dir.display()
            ),
        });
    }

    let mut report = BatchReport::new("copy");

    for entry in corpus.entries() {
        let mut file = match AnnotationFile::parse(&entry.xml_path) {
            Ok(file) => file,
            Err(err) => {
                report.add(IssueKind::Parse, &entry.xml_path, err.to_string());
                continue;
            }
        };
        report.files_scanned += 1;

        let kept = file.retain_classes(selected);
        if kept == 0 {
            report.add(
                IssueKind::EmptyResult,
                &entry.xml_path,
                "no objects of the selected classes",
            );
            continue;
        }

        let output_path = output_dir.join(entry.file_name());
        if let Err(err) = file.save(&output_path) {
            report.add(IssueKind::Io, &output_path, err.to_string());
            continue;
        }

        report.objects_affected += kept;
        report.record_output(output_path);
    }

    log::info!(
        "copied {} file(s) with selected classes to {}",
        report.files_written(),
        output_dir.display()
    );
    Ok(report)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
