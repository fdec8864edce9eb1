use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use super::report::{BatchReport, IssueKind};
use crate::corpus::{Corpus, CorpusEntry};
use crate::error::CurateError;
use crate::voc::{write_atomic, AnnotationFile, AnnotationObject};

/// Pixels added on every side of a box before cropping.
pub const DEFAULT_CROP_MARGIN: u32 = 50;

/// Options for classification crop export.
#[derive(Clone, Debug)]
pub struct CropOptions {
    pub margin: u32,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            margin: DEFAULT_CROP_MARGIN,
        }
    }
}

/// Crop every selected object out of its image into
/// `output_dir/<class_name>/`, building a classification dataset.
///
/// Crops are named
/// `<image_dir_basename>_<image_stem>_<class>_<xmin>_<ymin>_<xmax>_<ymax>.jpg`
/// using the unexpanded box rounded to integers. Annotations without a paired
/// image are skipped.
pub fn export_crops(
    corpus: &Corpus,
    output_dir: &Path,
    selected: &BTreeSet<String>,
    opts: &CropOptions,
) -> Result<BatchReport, CurateError> {
    let image_dir = corpus.image_dir().ok_or_else(|| {
        CurateError::missing(corpus.xml_dir(), "crop export needs an image directory")
    })?;
    if selected.is_empty() {
        return Err(CurateError::InvalidArgument {
            message: "select at least one class to export".to_string(),
        });
    }

    fs::create_dir_all(output_dir)?;
    let dir_label = dir_basename(image_dir);
    let mut report = BatchReport::new("crops");

    for entry in corpus.entries() {
        let Some(image_path) = entry.image_path.as_deref() else {
            report.add(
                IssueKind::MissingResource,
                &entry.xml_path,
                "no paired image; skipped",
            );
            continue;
        };

        let file = match AnnotationFile::parse(&entry.xml_path) {
            Ok(file) => file,
            Err(err) => {
                report.add(IssueKind::Parse, &entry.xml_path, err.to_string());
                continue;
            }
        };
        report.files_scanned += 1;

        for malformed in file.malformed() {
            if malformed
                .class_name()
                .is_some_and(|name| selected.contains(name))
            {
                report.add(
                    IssueKind::MalformedObject,
                    &entry.xml_path,
                    format!("object {}: {}", malformed.id(), malformed.reason()),
                );
            }
        }

        let targets: Vec<&AnnotationObject> = file
            .objects()
            .iter()
            .filter(|object| object.is_class_in(selected))
            .collect();
        if targets.is_empty() {
            report.add(
                IssueKind::EmptyResult,
                &entry.xml_path,
                "no objects of the selected classes",
            );
            continue;
        }

        let image = match image::open(image_path) {
            Ok(image) => image,
            Err(err) => {
                report.add(IssueKind::Io, image_path, err.to_string());
                continue;
            }
        };

        for object in targets {
            match save_crop(&image, object, entry, image_path, &dir_label, output_dir, opts) {
                Ok(Some(path)) => {
                    report.objects_affected += 1;
                    report.record_output(path);
                }
                Ok(None) => report.add(
                    IssueKind::MalformedObject,
                    &entry.xml_path,
                    format!("object {} has an empty crop window", object.id()),
                ),
                Err(err) => report.add(IssueKind::Io, &entry.xml_path, err.to_string()),
            }
        }
    }

    log::info!(
        "exported {} crop(s) to {}",
        report.objects_affected,
        output_dir.display()
    );
    Ok(report)
}

/// The crop file name for one object.
pub fn crop_file_name(dir_label: &str, image_stem: &str, class_name: &str, rounded: [i64; 4]) -> String {
    let [xmin, ymin, xmax, ymax] = rounded;
    format!("{dir_label}_{image_stem}_{class_name}_{xmin}_{ymin}_{xmax}_{ymax}.jpg")
}

fn save_crop(
    image: &DynamicImage,
    object: &AnnotationObject,
    entry: &CorpusEntry,
    image_path: &Path,
    dir_label: &str,
    output_dir: &Path,
    opts: &CropOptions,
) -> Result<Option<PathBuf>, CurateError> {
    let Some(class_name) = object.class_name() else {
        return Ok(None);
    };

    let bbox = object.bbox();
    let window = bbox.expand_clamped(f64::from(opts.margin), image.width(), image.height());
    if window.is_empty() {
        return Ok(None);
    }

    let crop = image
        .crop_imm(window.x0, window.y0, window.width(), window.height())
        .to_rgb8();

    let class_component = path_component(class_name);
    let class_dir = output_dir.join(&class_component);
    fs::create_dir_all(&class_dir)?;

    let image_stem = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.stem.clone());
    let path = class_dir.join(crop_file_name(
        dir_label,
        &path_component(&image_stem),
        &class_component,
        bbox.rounded(),
    ));

    let mut bytes = Vec::new();
    crop.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .map_err(|source| CurateError::Image {
            path: path.clone(),
            source,
        })?;
    write_atomic(&path, &bytes)?;

    Ok(Some(path))
}

fn dir_basename(dir: &Path) -> String {
    dir.file_name()
        .map(ToOwned::to_owned)
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|abs| abs.file_name().map(ToOwned::to_owned))
        })
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string())
}

/// Class names become directory and file name parts.
fn path_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}
