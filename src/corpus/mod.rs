//! Annotation corpus discovery.
//!
//! A corpus is the flat set of `.xml` files in one directory. Each annotation
//! is paired with the image in the image directory that has the same base
//! filename and a `.jpg`, `.jpeg` or `.png` extension (any case).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CurateError;

const VOC_XML_EXTENSION: &str = "xml";

/// Image extensions accepted for pairing, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One annotation file, with its paired image when one exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusEntry {
    pub xml_path: PathBuf,
    pub stem: String,
    pub image_path: Option<PathBuf>,
}

impl CorpusEntry {
    /// The annotation's file name, e.g. `img_001.xml`.
    pub fn file_name(&self) -> String {
        self.xml_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{VOC_XML_EXTENSION}", self.stem))
    }
}

/// An image and its annotation, as browsed by the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePair {
    pub image_path: PathBuf,
    pub xml_path: PathBuf,
}

impl ImagePair {
    pub fn image_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct Corpus {
    xml_dir: PathBuf,
    image_dir: Option<PathBuf>,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Scan `xml_dir` (and `image_dir`, when given) once.
    ///
    /// Entries are ordered by annotation file name.
    pub fn open(xml_dir: &Path, image_dir: Option<&Path>) -> Result<Self, CurateError> {
        if !xml_dir.is_dir() {
            return Err(CurateError::missing(
                xml_dir,
                "annotation directory does not exist",
            ));
        }

        let images = match image_dir {
            Some(dir) if !dir.is_dir() => {
                return Err(CurateError::missing(dir, "image directory does not exist"));
            }
            Some(dir) => collect_images(dir)?,
            None => BTreeMap::new(),
        };

        let entries = collect_xml_files(xml_dir)?
            .into_iter()
            .map(|xml_path| {
                let stem = file_stem(&xml_path);
                let image_path = images.get(&stem).cloned();
                CorpusEntry {
                    xml_path,
                    stem,
                    image_path,
                }
            })
            .collect();

        Ok(Self {
            xml_dir: xml_dir.to_path_buf(),
            image_dir: image_dir.map(Path::to_path_buf),
            entries,
        })
    }

    pub fn xml_dir(&self) -> &Path {
        &self.xml_dir
    }

    pub fn image_dir(&self) -> Option<&Path> {
        self.image_dir.as_deref()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Image/annotation pairs sorted by image file name.
    pub fn image_pairs(&self) -> Vec<ImagePair> {
        let mut pairs: Vec<ImagePair> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry.image_path.as_ref().map(|image_path| ImagePair {
                    image_path: image_path.clone(),
                    xml_path: entry.xml_path.clone(),
                })
            })
            .collect();
        pairs.sort_by_cached_key(ImagePair::image_name);
        pairs
    }
}

/// True for files ending in exactly `.xml`.
pub fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == VOC_XML_EXTENSION)
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn collect_xml_files(dir: &Path) -> Result<Vec<PathBuf>, CurateError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_xml_extension(&path) {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| file_name_string(path));

    let mut nested_xml = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(2) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("failed while traversing {}: {err}", dir.display());
                continue;
            }
        };
        if entry.file_type().is_file() && has_xml_extension(entry.path()) {
            nested_xml.push(entry.path().to_path_buf());
        }
    }

    if !nested_xml.is_empty() {
        nested_xml.sort();
        log::warn!(
            "annotation directory is scanned flat; skipping {} nested .xml file(s), e.g. {}",
            nested_xml.len(),
            nested_xml[0].display()
        );
    }

    Ok(files)
}

fn collect_images(dir: &Path) -> Result<BTreeMap<String, PathBuf>, CurateError> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            candidates.push(path);
        }
    }
    candidates.sort_by_cached_key(|path| file_name_string(path));

    let mut images: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in candidates {
        let stem = file_stem(&path);
        if let Some(existing) = images.get(&stem) {
            log::warn!(
                "several images share the stem '{stem}'; pairing {} and ignoring {}",
                existing.display(),
                path.display()
            );
            continue;
        }
        images.insert(stem, path);
    }

    Ok(images)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
