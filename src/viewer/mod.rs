//! Single-pair annotation viewer and editor.
//!
//! A [`ViewerSession`] holds one image and its annotation file. The
//! transitions are:
//!
//! - [`ViewerSession::select`] highlights one object by its index in
//!   [`ViewerSession::objects`].
//! - [`ViewerSession::delete_selected`] removes the highlighted object, saves
//!   the annotation file and clears the selection. Indices after the removed
//!   object shift down by one, so callers must select again.
//! - [`ViewerSession::delete_pair`] deletes both files, annotation first,
//!   and consumes the session.
//!
//! The confidence threshold only affects what is drawn. Objects without a
//! confidence value are always drawn.

mod render;

pub use render::{draw_overlays, load_font, BoxOverlay, RenderStyle};

use std::fs;

use ab_glyph::FontVec;
use image::{DynamicImage, RgbImage};

use crate::corpus::ImagePair;
use crate::error::CurateError;
use crate::voc::{AnnotationFile, AnnotationObject};

/// Initial confidence threshold of a new session.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

pub struct ViewerSession {
    pair: ImagePair,
    file: AnnotationFile,
    image: DynamicImage,
    selected: Option<usize>,
    confidence_threshold: f64,
}

impl ViewerSession {
    /// Load the pair's annotation file and image.
    pub fn open(pair: ImagePair) -> Result<Self, CurateError> {
        if !pair.image_path.is_file() {
            return Err(CurateError::missing(
                &pair.image_path,
                "image file does not exist",
            ));
        }

        let file = AnnotationFile::parse(&pair.xml_path)?;
        for malformed in file.malformed() {
            log::warn!(
                "{}: object {} not shown: {}",
                pair.xml_path.display(),
                malformed.id(),
                malformed.reason()
            );
        }

        let image = image::open(&pair.image_path).map_err(|source| CurateError::Image {
            path: pair.image_path.clone(),
            source,
        })?;

        Ok(Self {
            pair,
            file,
            image,
            selected: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        })
    }

    pub fn pair(&self) -> &ImagePair {
        &self.pair
    }

    pub fn file(&self) -> &AnnotationFile {
        &self.file
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn objects(&self) -> &[AnnotationObject] {
        self.file.objects()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&AnnotationObject> {
        self.selected.and_then(|index| self.objects().get(index))
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) -> Result<(), CurateError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CurateError::InvalidThreshold(threshold));
        }
        self.confidence_threshold = threshold;
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<(), CurateError> {
        let len = self.objects().len();
        if index >= len {
            return Err(CurateError::InvalidSelection { index, len });
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Whether an object passes the confidence filter.
    pub fn is_visible(&self, object: &AnnotationObject) -> bool {
        object
            .confidence()
            .is_none_or(|confidence| confidence >= self.confidence_threshold)
    }

    /// Boxes to draw, in object order.
    pub fn overlays(&self) -> Vec<BoxOverlay> {
        self.objects()
            .iter()
            .enumerate()
            .filter(|(_, object)| self.is_visible(object))
            .map(|(index, object)| BoxOverlay {
                index,
                bbox: object.bbox(),
                label: object.class_name().map(str::to_string),
                selected: self.selected == Some(index),
            })
            .collect()
    }

    pub fn render(&self, style: &RenderStyle, font: Option<&FontVec>) -> RgbImage {
        draw_overlays(&self.image, &self.overlays(), style, font)
    }

    /// One line per object, numbered from 1.
    pub fn annotation_lines(&self) -> Vec<String> {
        self.objects()
            .iter()
            .enumerate()
            .map(|(index, object)| {
                let bbox = object.bbox();
                let confidence = object
                    .confidence()
                    .map(|confidence| format!(", Confidence: {confidence}"))
                    .unwrap_or_default();
                format!(
                    "{}. Class: {}, BBox: {:?}{}",
                    index + 1,
                    object.class_name().unwrap_or("(none)"),
                    [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax],
                    confidence
                )
            })
            .collect()
    }

    /// Remove the selected object and persist the annotation file.
    ///
    /// The in-memory state only changes once the file has been written.
    pub fn delete_selected(&mut self) -> Result<AnnotationObject, CurateError> {
        let index = self.selected.ok_or(CurateError::NothingSelected)?;
        let len = self.objects().len();
        let id = self
            .objects()
            .get(index)
            .map(AnnotationObject::id)
            .ok_or(CurateError::InvalidSelection { index, len })?;

        let mut updated = self.file.clone();
        let removed = updated
            .remove_object(id)
            .ok_or(CurateError::InvalidSelection { index, len })?;
        updated.save(&self.pair.xml_path)?;

        log::info!(
            "deleted object {} ({}) from {}",
            index,
            removed.class_name().unwrap_or("(none)"),
            self.pair.xml_path.display()
        );
        self.file = updated;
        self.selected = None;
        Ok(removed)
    }

    /// Delete the annotation file, then the image.
    ///
    /// If the image cannot be removed after the annotation file is gone, the
    /// error names both paths.
    pub fn delete_pair(self) -> Result<ImagePair, CurateError> {
        fs::remove_file(&self.pair.xml_path)?;
        fs::remove_file(&self.pair.image_path).map_err(|source| {
            CurateError::PairPartiallyDeleted {
                deleted: self.pair.xml_path.clone(),
                remaining: self.pair.image_path.clone(),
                source,
            }
        })?;
        log::info!(
            "deleted {} and {}",
            self.pair.image_path.display(),
            self.pair.xml_path.display()
        );
        Ok(self.pair)
    }
}
