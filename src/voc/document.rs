//! Pascal VOC annotation documents.
//!
//! An [`AnnotationFile`] keeps the original XML text together with the byte
//! spans of every `<object>` element. Renames and removals are recorded
//! against those spans and spliced in when the document is serialized, so
//! every byte outside an edited object is written back exactly as it was read.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::ops::Range;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::BBox;
use crate::error::CurateError;

/// Stable handle for an `<object>` element: its ordinal among the object
/// elements of the document as it was parsed.
///
/// Handles never shift when other objects are removed. A handle whose object
/// has been removed simply no longer resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
struct ObjectSpan {
    /// The element plus the whitespace run that indents it.
    removal: Range<usize>,
    /// The whole `<name>` element, when one is present.
    name_element: Option<Range<usize>>,
    original_name: Option<String>,
}

/// One well-formed detected instance.
#[derive(Clone, Debug)]
pub struct AnnotationObject {
    id: ObjectId,
    class_name: Option<String>,
    bbox: BBox,
    confidence: Option<f64>,
    span: ObjectSpan,
}

impl AnnotationObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// `None` when `<name>` is missing or empty.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Present only for model-predicted objects (`<conf>`).
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn is_class_in(&self, classes: &BTreeSet<String>) -> bool {
        self.class_name
            .as_ref()
            .is_some_and(|name| classes.contains(name))
    }
}

/// An `<object>` whose geometry could not be read.
///
/// It is left untouched in the document. Operations that only need the class
/// name (listing, counting, renaming, filtering) still see it; operations that
/// need the box skip it.
#[derive(Clone, Debug)]
pub struct MalformedObject {
    id: ObjectId,
    class_name: Option<String>,
    reason: String,
    span: ObjectSpan,
}

impl MalformedObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn is_class_in(&self, classes: &BTreeSet<String>) -> bool {
        self.class_name
            .as_ref()
            .is_some_and(|name| classes.contains(name))
    }
}

/// A parsed annotation file.
///
/// Nothing is written back implicitly; call [`AnnotationFile::save`].
#[derive(Clone, Debug)]
pub struct AnnotationFile {
    path: PathBuf,
    source: String,
    objects: Vec<AnnotationObject>,
    malformed: Vec<MalformedObject>,
    removed: Vec<Range<usize>>,
}

impl AnnotationFile {
    /// Read and parse an annotation file.
    pub fn parse(path: &Path) -> Result<Self, CurateError> {
        let xml = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CurateError::missing(path, "annotation file does not exist")
            } else {
                CurateError::Io(source)
            }
        })?;
        Self::parse_str(&xml, path)
    }

    /// Parse annotation XML held in memory; `path` is used for messages and
    /// as the default save location.
    pub fn parse_str(xml: &str, path: &Path) -> Result<Self, CurateError> {
        let document = roxmltree::Document::parse(xml)
            .map_err(|source| CurateError::xml_parse(path, source.to_string()))?;

        let annotation = document.root_element();
        if annotation.tag_name().name() != "annotation" {
            return Err(CurateError::xml_parse(
                path,
                format!(
                    "missing <annotation> root element (found <{}>)",
                    annotation.tag_name().name()
                ),
            ));
        }

        let mut objects = Vec::new();
        let mut malformed = Vec::new();

        for (ordinal, object) in annotation
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "object")
            .enumerate()
        {
            let id = ObjectId(ordinal);
            let span = object_span(object);
            let class_name = span.original_name.clone();

            match parse_geometry(object) {
                Ok((bbox, confidence)) => objects.push(AnnotationObject {
                    id,
                    class_name,
                    bbox,
                    confidence,
                    span,
                }),
                Err(reason) => malformed.push(MalformedObject {
                    id,
                    class_name,
                    reason,
                    span,
                }),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            source: xml.to_string(),
            objects,
            malformed,
            removed: Vec::new(),
        })
    }

    /// Parse annotation XML from bytes. The input must be valid UTF-8.
    pub fn parse_slice(bytes: &[u8]) -> Result<Self, CurateError> {
        let path = Path::new("<memory>");
        let xml = std::str::from_utf8(bytes).map_err(|source| {
            CurateError::xml_parse(path, format!("input is not valid UTF-8: {source}"))
        })?;
        Self::parse_str(xml, path)
    }

    /// Where the file was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Well-formed objects in document order.
    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    /// Objects skipped because their geometry was missing or unreadable.
    pub fn malformed(&self) -> &[MalformedObject] {
        &self.malformed
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of `<object>` elements still in the document, malformed ones
    /// included.
    pub fn element_count(&self) -> usize {
        self.objects.len() + self.malformed.len()
    }

    pub fn object(&self, id: ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Class name of every object element, `None` for unnamed ones.
    pub fn class_names(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.objects
            .iter()
            .map(AnnotationObject::class_name)
            .chain(self.malformed.iter().map(MalformedObject::class_name))
    }

    /// Distinct class names present in the document.
    pub fn list_classes(&self) -> BTreeSet<String> {
        self.class_names().flatten().map(str::to_string).collect()
    }

    /// Rename every object whose class is in `old_names` to `new_name`.
    ///
    /// Returns how many objects matched. Boxes, confidences and object order
    /// are untouched.
    pub fn rename_classes(&mut self, old_names: &BTreeSet<String>, new_name: &str) -> usize {
        let mut renamed = 0;

        for class_name in self
            .objects
            .iter_mut()
            .map(|object| &mut object.class_name)
            .chain(self.malformed.iter_mut().map(|object| &mut object.class_name))
        {
            if class_name
                .as_ref()
                .is_some_and(|name| old_names.contains(name))
            {
                *class_name = Some(new_name.to_string());
                renamed += 1;
            }
        }

        renamed
    }

    /// Remove the identified object from the list and from the document.
    ///
    /// Returns `None` without error when the handle does not resolve, e.g.
    /// because the object was already removed.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<AnnotationObject> {
        let position = self.objects.iter().position(|object| object.id == id)?;
        let object = self.objects.remove(position);
        self.removed.push(object.span.removal.clone());
        Some(object)
    }

    /// Drop every object element whose class is not in `selected`, including
    /// unnamed and malformed ones. Returns the number of elements kept.
    pub fn retain_classes(&mut self, selected: &BTreeSet<String>) -> usize {
        let removed = &mut self.removed;

        self.objects.retain(|object| {
            let keep = object.is_class_in(selected);
            if !keep {
                removed.push(object.span.removal.clone());
            }
            keep
        });
        self.malformed.retain(|object| {
            let keep = object.is_class_in(selected);
            if !keep {
                removed.push(object.span.removal.clone());
            }
            keep
        });

        self.element_count()
    }

    /// True when serializing would produce something other than the source.
    pub fn is_modified(&self) -> bool {
        !self.removed.is_empty() || self.pending_renames().next().is_some()
    }

    /// Serialize the current state of the document.
    pub fn to_xml_string(&self) -> String {
        let mut edits: Vec<(Range<usize>, Option<String>)> = self
            .removed
            .iter()
            .cloned()
            .map(|range| (range, None))
            .collect();
        edits.extend(
            self.pending_renames()
                .map(|(range, name)| (range, Some(format!("<name>{}</name>", xml_escape(name))))),
        );
        edits.sort_by_key(|(range, _)| range.start);

        let mut xml = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, replacement) in edits {
            xml.push_str(&self.source[cursor..range.start]);
            if let Some(text) = replacement {
                xml.push_str(&text);
            }
            cursor = range.end;
        }
        xml.push_str(&self.source[cursor..]);
        xml
    }

    /// Write the document to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), CurateError> {
        write_atomic(path, self.to_xml_string().as_bytes())
    }

    fn pending_renames(&self) -> impl Iterator<Item = (Range<usize>, &str)> + '_ {
        self.objects
            .iter()
            .map(|object| (&object.span, object.class_name.as_deref()))
            .chain(
                self.malformed
                    .iter()
                    .map(|object| (&object.span, object.class_name.as_deref())),
            )
            .filter_map(|(span, current)| {
                let current = current?;
                let range = span.name_element.clone()?;
                (span.original_name.as_deref() != Some(current)).then_some((range, current))
            })
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory,
/// so readers never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CurateError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // The temp file is created owner-only; give the result the permissions
    // of the file it replaces, or of a freshly created file.
    let (permissions, placeholder) = match fs::metadata(path) {
        Ok(metadata) => (metadata.permissions(), false),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)?;
            (created.metadata()?.permissions(), true)
        }
        Err(err) => return Err(err.into()),
    };

    let result = replace_with(parent, path, contents, permissions);
    if result.is_err() && placeholder {
        let _ = fs::remove_file(path);
    }
    result
}

fn replace_with(
    parent: &Path,
    path: &Path,
    contents: &[u8],
    permissions: fs::Permissions,
) -> Result<(), CurateError> {
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|err| CurateError::Io(err.error))?;
    Ok(())
}

fn object_span(object: Node<'_, '_>) -> ObjectSpan {
    let range = object.range();
    let start = object
        .prev_sibling()
        .filter(|prev| prev.is_text() && prev.text().is_some_and(|text| text.trim().is_empty()))
        .map(|prev| prev.range().start)
        .unwrap_or(range.start);

    let name = child_element(object, "name");

    ObjectSpan {
        removal: start..range.end,
        name_element: name.map(|node| node.range()),
        original_name: optional_child_text(object, "name"),
    }
}

fn parse_geometry(object: Node<'_, '_>) -> Result<(BBox, Option<f64>), String> {
    let bndbox = child_element(object, "bndbox").ok_or("missing <bndbox> in <object>")?;

    let xmin = parse_required_f64(bndbox, "xmin")?;
    let ymin = parse_required_f64(bndbox, "ymin")?;
    let xmax = parse_required_f64(bndbox, "xmax")?;
    let ymax = parse_required_f64(bndbox, "ymax")?;

    let confidence = optional_child_text(object, "conf")
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| format!("invalid <conf> value '{raw}'; expected floating-point number"))
        })
        .transpose()?;

    Ok((BBox::from_xyxy(xmin, ymin, xmax, ymax), confidence))
}

/// Fuzz-only entrypoint for single `<object>` geometry parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_object(input: &str) -> Result<(), CurateError> {
    let path = Path::new("<fuzz>");
    let document = roxmltree::Document::parse(input)
        .map_err(|source| CurateError::xml_parse(path, source.to_string()))?;
    let object = document.root_element();
    let _ = object_span(object);
    parse_geometry(object).map_err(|reason| CurateError::xml_parse(path, reason))?;
    Ok(())
}

fn parse_required_f64(node: Node<'_, '_>, tag: &str) -> Result<f64, String> {
    let raw = optional_child_text(node, tag).ok_or_else(|| format!("missing <{tag}> in <bndbox>"))?;
    raw.parse::<f64>().map_err(|_| {
        format!("invalid <{tag}> value '{raw}' in <bndbox>; expected floating-point number")
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <folder>JPEGImages</folder>
  <filename>img1.jpg</filename>
  <size>
    <width>640</width>
    <height>480</height>
    <depth>3</depth>
  </size>
  <object>
    <name>cat</name>
    <bndbox>
      <xmin>10</xmin>
      <ymin>20</ymin>
      <xmax>30</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
  <object>
    <name>dog</name>
    <bndbox>
      <xmin>50.5</xmin>
      <ymin>60</ymin>
      <xmax>70</xmax>
      <ymax>80</ymax>
    </bndbox>
    <conf>0.25</conf>
  </object>
</annotation>
"#;

    fn sample() -> AnnotationFile {
        AnnotationFile::parse_str(SAMPLE, Path::new("sample.xml")).expect("parse sample")
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn parse_extracts_boxes_and_confidence() {
        let file = sample();
        assert_eq!(file.len(), 2);
        assert_eq!(file.objects()[0].class_name(), Some("cat"));
        assert_eq!(
            file.objects()[0].bbox(),
            BBox::from_xyxy(10.0, 20.0, 30.0, 40.0)
        );
        assert_eq!(file.objects()[0].confidence(), None);
        assert_eq!(file.objects()[1].bbox().xmin, 50.5);
        assert_eq!(file.objects()[1].confidence(), Some(0.25));
        assert!(file.malformed().is_empty());
    }

    #[test]
    fn unmodified_document_serializes_byte_for_byte() {
        let file = sample();
        assert!(!file.is_modified());
        assert_eq!(file.to_xml_string(), SAMPLE);
    }

    #[test]
    fn rename_rewrites_only_the_name_element() {
        let mut file = sample();
        assert_eq!(file.rename_classes(&set(&["cat", "kitten"]), "feline"), 1);

        let xml = file.to_xml_string();
        assert_eq!(xml, SAMPLE.replace("<name>cat</name>", "<name>feline</name>"));
    }

    #[test]
    fn rename_escapes_markup() {
        let mut file = sample();
        file.rename_classes(&set(&["dog"]), "cats & dogs");
        assert!(file
            .to_xml_string()
            .contains("<name>cats &amp; dogs</name>"));
    }

    #[test]
    fn rename_back_to_original_is_not_a_modification() {
        let mut file = sample();
        file.rename_classes(&set(&["cat"]), "tmp");
        file.rename_classes(&set(&["tmp"]), "cat");
        assert!(!file.is_modified());
    }

    #[test]
    fn remove_object_drops_element_and_indentation() {
        let mut file = sample();
        let cat = file.objects()[0].id();
        let removed = file.remove_object(cat).expect("object exists");
        assert_eq!(removed.class_name(), Some("cat"));
        assert_eq!(file.len(), 1);

        let xml = file.to_xml_string();
        assert!(!xml.contains("<name>cat</name>"));
        assert!(xml.contains("  </size>\n  <object>\n    <name>dog</name>"));

        let reparsed = AnnotationFile::parse_str(&xml, Path::new("sample.xml")).expect("reparse");
        assert_eq!(reparsed.len(), 1);
    }

    #[test]
    fn remove_with_stale_handle_is_a_no_op() {
        let mut file = sample();
        let cat = file.objects()[0].id();
        assert!(file.remove_object(cat).is_some());
        assert!(file.remove_object(cat).is_none());
        assert_eq!(file.len(), 1);
    }

    #[test]
    fn handles_survive_removal_of_earlier_objects() {
        let mut file = sample();
        let cat = file.objects()[0].id();
        let dog = file.objects()[1].id();
        file.remove_object(cat);
        assert_eq!(file.object(dog).and_then(|o| o.class_name()), Some("dog"));
    }

    #[test]
    fn missing_bndbox_marks_object_malformed() {
        let xml = r#"<annotation>
  <object><name>cat</name></object>
  <object><name>dog</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>
</annotation>"#;
        let file = AnnotationFile::parse_str(xml, Path::new("m.xml")).expect("parse");
        assert_eq!(file.len(), 1);
        assert_eq!(file.malformed().len(), 1);
        assert_eq!(file.malformed()[0].class_name(), Some("cat"));
        assert!(file.malformed()[0].reason().contains("<bndbox>"));
        assert_eq!(file.list_classes(), set(&["cat", "dog"]));
    }

    #[test]
    fn empty_name_is_unnamed() {
        let xml = r#"<annotation>
  <object><name>  </name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>
  <object><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>
</annotation>"#;
        let mut file = AnnotationFile::parse_str(xml, Path::new("n.xml")).expect("parse");
        assert_eq!(file.len(), 2);
        assert!(file.list_classes().is_empty());
        assert_eq!(file.rename_classes(&set(&[""]), "x"), 0);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = AnnotationFile::parse_str("<annotation><object>", Path::new("bad.xml"))
            .expect_err("should fail");
        assert!(matches!(err, CurateError::XmlParse { .. }));
    }

    #[test]
    fn wrong_root_is_a_parse_error() {
        let err = AnnotationFile::parse_str("<dataset/>", Path::new("bad.xml"))
            .expect_err("should fail");
        assert!(err.to_string().contains("<annotation>"));
    }

    #[test]
    fn retain_classes_keeps_selected_only() {
        let mut file = sample();
        assert_eq!(file.retain_classes(&set(&["dog"])), 1);
        let xml = file.to_xml_string();
        assert!(xml.contains("<filename>img1.jpg</filename>"));
        assert!(!xml.contains("<name>cat</name>"));
        assert!(xml.contains("<name>dog</name>"));
    }

    #[test]
    fn save_writes_whole_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("out.xml");
        fs::write(&path, "stale").expect("seed file");

        let mut file = sample();
        let dog = file.objects()[1].id();
        file.remove_object(dog);
        file.save(&path).expect("save");

        let reparsed = AnnotationFile::parse(&path).expect("reparse");
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed.objects()[0].class_name(), Some("cat"));
    }

    #[cfg(feature = "fuzzing")]
    #[test]
    fn fuzz_entrypoint_checks_object_geometry() {
        assert!(fuzz_parse_object("<object><name>cat</name></object>").is_err());
        assert!(fuzz_parse_object(
            "<object><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>"
        )
        .is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_permissions_of_replaced_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("shared.xml");
        fs::write(&path, SAMPLE).expect("seed file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        let mut file = AnnotationFile::parse(&path).expect("parse");
        file.rename_classes(&set(&["cat"]), "feline");
        file.save(&path).expect("save");

        let mode = fs::metadata(&path).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn save_gives_new_files_default_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let reference = temp.path().join("reference.xml");
        fs::write(&reference, "").expect("create reference file");
        let path = temp.path().join("new.xml");

        sample().save(&path).expect("save");

        let mode = |p: &Path| fs::metadata(p).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
        assert_eq!(
            fs::read_to_string(&path).expect("read back"),
            sample().to_xml_string()
        );
    }
}
