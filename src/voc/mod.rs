//! Pascal VOC annotation store.
//!
//! One XML file per image, holding an `<annotation>` root with any number of
//! `<object>` children:
//!
//! ```text
//! <annotation>
//!   <filename>...</filename>
//!   <object>
//!     <name>class_name</name>
//!     <bndbox><xmin/><ymin/><xmax/><ymax/></bndbox>
//!     <conf>0.0-1.0</conf>
//!   </object>
//! </annotation>
//! ```
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use std::path::Path;
//! use voccurate::voc::AnnotationFile;
//!
//! let xml = "<annotation><object><name>cat</name>\
//!     <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox>\
//!     </object></annotation>";
//! let mut file = AnnotationFile::parse_str(xml, Path::new("a.xml")).unwrap();
//!
//! let old: BTreeSet<String> = ["cat".to_string()].into();
//! file.rename_classes(&old, "feline");
//! assert!(file.to_xml_string().contains("<name>feline</name>"));
//! ```

mod bbox;
mod document;

pub use bbox::{BBox, PixelWindow};
pub(crate) use document::write_atomic;
#[cfg(feature = "fuzzing")]
pub use document::fuzz_parse_object;
pub use document::{AnnotationFile, AnnotationObject, MalformedObject, ObjectId};
