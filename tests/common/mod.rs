#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::RgbImage;

/// One `<object>` to put in a fixture file.
pub struct Obj<'a> {
    pub name: &'a str,
    pub bbox: [f64; 4],
    pub conf: Option<f64>,
}

pub fn obj(name: &str, bbox: [f64; 4]) -> Obj<'_> {
    Obj {
        name,
        bbox,
        conf: None,
    }
}

pub fn predicted(name: &str, bbox: [f64; 4], conf: f64) -> Obj<'_> {
    Obj {
        name,
        bbox,
        conf: Some(conf),
    }
}

pub fn voc_xml(filename: &str, objects: &[Obj<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<annotation>\n  <folder>images</folder>\n  <filename>{filename}</filename>\n  <source>\n    <database>Unknown</database>\n  </source>\n  <size>\n    <width>640</width>\n    <height>480</height>\n    <depth>3</depth>\n  </size>\n  <segmented>0</segmented>\n"
    );
    for object in objects {
        let [xmin, ymin, xmax, ymax] = object.bbox;
        xml.push_str(&format!(
            "  <object>\n    <name>{}</name>\n    <pose>Unspecified</pose>\n    <bndbox>\n      <xmin>{xmin}</xmin>\n      <ymin>{ymin}</ymin>\n      <xmax>{xmax}</xmax>\n      <ymax>{ymax}</ymax>\n    </bndbox>\n",
            object.name
        ));
        if let Some(conf) = object.conf {
            xml.push_str(&format!("    <conf>{conf}</conf>\n"));
        }
        xml.push_str("  </object>\n");
    }
    xml.push_str("</annotation>\n");
    xml
}

pub fn write_voc(dir: &Path, stem: &str, objects: &[Obj<'_>]) {
    fs::create_dir_all(dir).expect("create annotation dir");
    fs::write(
        dir.join(format!("{stem}.xml")),
        voc_xml(&format!("{stem}.jpg"), objects),
    )
    .expect("write xml file");
}

pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]))
        .save(path)
        .expect("write image file");
}

pub fn object_names(path: &Path) -> Vec<String> {
    let file = voccurate::voc::AnnotationFile::parse(path).expect("parse annotation file");
    file.objects()
        .iter()
        .map(|object| object.class_name().unwrap_or_default().to_string())
        .collect()
}
