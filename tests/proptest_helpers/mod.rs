#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const CLASS_POOL: &[&str] = &["cat", "dog", "car", "person", "bird"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// (class, bbox, confidence) for one generated object.
pub type GenObject = (String, [f64; 4], Option<f64>);

pub fn arb_class() -> impl Strategy<Value = String> {
    proptest::sample::select(CLASS_POOL).prop_map(str::to_string)
}

pub fn arb_object() -> impl Strategy<Value = GenObject> {
    (
        arb_class(),
        (0.0f64..500.0, 0.0f64..500.0, 1.0f64..200.0, 1.0f64..200.0),
        proptest::option::of(0.0f64..=1.0),
    )
        .prop_map(|(class, (x, y, w, h), conf)| (class, [x, y, x + w, y + h], conf))
}

pub fn arb_objects(max: usize) -> impl Strategy<Value = Vec<GenObject>> {
    proptest::collection::vec(arb_object(), 0..=max)
}

pub fn arb_class_set() -> impl Strategy<Value = std::collections::BTreeSet<String>> {
    proptest::collection::btree_set(arb_class(), 1..=3)
}

/// A VOC document with varied formatting between elements.
pub fn render_xml(filename: &str, objects: &[GenObject], compact: bool) -> String {
    let (nl, i1, i2) = if compact { ("", "", "") } else { ("\n", "  ", "    ") };
    let mut xml = format!(
        "<?xml version=\"1.0\"?>{nl}<annotation>{nl}{i1}<filename>{filename}</filename>{nl}{i1}<size><width>640</width><height>480</height></size>{nl}"
    );
    for (class, [xmin, ymin, xmax, ymax], conf) in objects {
        xml.push_str(&format!(
            "{i1}<object>{nl}{i2}<name>{class}</name>{nl}{i2}<bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox>{nl}"
        ));
        if let Some(conf) = conf {
            xml.push_str(&format!("{i2}<conf>{conf}</conf>{nl}"));
        }
        xml.push_str(&format!("{i1}</object>{nl}"));
    }
    xml.push_str(&format!("{i1}<!-- trailing metadata -->{nl}{i1}<segmented>0</segmented>{nl}</annotation>{nl}"));
    xml
}
