use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use proptest::prelude::*;
use voccurate::corpus::Corpus;
use voccurate::inventory::{build_inventory, InventoryOptions};
use voccurate::voc::AnnotationFile;

mod proptest_helpers;
use proptest_helpers::{arb_class, arb_class_set, arb_objects, render_xml};

fn parse(xml: &str) -> AnnotationFile {
    AnnotationFile::parse_str(xml, Path::new("gen.xml")).expect("generated xml parses")
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn unmodified_save_is_identity(objects in arb_objects(8), compact in any::<bool>()) {
        let xml = render_xml("img.jpg", &objects, compact);
        let file = parse(&xml);
        prop_assert_eq!(file.len(), objects.len());
        prop_assert_eq!(file.to_xml_string(), xml);
    }

    #[test]
    fn parse_preserves_geometry_and_order(objects in arb_objects(8)) {
        let file = parse(&render_xml("img.jpg", &objects, false));
        for (parsed, (class, bbox, conf)) in file.objects().iter().zip(&objects) {
            prop_assert_eq!(parsed.class_name(), Some(class.as_str()));
            let b = parsed.bbox();
            prop_assert_eq!([b.xmin, b.ymin, b.xmax, b.ymax], *bbox);
            prop_assert_eq!(parsed.confidence(), *conf);
        }
    }

    #[test]
    fn rename_is_idempotent(
        objects in arb_objects(8),
        old in arb_class_set(),
        new in arb_class(),
    ) {
        let xml = render_xml("img.jpg", &objects, false);

        let mut once = parse(&xml);
        once.rename_classes(&old, &new);
        let once_xml = once.to_xml_string();

        let mut twice = parse(&once_xml);
        twice.rename_classes(&old, &new);
        prop_assert_eq!(twice.to_xml_string(), once_xml.clone());

        let reparsed = parse(&once_xml);
        prop_assert_eq!(reparsed.len(), objects.len());
        for (parsed, (class, bbox, _)) in reparsed.objects().iter().zip(&objects) {
            let expected = if old.contains(class) { new.as_str() } else { class.as_str() };
            prop_assert_eq!(parsed.class_name(), Some(expected));
            prop_assert_eq!(parsed.bbox().xmin, bbox[0]);
        }
    }

    #[test]
    fn retained_objects_are_an_ordered_subset(
        objects in arb_objects(8),
        selected in arb_class_set(),
        compact in any::<bool>(),
    ) {
        let mut file = parse(&render_xml("img.jpg", &objects, compact));
        let kept = file.retain_classes(&selected);

        let expected: Vec<&str> = objects
            .iter()
            .filter(|(class, _, _)| selected.contains(class))
            .map(|(class, _, _)| class.as_str())
            .collect();
        prop_assert_eq!(kept, expected.len());

        let reparsed = parse(&file.to_xml_string());
        let names: Vec<&str> = reparsed.objects().iter().filter_map(|o| o.class_name()).collect();
        prop_assert_eq!(names, expected);
        prop_assert!(reparsed.to_xml_string().contains("<segmented>0</segmented>"));
    }

    #[test]
    fn removing_one_object_drops_exactly_one(objects in arb_objects(8), pick in any::<prop::sample::Index>()) {
        prop_assume!(!objects.is_empty());
        let mut file = parse(&render_xml("img.jpg", &objects, false));
        let index = pick.index(objects.len());
        let id = file.objects()[index].id();
        file.remove_object(id);

        let reparsed = parse(&file.to_xml_string());
        prop_assert_eq!(reparsed.len(), objects.len() - 1);
    }

    #[test]
    fn inventory_percentages_sum_to_100(files in proptest::collection::vec(arb_objects(6), 1..5)) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let mut expected: BTreeMap<String, usize> = BTreeMap::new();
        for (i, objects) in files.iter().enumerate() {
            fs::write(
                temp.path().join(format!("f{i}.xml")),
                render_xml(&format!("f{i}.jpg"), objects, false),
            )
            .expect("write xml");
            for (class, _, _) in objects {
                *expected.entry(class.clone()).or_insert(0) += 1;
            }
        }

        let corpus = Corpus::open(temp.path(), None).expect("open corpus");
        let inventory = build_inventory(&corpus, &InventoryOptions::default());

        let counted: BTreeMap<String, usize> = inventory
            .entries
            .iter()
            .map(|e| (e.class_name.clone(), e.count))
            .collect();
        prop_assert_eq!(&counted, &expected);

        if !inventory.is_empty() {
            let sum: f64 = inventory.entries.iter().map(|e| e.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 1e-9);
        }
        let classes: BTreeSet<String> = expected.keys().cloned().collect();
        prop_assert_eq!(classes.len(), inventory.entries.len());
    }
}
