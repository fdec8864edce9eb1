//! Class inventory (exploratory counts) over a corpus.

mod report;

pub use report::{ClassCount, ClassInventory, SkippedFile};

use std::collections::{BTreeSet, HashMap};

use crate::corpus::Corpus;
use crate::voc::AnnotationFile;

/// Options for building an inventory.
#[derive(Clone, Debug)]
pub struct InventoryOptions {
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self { bar_width: 20 }
    }
}

/// Count objects per class across every annotation file in the corpus.
///
/// Files that fail to parse are recorded in `skipped_files` and do not stop
/// the scan. A corpus without named objects yields an empty inventory.
pub fn build_inventory(corpus: &Corpus, opts: &InventoryOptions) -> ClassInventory {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut inventory = ClassInventory {
        bar_width: opts.bar_width,
        ..Default::default()
    };

    for entry in corpus.entries() {
        let file = match AnnotationFile::parse(&entry.xml_path) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("skipping {}: {err}", entry.xml_path.display());
                inventory.skipped_files.push(SkippedFile {
                    path: entry.xml_path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        inventory.files_scanned += 1;
        for class_name in file.class_names() {
            match class_name {
                Some(name) => *counts.entry(name.to_string()).or_insert(0) += 1,
                None => inventory.unlabeled += 1,
            }
        }
    }

    let total_named: usize = counts.values().sum();
    inventory.total_named = total_named;

    if total_named == 0 {
        return inventory;
    }

    let mut entries: Vec<ClassCount> = counts
        .into_iter()
        .map(|(class_name, count)| ClassCount {
            class_name,
            count,
            percentage: count as f64 / total_named as f64 * 100.0,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.class_name.cmp(&b.class_name))
    });
    inventory.entries = entries;

    inventory
}

/// Union of class names over the corpus, sorted.
pub fn list_corpus_classes(corpus: &Corpus) -> BTreeSet<String> {
    let mut classes = BTreeSet::new();

    for entry in corpus.entries() {
        match AnnotationFile::parse(&entry.xml_path) {
            Ok(file) => classes.extend(file.list_classes()),
            Err(err) => log::warn!("skipping {}: {err}", entry.xml_path.display()),
        }
    }

    classes
}
