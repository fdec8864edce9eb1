//! Fuzz target for VOC XML parsing and serialization.
//!
//! Feeds arbitrary bytes to the annotation parser; whatever parses must
//! serialize back to exactly the input, and survive removing its first object.

#![no_main]

use libfuzzer_sys::fuzz_target;
use voccurate::voc::AnnotationFile;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(mut file) = AnnotationFile::parse_slice(data) else {
        return;
    };
    assert_eq!(file.to_xml_string().as_bytes(), data);

    if let Some(id) = file.objects().first().map(|object| object.id()) {
        file.remove_object(id);
        let _ = AnnotationFile::parse_str(&file.to_xml_string(), std::path::Path::new("<fuzz>"));
    }
});
