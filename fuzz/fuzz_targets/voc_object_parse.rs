//! Fuzz target for single VOC `<object>` parsing.
//!
//! Feeds arbitrary UTF-8 fragments to the object geometry parser, checking
//! for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use voccurate::voc::fuzz_parse_object;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(fragment) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_object(fragment);
});
