//! Fuzz target for descriptor and label matcher parsing.
//!
//! Arbitrary bytes as meta.json and arbitrary matcher flags must produce
//! an error or a value, never a panic.

#![no_main]

use block_replicate::{BlockFilter, BlockMeta, LabelMatcher};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&[u8], &str)| {
    let (meta_bytes, matcher) = data;

    if let Ok(meta) = serde_json::from_slice::<BlockMeta>(meta_bytes) {
        // Any parsed descriptor can be evaluated
        let _ = BlockFilter::default().filter(&meta);
    }

    if let Ok(m) = LabelMatcher::parse(matcher) {
        assert_eq!(LabelMatcher::parse(&m.to_string()).ok(), Some(m));
    }
});
