//! Fuzz target for block id parsing.
//!
//! Parsing must never panic, and anything that parses must print back to
//! its canonical (uppercase) form and re-parse to the same id.

#![no_main]

use block_replicate::{is_block_dir, BlockId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(id) = data.parse::<BlockId>() {
        let canonical = id.to_string();
        assert_eq!(canonical, data.to_ascii_uppercase());
        assert_eq!(canonical.parse::<BlockId>().ok(), Some(id));
    }

    // Listing entries of any shape
    let _ = is_block_dir(data);
});
