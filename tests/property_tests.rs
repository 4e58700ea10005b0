//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

mod common;

use block_replicate::{
    is_block_dir, BlockFilter, BlockId, LabelMatcher, LabelSelector, ReplicationScheme,
};
use common::{RecordingStore, TestBlock};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

// =============================================================================
// Block ID Properties
// =============================================================================

proptest! {
    /// Display then parse returns the same id
    #[test]
    fn block_id_string_roundtrip(value in any::<u128>()) {
        let id = BlockId::from_u128(value);
        let s = id.to_string();
        prop_assert_eq!(s.len(), 26);
        prop_assert_eq!(s.parse::<BlockId>().unwrap(), id);
    }

    /// Lowercase input parses to the same id
    #[test]
    fn block_id_parse_case_insensitive(value in any::<u128>()) {
        let id = BlockId::from_u128(value);
        prop_assert_eq!(id.to_string().to_lowercase().parse::<BlockId>().unwrap(), id);
    }

    /// Numeric order equals lexical order of the canonical string
    #[test]
    fn block_id_order_matches_string_order(a in any::<u128>(), b in any::<u128>()) {
        let (ida, idb) = (BlockId::from_u128(a), BlockId::from_u128(b));
        prop_assert_eq!(ida.cmp(&idb), ida.to_string().cmp(&idb.to_string()));
    }

    /// The timestamp survives encoding and dominates ordering
    #[test]
    fn block_id_timestamp_roundtrip(
        ts in 0u64..(1u64 << 48),
        r1 in any::<u128>(),
        r2 in any::<u128>(),
    ) {
        let id = BlockId::from_parts(ts, r1);
        prop_assert_eq!(id.timestamp_ms(), ts);
        let parsed: BlockId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed.timestamp_ms(), ts);

        if ts > 0 {
            prop_assert!(BlockId::from_parts(ts - 1, r2) < id);
        }
    }

    /// Parsing arbitrary input never panics
    #[test]
    fn block_id_parse_never_panics(s in "\\PC{0,40}") {
        let _ = s.parse::<BlockId>();
        let _ = is_block_dir(&s);
    }

    /// Directory listings with or without trailing slash are recognised
    #[test]
    fn is_block_dir_accepts_listing_forms(value in any::<u128>(), prefix in "[a-z]{0,8}") {
        let id = BlockId::from_u128(value);
        prop_assert_eq!(is_block_dir(&id.to_string()), Some(id));
        prop_assert_eq!(is_block_dir(&format!("{}/", id)), Some(id));
        if !prefix.is_empty() {
            prop_assert_eq!(is_block_dir(&format!("{}/{}/", prefix, id)), Some(id));
        }
        prop_assert_eq!(is_block_dir(&format!("{}/meta.json", id)), None);
    }
}

// =============================================================================
// Label Selection Properties
// =============================================================================

proptest! {
    /// A matcher's display form parses back to the same matcher
    #[test]
    fn matcher_display_roundtrip(
        name in "[a-zA-Z_][a-zA-Z0-9_]{0,15}",
        value in "[a-zA-Z0-9 ._\\-\"\\\\]{0,20}",
    ) {
        let matcher = LabelMatcher::new(name, value);
        let parsed = LabelMatcher::parse(&matcher.to_string()).unwrap();
        prop_assert_eq!(parsed, matcher);
    }

    /// Any subset of a block's own labels selects it
    #[test]
    fn selector_from_own_labels_matches(
        labels in prop::collection::btree_map("[a-z_]{1,8}", "[a-z0-9-]{0,8}", 0..6),
        keep in any::<u64>(),
    ) {
        let matchers: Vec<LabelMatcher> = labels
            .iter()
            .enumerate()
            .filter(|(i, _)| keep & (1 << i) != 0)
            .map(|(_, (k, v))| LabelMatcher::new(k.clone(), v.clone()))
            .collect();
        prop_assert!(LabelSelector::new(matchers).matches(&labels));
    }

    /// Changing one matched label's value deselects the block
    #[test]
    fn selector_rejects_changed_value(
        labels in prop::collection::btree_map("[a-z_]{1,8}", "[a-z0-9-]{0,8}", 1..6),
    ) {
        let (name, value) = labels.iter().next().map(|(k, v)| (k.clone(), v.clone())).unwrap();
        let mut changed: BTreeMap<String, String> = labels.clone();
        changed.insert(name.clone(), format!("{}x", value));
        let selector = LabelSelector::new(vec![LabelMatcher::new(name, value)]);
        prop_assert!(selector.matches(&labels));
        prop_assert!(!selector.matches(&changed));
    }
}

// =============================================================================
// Replication Ordering Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Descriptors reach the target in ascending min_time order, each after
    /// every other object of its block
    #[test]
    fn replication_follows_min_time_order(
        min_times in prop::collection::vec(0i64..1_000_000, 1..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let from = Arc::new(RecordingStore::new("origin"));
            let to = Arc::new(RecordingStore::new("target"));
            let blocks: Vec<TestBlock> = min_times
                .iter()
                .enumerate()
                .map(|(i, &t)| TestBlock::new(i as u64 + 1, t, "eu-1").with_chunks(i % 3 + 1))
                .collect();
            for block in &blocks {
                block.write(&from).await;
            }

            let (_tx, rx) = watch::channel(false);
            let scheme = ReplicationScheme::new(from.clone(), to.clone(), BlockFilter::default());
            let stats = scheme.execute(&rx).await.unwrap();
            assert_eq!(stats.blocks_replicated as usize, blocks.len());

            let uploads = to.uploads();
            let pos = |key: &str| uploads.iter().position(|k| k == key).unwrap();

            let mut order: Vec<&TestBlock> = blocks.iter().collect();
            order.sort_by_key(|b| pos(&b.id.meta_path()));
            let times: Vec<i64> = order.iter().map(|b| b.meta.min_time).collect();
            let mut sorted = times.clone();
            sorted.sort();
            assert_eq!(times, sorted);

            for block in &blocks {
                let meta_pos = pos(&block.id.meta_path());
                for key in block.keys() {
                    assert!(pos(&key) <= meta_pos, "{} uploaded after descriptor", key);
                }
            }

            assert_eq!(to.objects().await, from.objects().await);
        });
    }
}
