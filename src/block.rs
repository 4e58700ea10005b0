// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Block identifiers, object layout and the `meta.json` descriptor.
//!
//! A block lives under a key prefix named after its id:
//!
//! ```text
//! 01HV7Q3T5V0C8X2M9N4R6S1W3Y/
//! ├── chunks/000001 .. chunks/NNNNNN   # chunk data
//! ├── index                            # series index
//! └── meta.json                        # descriptor, written last
//! ```
//!
//! Ids are ULIDs: 48 bits of millisecond timestamp followed by 80 bits of
//! entropy, encoded as 26 characters of Crockford base32. The fixed-width
//! encoding makes lexical order equal numeric order.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Descriptor object name.
pub const META_FILENAME: &str = "meta.json";

/// Index object name.
pub const INDEX_FILENAME: &str = "index";

/// Directory holding chunk objects.
pub const CHUNKS_DIRNAME: &str = "chunks";

/// The only descriptor schema version this engine understands.
pub const META_VERSION_1: u32 = 1;

/// Downsampling resolutions the producer writes, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ResolutionLevel {
    /// Raw, undownsampled data.
    Raw = 0,
    FiveMinutes = 5 * 60 * 1000,
    OneHour = 60 * 60 * 1000,
}

impl ResolutionLevel {
    pub fn millis(self) -> i64 {
        self as i64
    }
}

/// Crockford base32 alphabet.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Encoded length of a ULID.
pub const BLOCK_ID_LEN: usize = 26;

const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1u128 << RANDOM_BITS) - 1;
const MAX_TIMESTAMP_MS: u64 = (1u64 << 48) - 1;

/// Why a string is not a block id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidBlockId {
    #[error("invalid length {0}, expected 26")]
    Length(usize),
    #[error("invalid character {0:?}")]
    Character(char),
    #[error("value overflows 128 bits")]
    Overflow,
}

/// A block identifier (ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockId(u128);

impl BlockId {
    /// Build an id from a millisecond timestamp and entropy.
    ///
    /// The timestamp is truncated to 48 bits and the entropy to 80 bits.
    pub fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        let ts = (timestamp_ms & MAX_TIMESTAMP_MS) as u128;
        Self((ts << RANDOM_BITS) | (random & RANDOM_MASK))
    }

    /// Generate a fresh id for the current wall-clock time.
    pub fn generate() -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::from_parts(now_ms, rand::thread_rng().gen::<u128>())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Millisecond timestamp embedded in the id.
    pub fn timestamp_ms(&self) -> u64 {
        (self.0 >> RANDOM_BITS) as u64
    }

    /// `{id}/meta.json`
    pub fn meta_path(&self) -> String {
        format!("{}/{}", self, META_FILENAME)
    }

    /// `{id}/index`
    pub fn index_path(&self) -> String {
        format!("{}/{}", self, INDEX_FILENAME)
    }

    /// `{id}/chunks`
    pub fn chunks_dir(&self) -> String {
        format!("{}/{}", self, CHUNKS_DIRNAME)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [0u8; BLOCK_ID_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = 5 * (BLOCK_ID_LEN - 1 - i) as u32;
            *slot = ALPHABET[((self.0 >> shift) & 0x1f) as usize];
        }
        // Alphabet is ASCII
        f.write_str(std::str::from_utf8(&out).map_err(|_| fmt::Error)?)
    }
}

fn decode_char(c: u8) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    ALPHABET.iter().position(|&a| a == upper).map(|p| p as u8)
}

impl FromStr for BlockId {
    type Err = InvalidBlockId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != BLOCK_ID_LEN {
            return Err(InvalidBlockId::Length(s.chars().count()));
        }

        let mut value: u128 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let digit = decode_char(b).ok_or_else(|| {
                InvalidBlockId::Character(s[i..].chars().next().unwrap_or('?'))
            })?;
            // 26 * 5 = 130 bits; the leading character may only carry 3.
            if i == 0 && digit > 7 {
                return Err(InvalidBlockId::Overflow);
            }
            value = (value << 5) | digit as u128;
        }
        Ok(Self(value))
    }
}

impl TryFrom<String> for BlockId {
    type Error = InvalidBlockId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockId> for String {
    fn from(id: BlockId) -> Self {
        id.to_string()
    }
}

/// Return the block id if a listing entry looks like a block directory.
///
/// Accepts `ID`, `ID/` and `prefix/ID/`. Anything else yields `None`.
pub fn is_block_dir(entry: &str) -> Option<BlockId> {
    let trimmed = entry.strip_suffix('/').unwrap_or(entry);
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    base.parse().ok()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Descriptor
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed `meta.json`.
///
/// Only the fields the engine decides on are modelled; unknown fields are
/// ignored on parse. The engine never re-serializes a descriptor it copies,
/// it ships the source bytes verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    pub ulid: BlockId,
    pub min_time: i64,
    pub max_time: i64,
    pub version: u32,
    #[serde(default)]
    pub compaction: BlockMetaCompaction,
    #[serde(default)]
    pub thanos: ThanosMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetaCompaction {
    /// 0 for original blocks, higher after each compaction pass.
    #[serde(default)]
    pub level: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<BlockId>,
}

/// Producer-side extension: external labels and downsampling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThanosMeta {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub downsample: ThanosDownsample,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThanosDownsample {
    #[serde(default)]
    pub resolution: i64,
}

impl BlockMeta {
    /// A raw, uncompacted version-1 descriptor.
    pub fn new(ulid: BlockId, min_time: i64, max_time: i64) -> Self {
        Self {
            ulid,
            min_time,
            max_time,
            version: META_VERSION_1,
            compaction: BlockMetaCompaction::default(),
            thanos: ThanosMeta::default(),
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.thanos.labels.insert(name.into(), value.into());
        self
    }
}
