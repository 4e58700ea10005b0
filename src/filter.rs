// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Block eligibility.
//!
//! A block is replicated only when all of the following hold:
//!
//! 1. its external labels satisfy the configured [`LabelSelector`]
//! 2. its downsampling resolution equals the configured one
//! 3. its compaction level equals the configured one
//!
//! The filter is a pure predicate. Rejections are logged at debug level.

use crate::block::{BlockMeta, ResolutionLevel};
use crate::error::{ReplicationError, Result};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Exact-equality matcher on one external label.
///
/// A label absent from the block compares as the empty string, so
/// `name=""` matches blocks that do not carry `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    pub name: String,
    pub value: String,
}

impl LabelMatcher {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse `key="value"`.
    pub fn parse(input: &str) -> Result<Self> {
        let (name, quoted) = input
            .split_once('=')
            .ok_or_else(|| ReplicationError::Config(format!("unrecognized label {:?}", input)))?;

        if !is_valid_label_name(name) {
            return Err(ReplicationError::Config(format!(
                "unsupported format for label {}",
                input
            )));
        }

        let value = unquote(quoted).ok_or_else(|| {
            ReplicationError::Config(format!("unquote label value in {:?}", input))
        })?;

        Ok(Self::new(name, value))
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.name).map(String::as_str).unwrap_or("") == self.value
    }
}

impl fmt::Display for LabelMatcher {
    /// `name="value"`, escaped so that [`LabelMatcher::parse`] reads it back.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"", self.name)?;
        for c in self.value.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{}", c)?,
            }
        }
        f.write_str("\"")
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip surrounding double quotes and resolve escapes.
fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                'n' => out.push('\n'),
                't' => out.push('\t'),
                _ => return None,
            },
            '"' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

/// Conjunction of matchers. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    matchers: Vec<LabelMatcher>,
}

impl LabelSelector {
    pub fn new(matchers: Vec<LabelMatcher>) -> Self {
        Self { matchers }
    }

    /// Parse a list of `key="value"` strings.
    pub fn parse<S: AsRef<str>>(inputs: &[S]) -> Result<Self> {
        inputs
            .iter()
            .map(|s| LabelMatcher::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn matchers(&self) -> &[LabelMatcher] {
        &self.matchers
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.matchers.iter().all(|m| m.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, m) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", m)?;
        }
        f.write_str("}")
    }
}

/// Eligibility predicate over parsed descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFilter {
    selector: LabelSelector,
    resolution: i64,
    compaction_level: i32,
}

impl Default for BlockFilter {
    /// Everything raw and uncompacted.
    fn default() -> Self {
        Self::new(LabelSelector::default(), ResolutionLevel::Raw.millis(), 0)
    }
}

impl BlockFilter {
    pub fn new(selector: LabelSelector, resolution: i64, compaction_level: i32) -> Self {
        Self {
            selector,
            resolution,
            compaction_level,
        }
    }

    pub fn selector(&self) -> &LabelSelector {
        &self.selector
    }

    pub fn resolution(&self) -> i64 {
        self.resolution
    }

    pub fn compaction_level(&self) -> i32 {
        self.compaction_level
    }

    /// True when the block should be replicated.
    pub fn filter(&self, meta: &BlockMeta) -> bool {
        if !self.selector.matches(&meta.thanos.labels) {
            debug!(
                block = %meta.ulid,
                selector = %self.selector,
                "Block rejected: labels do not match"
            );
            return false;
        }

        if meta.thanos.downsample.resolution != self.resolution {
            debug!(
                block = %meta.ulid,
                resolution = meta.thanos.downsample.resolution,
                wanted = self.resolution,
                "Block rejected: resolution differs"
            );
            return false;
        }

        if meta.compaction.level != self.compaction_level {
            debug!(
                block = %meta.ulid,
                level = meta.compaction.level,
                wanted = self.compaction_level,
                "Block rejected: compaction level differs"
            );
            return false;
        }

        true
    }
}
