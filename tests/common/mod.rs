//! Shared test utilities for integration, chaos and property tests.
//!
//! This module provides:
//! - A recording, failure-injecting store wrapper
//! - Block fixtures written in the producer's layout

#![allow(dead_code)]

pub mod fixtures;
pub mod recording_store;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use recording_store::*;
