//! Property-based tests for `TabGroups` core library
//!
//! Invariants of group navigation, catch rules, version handling, backup
//! merging and the session cache, checked over generated inputs.

// Allow common test patterns that Clippy warns about
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

mod properties;
