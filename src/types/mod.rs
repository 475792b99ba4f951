//! This module defines the core, strongly-typed data representations used
//! throughout the codec and the enrichment engine.
//!
//! It includes the canonical `Value` enum, which replaces loosely typed JSON
//! values with a hashable, totally ordered representation, and the row-oriented
//! `Dataset` exchanged with the storage layer.

pub mod dataset;
pub mod value;

// Re-export the main type(s) for easier access.
pub use dataset::{Columns, Dataset, Record, DEFAULT_GROUP};
pub use value::Value;
