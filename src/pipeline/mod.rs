//! This module is the transform pipeline engine: it turns a row-oriented
//! [`Dataset`](crate::types::Dataset) into a compact, self-describing
//! [`EncodedArtifact`] and back, driven entirely by a declarative
//! [`TransformSpec`].

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod artifact;
pub mod executor;
pub mod frame;
pub mod models;
pub mod orchestrator;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::artifact::{ArtifactStats, EncodedArtifact, FieldStats};
pub use self::models::{Chain, Channel, Factor, IndexOrder, Operation, Step, TransformSpec};
pub use self::orchestrator::{decode, encode};
