//! This file is the root of the `afval` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`pipeline`, `kernels`,
//!     `spatial`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of entry points a caller needs: `encode` and
//!     `decode` for the codec, `update_weighings` for the enrichment run, and
//!     the storage helpers that move both to and from disk.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod config;
pub mod enrich;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod presets;
pub mod spatial;
pub mod storage;
pub mod types;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use config::{AfvalConfig, EnrichmentConfig};
pub use enrich::{update_weighings, Reference, WeighingSources, WeighingUpdate};
pub use error::{AfvalError, Result};
pub use pipeline::{decode, encode, EncodedArtifact, TransformSpec};
pub use types::{Dataset, Record, Value};
