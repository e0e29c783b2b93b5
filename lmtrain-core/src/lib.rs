//! Language model training orchestration for the translation pipeline.
//!
//! This crate prepares inputs for external n-gram engines and records how
//! the resulting models compose:
//! - Interchangeable training backends selected by model kind
//! - Memory budget sizing for the counting engine
//! - A multiplexed model blending a background LM with per-domain LMs
//!
//! The n-gram statistics themselves are computed by external tools invoked
//! as subprocesses. This crate never reads the binary models it produces.

/// Crate-wide error type.
pub mod error;

/// Model and toolchain configuration (`[lm]` and `[tools]` sections).
pub mod config;

/// Corpus capability and on-disk corpus discovery.
pub mod corpus;

/// Memory statistics and the counting engine's memory budget.
pub mod memory;

/// External engine invocation and log sinks.
pub mod shell;

/// Language model variants, the shared training contract and the factory.
pub mod model;

/// File utilities (merging, directory preparation, relative paths).
///
/// Not exposed
pub(crate) mod io;

pub use error::{LmError, LmResult};
