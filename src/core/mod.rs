//! Core types for the harness pipeline: builder, path context, and error handling.

pub mod builder;
pub mod context;
pub mod error;

pub use builder::{Harness, HarnessBuilder, HarnessOutcome};
pub use context::PathHelper;
pub use error::{Error, Result};
