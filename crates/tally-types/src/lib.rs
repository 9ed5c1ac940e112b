//! Shared types for the Tally semantic front end.
//!
//! This crate defines the parsed-tree node types, source spans and contexts,
//! and the structured error model shared by all analysis stages.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCategory, ErrorCode, ErrorSet, TallyError};
pub use span::{SourceContext, Span};
