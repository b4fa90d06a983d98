//! Core infrastructure for pinpoint.
//!
//! This crate maps a click on a rendered element back to source code:
//! - Lexical scanner for balanced construction-site boundaries
//! - Source correlator (occurrences, ancestor chains, disambiguation)
//! - Source cache with fuzzy path resolution and cross-file scoring
//! - Specificity resolver for nested hit-test candidates
//! - Instance tracker for per-session sibling indices
//! - Error types, configuration and JSON output types

pub mod cache;
pub mod config;
pub mod correlator;
pub mod error;
pub mod geometry;
pub mod lexer;
pub mod output;
pub mod resolver;
pub mod text;
pub mod tracker;
pub mod types;
