//! Pinpoint: map a click on a rendered element back to the source that built it.
//!
//! Two cores do the work. The source correlator finds every construction
//! site of a type name in raw source text, with exact balanced boundaries,
//! and disambiguates repeated sites by ancestor-name evidence. The
//! specificity resolver picks which of several nested elements under a click
//! was meant. Everything algorithmic lives in `pinpoint-core`; this crate
//! re-exports it and adds filesystem loading for the command line.

// Core infrastructure - re-exported from pinpoint-core
pub use pinpoint_core::cache;
pub use pinpoint_core::config;
pub use pinpoint_core::correlator;
pub use pinpoint_core::error;
pub use pinpoint_core::geometry;
pub use pinpoint_core::lexer;
pub use pinpoint_core::output;
pub use pinpoint_core::resolver;
pub use pinpoint_core::text;
pub use pinpoint_core::tracker;
pub use pinpoint_core::types;

// Filesystem front end
pub mod loader;
