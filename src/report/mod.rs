//! Renderers for lookup results.
//!
//! - [`json`]: one JSON object per result, streamed as results arrive.
//! - [`terminal`]: summary box and table once every result is in.

pub mod json;
pub mod terminal;
