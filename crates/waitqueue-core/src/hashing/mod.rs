//! Canonicalization helpers.
//!
//! Determinism of replay and of projection rebuild depends on comparing JSON
//! by semantic content rather than by serialized text; `to_canonical_json`
//! gives a stable string to compare or hash against.

pub mod canonical_json;

pub use canonical_json::to_canonical_json;
