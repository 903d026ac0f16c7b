//! Shared test fixtures for the beats workspace.
//!
//! - [`BeatBuilder`] for concise beat construction
//! - [`BeatsDir`] for an on-disk `.beats` directory in a temp root
//! - [`mock_ollama`] for a keyword-driven stand-in embedding service

mod fixtures;

pub use fixtures::*;
