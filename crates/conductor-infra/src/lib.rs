//! Infrastructure layer for Conductor.
//!
//! Config discovery and loading for [`EngineConfig`](conductor_types::config::EngineConfig),
//! and the built-in operation table the CLI runs workflows against.

pub mod config;
pub mod operations;
