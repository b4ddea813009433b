//! Shared domain types for Conductor.
//!
//! This crate contains the serializable workflow model (definitions, steps,
//! conditions, actions), execution records, observer events, and engine
//! configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono.

pub mod config;
pub mod event;
pub mod workflow;
