//! Workflow engine core: definition loading, registration, and execution.
//!
//! - `definition` -- error taxonomy, YAML/JSON parsing, validation, discovery
//! - `path` -- dotted field paths and scope lookup
//! - `template` -- `${path}` parameter templates parsed at registration
//! - `condition` -- gating predicate evaluation
//! - `registry` -- in-memory definition store
//! - `tracker` -- execution records and per-run bookkeeping
//! - `step_executor` -- single-step invocation with timeout and linear retry
//! - `actions` -- success/failure hook interpretation
//! - `orchestrator` -- the step-loop state machine

pub mod actions;
pub mod condition;
pub mod definition;
pub mod orchestrator;
pub mod path;
pub mod registry;
pub mod step_executor;
pub mod template;
pub mod tracker;
