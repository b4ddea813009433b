//! Workflow engine core for Conductor.
//!
//! This crate defines the engine and its "ports": the operation invocation
//! trait the engine calls into and the observer trait it reports through.
//! It depends only on `conductor-types` -- hosts supply the collaborators.

pub mod event;
pub mod invoker;
pub mod observer;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
