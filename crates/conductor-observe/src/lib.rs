//! Observability setup for Conductor: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
