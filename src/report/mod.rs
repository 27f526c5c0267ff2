//! Output sinks.
//!
//! Sweep tables and plots per configuration, optional per-run traces, and
//! the processing report.

pub mod emit;
pub mod generator;
pub mod plot;
pub mod table;
pub mod trace;

pub use emit::{emit_configuration, EmitOptions};
pub use generator::{generate_json_report, generate_markdown_report};
pub use trace::{write_run_traces, TraceOptions};
