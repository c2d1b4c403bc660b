//! Parsing of the sockperf client summary.

pub mod metrics;
pub mod parse;

pub use metrics::ParsedMetrics;
pub use parse::parse_log_file;
