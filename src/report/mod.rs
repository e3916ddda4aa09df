//! Report Module
//!
//! Classifies a finished batch and renders it for the terminal.
//!
//! # Architecture
//!
//! - [`summary`]: Pass/fail counts, slowest passes, exit status
//! - [`format`]: Text rendering with coloured state labels

pub mod format;
pub mod summary;

pub use format::{render_report, state_label, summary_line, ReportOptions};
pub use summary::{exit_status, failed_count, passed_count, slowest, BatchSummary};
