//! Selection Module
//!
//! Turns a source into the units to run for one tag.
//!
//! # Architecture
//!
//! - [`directive`]: Parsing of `#:`, `#=` and `#@` control lines
//! - [`selector`]: Tag selection and value carry-forward rules
//! - [`filter`]: Secondary filter predicate over selected units
//! - [`scan`]: Ordered fold of a text source into units and a run context
//! - [`context`]: The frozen per-run settings

pub mod context;
pub mod directive;
pub mod filter;
pub mod scan;
pub mod selector;

pub use context::RunContext;
pub use directive::{strip_leading_token, Directive};
pub use filter::SelectionFilter;
pub use scan::{scan_lines, ScanOptions, ScanOutcome};
pub use selector::{fold_override, should_select};
