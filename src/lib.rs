//! SmokeRunner - Tag-Selected Parallel Smoke Tests
//!
//! Runs a batch of independent shell commands concurrently under a bounded
//! worker pool and a single wall-clock deadline, then reports one result per
//! command in submission order. Which commands run is decided per run tag
//! (`dev`, `sit`, `prod`, ...) by markers in a text file or by rules in a
//! JSON/YAML file.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`source`]: Loading text, JSON and YAML smoke-test definitions
//! - [`selection`]: Tag selection, value overrides, global settings, filters
//! - [`execution`]: Concurrent batch engine, unit lifecycle, shell invoker
//! - [`report`]: Pass/fail classification and report rendering
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use smokerunner::execution::{run_batch, CommandUnit, ShellInvoker};
//! use smokerunner::selection::ScanOptions;
//! use smokerunner::source::{load_source, InvocationMeta};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Select the units for tag "sit"
//!     let options = ScanOptions::new("sit")?;
//!     let outcome = load_source("smoke.txt", &options, &InvocationMeta::default())?;
//!
//!     // Run them through the shell
//!     let units = CommandUnit::boxed_batch(outcome.units, Arc::new(ShellInvoker::new()));
//!     let results = run_batch(
//!         units,
//!         outcome.context.pool_size(),
//!         outcome.context.timeout_seconds(),
//!     )?;
//!
//!     println!("{} results", results.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod report;
pub mod selection;
pub mod source;

// Re-export commonly used types
pub use error::{Result, SmokeError};
pub use execution::{run_batch, State, Unit, UnitResult};
pub use selection::{RunContext, ScanOptions};
pub use source::load_source;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "SmokeRunner";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "SmokeRunner");
    }

    #[test]
    fn test_module_exports_unit() {
        let unit = Unit::new("1", "echo test").unwrap();
        assert_eq!(unit.id(), "1");
        assert_eq!(unit.command(), "echo test");
    }

    #[test]
    fn test_module_exports_run_batch() {
        let results = run_batch(Vec::new(), 1, 1).unwrap();
        assert!(results.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_largest_timeout_setting_runs_batch() {
        use std::sync::Arc;

        let lines = source::parse_lines("#@TIMEOUT_SECONDS@18446744073709551615\n#:+: echo hi");
        let outcome = selection::scan_lines(&lines, &ScanOptions::new("dev").unwrap()).unwrap();
        assert_eq!(outcome.context.timeout_seconds(), u64::MAX);

        let units = execution::CommandUnit::boxed_batch(
            outcome.units,
            Arc::new(execution::ShellInvoker::new()),
        );
        let results = run_batch(units, 1, outcome.context.timeout_seconds()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].state(), State::Pass);
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
