//! Batch Execution Module
//!
//! Provides the concurrent engine that runs a batch of units under a bounded
//! worker pool and a global deadline, plus the unit lifecycle and the shell
//! command invoker units use.
//!
//! # Architecture
//!
//! - [`engine`]: Worker pool, deadline and result correlation
//! - [`unit`]: Unit data and the executable lifecycle
//! - [`invoker`]: Subprocess invocation with environment overrides
//! - [`result`]: Per-unit results and states

pub mod engine;
pub mod invoker;
pub mod result;
pub mod unit;

pub use engine::run_batch;
pub use invoker::{CommandInvoker, Invocation, ShellInvoker};
pub use result::{State, UnitResult};
pub use unit::{CommandUnit, Executable, StepError, Unit};
