//! Run Context
//!
//! The settings in effect for one invocation, frozen once the source scan
//! finishes and handed to the engine as plain values.

use serde::Serialize;

/// Tag, batch limits and tag-resolved value for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunContext {
    tag: String,
    pool_size: usize,
    timeout_seconds: u64,
    resolved_value: Option<String>,
}

impl RunContext {
    pub fn new(
        tag: impl Into<String>,
        pool_size: usize,
        timeout_seconds: u64,
        resolved_value: Option<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            pool_size,
            timeout_seconds,
            resolved_value,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// The last value assigned for this run's tag, if any.
    pub fn resolved_value(&self) -> Option<&str> {
        self.resolved_value.as_deref()
    }
}
