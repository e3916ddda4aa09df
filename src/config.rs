//! Run Defaults and Environment Naming
//!
//! Default batch settings used before any `#@` global setting or JSON
//! `setup` block overrides them, plus the naming scheme for environment
//! variables injected into every unit's subprocess.

use std::env;

use log::debug;
use once_cell::sync::Lazy;

/// Default number of concurrently running units.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default wall-clock deadline for the whole batch.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Default number of slowest passing units shown in the report.
pub const DEFAULT_SLOWEST_COUNT: usize = 5;

/// Default prefix for injected environment variable names.
pub const DEFAULT_ENV_PREFIX: &str = "ST_";

/// Environment variable that overrides [`DEFAULT_ENV_PREFIX`].
pub const ENV_PREFIX_OVERRIDE: &str = "ST_ENV_NAME_PREFIX";

/// Process exit codes of the binary.
pub mod exit_code {
    /// Every selected unit passed.
    pub const SUCCESS: u8 = 0;
    /// Missing or malformed command-line arguments.
    pub const USAGE: u8 = 1;
    /// Empty tag or unusable filter.
    pub const BAD_SELECTION: u8 = 2;
    /// Bad source settings or the engine refused the batch.
    pub const CONFIG: u8 = 3;
    /// The source could not be read.
    pub const IO: u8 = 4;
    /// At least one unit did not pass.
    pub const FAILURES: u8 = 5;
}

/// Prefix resolved once from the process environment.
pub static ENV_PREFIX: Lazy<String> = Lazy::new(|| match env::var(ENV_PREFIX_OVERRIDE) {
    Ok(prefix) if !prefix.trim().is_empty() => {
        debug!("Overriding env. variable name prefix with [{}]", prefix);
        prefix
    }
    _ => DEFAULT_ENV_PREFIX.to_string(),
});

/// Name of the current platform as exposed to units.
pub fn os_name() -> &'static str {
    if cfg!(windows) {
        "windows"
    } else {
        "unix"
    }
}

/// Builds the names of the variables injected into text-source units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvNames {
    prefix: String,
}

impl EnvNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn tag(&self) -> String {
        format!("{}TAG", self.prefix)
    }

    pub fn value(&self) -> String {
        format!("{}VALUE", self.prefix)
    }

    pub fn os(&self) -> String {
        format!("{}OS", self.prefix)
    }

    pub fn line(&self) -> String {
        format!("{}LINE", self.prefix)
    }

    /// All names in a stable order, for diagnostics.
    pub fn all(&self) -> [String; 4] {
        [self.tag(), self.value(), self.os(), self.line()]
    }
}

impl Default for EnvNames {
    fn default() -> Self {
        Self::new(ENV_PREFIX.as_str())
    }
}
