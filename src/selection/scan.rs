//! Source Scan
//!
//! Folds the directives of a text source, in order, into the units selected
//! for one run tag plus the frozen [`RunContext`].
//!
//! Global settings apply to the whole batch (last one wins). Value
//! assignments for the run tag carry forward and are attached to every unit
//! selected after them until superseded.

use log::{debug, trace, warn};

use crate::config::{os_name, EnvNames, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_SECONDS};
use crate::error::{Result, SmokeError};
use crate::execution::Unit;
use crate::source::SourceLine;

use super::context::RunContext;
use super::directive::{strip_leading_token, Directive};
use super::filter::SelectionFilter;
use super::selector::{fold_override, should_select};

/// Global setting naming the worker pool size.
pub const THREAD_POOL_SIZE: &str = "THREAD_POOL_SIZE";

/// Global setting naming the batch deadline in seconds.
pub const TIMEOUT_SECONDS: &str = "TIMEOUT_SECONDS";

/// Inputs of a scan that do not come from the source itself.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    tag: String,
    filter: Option<SelectionFilter>,
    env_names: EnvNames,
    pool_size: usize,
    timeout_seconds: u64,
}

impl ScanOptions {
    /// Options for `tag`, rejecting an empty or blank tag.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into().trim().to_string();
        if tag.is_empty() {
            return Err(SmokeError::invalid("tag cannot be empty"));
        }

        Ok(Self {
            tag,
            filter: None,
            env_names: EnvNames::default(),
            pool_size: DEFAULT_POOL_SIZE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        })
    }

    pub fn with_filter(mut self, filter: SelectionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_env_names(mut self, env_names: EnvNames) -> Self {
        self.env_names = env_names;
        self
    }

    /// Batch limits used when the source carries no global settings.
    pub fn with_limits(mut self, pool_size: usize, timeout_seconds: u64) -> Self {
        self.pool_size = pool_size;
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn filter(&self) -> Option<&SelectionFilter> {
        self.filter.as_ref()
    }

    pub fn env_names(&self) -> &EnvNames {
        &self.env_names
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// True if a unit passes the optional filter.
    pub fn accepts(&self, id: &str, text: &str) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.is_match(id, text))
    }
}

/// Units selected by a scan and the context they run under.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub context: RunContext,
    pub units: Vec<Unit>,
}

/// Accumulator threaded through the scan.
struct ScanState {
    pool_size: usize,
    timeout_seconds: u64,
    current_value: Option<String>,
    units: Vec<Unit>,
}

impl ScanState {
    fn new(options: &ScanOptions) -> Self {
        Self {
            pool_size: options.pool_size,
            timeout_seconds: options.timeout_seconds,
            current_value: None,
            units: Vec::new(),
        }
    }

    fn step(mut self, line: &SourceLine, options: &ScanOptions) -> Result<Self> {
        let directive = match Directive::parse(&line.text) {
            Some(directive) => directive,
            None => {
                trace!("Line {}: not a directive", line.number);
                return Ok(self);
            }
        };

        match &directive {
            Directive::GlobalSetting { name, value } => {
                self.apply_global(name, value, line.number)?;
            }
            Directive::ValueAssignment { .. } => {
                self.current_value =
                    fold_override(options.tag(), &directive, self.current_value.take());
                debug!(
                    "Line {}: value for [{}] is now {:?}",
                    line.number,
                    options.tag(),
                    self.current_value
                );
            }
            _ if should_select(options.tag(), &directive) => {
                self.select(line, options)?;
            }
            _ => {
                debug!("Line {}: not selected for [{}]", line.number, options.tag());
            }
        }

        Ok(self)
    }

    fn apply_global(&mut self, name: &str, value: &str, line: usize) -> Result<()> {
        let invalid = || SmokeError::InvalidSetting {
            name: name.to_string(),
            value: value.to_string(),
            line,
        };

        match name.to_uppercase().as_str() {
            THREAD_POOL_SIZE => {
                self.pool_size = parse_positive(value).ok_or_else(invalid)?;
                debug!("Line {}: pool size set to {}", line, self.pool_size);
            }
            TIMEOUT_SECONDS => {
                self.timeout_seconds = parse_positive(value).ok_or_else(invalid)?;
                debug!("Line {}: timeout set to {}s", line, self.timeout_seconds);
            }
            _ => warn!("Line {}: ignoring unknown global setting [{}]", line, name),
        }

        Ok(())
    }

    fn select(&mut self, line: &SourceLine, options: &ScanOptions) -> Result<()> {
        let id = line.number.to_string();
        let command = strip_leading_token(&line.text).trim();

        if command.is_empty() {
            warn!("Line {}: selected but has no command, skipping", line.number);
            return Ok(());
        }

        if !options.accepts(&id, command) {
            debug!("Line {}: rejected by filter", line.number);
            return Ok(());
        }

        let names = options.env_names();
        let mut unit = Unit::new(id, command)?
            .with_override(names.tag(), options.tag())
            .with_override(names.os(), os_name())
            .with_override(names.line(), line.number.to_string());
        if let Some(value) = &self.current_value {
            unit = unit.with_override(names.value(), value.as_str());
        }

        debug!("Line {}: selected {}", line.number, unit);
        self.units.push(unit);
        Ok(())
    }

    fn finish(self, options: &ScanOptions) -> ScanOutcome {
        ScanOutcome {
            context: RunContext::new(
                options.tag(),
                self.pool_size,
                self.timeout_seconds,
                self.current_value,
            ),
            units: self.units,
        }
    }
}

fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|parsed| *parsed > T::default())
}

/// Scans `lines` for the units selected under `options`.
///
/// # Errors
///
/// * `InvalidSetting` - a pool size or timeout setting is not a positive integer
///
/// # Example
///
/// ```
/// use smokerunner::selection::{scan_lines, ScanOptions};
/// use smokerunner::source::parse_lines;
///
/// let lines = parse_lines("#@THREAD_POOL_SIZE@2\n#:-DEV: echo hi\n#:DEV: echo dev");
/// let outcome = scan_lines(&lines, &ScanOptions::new("sit").unwrap()).unwrap();
///
/// assert_eq!(outcome.context.pool_size(), 2);
/// assert_eq!(outcome.units.len(), 1);
/// assert_eq!(outcome.units[0].id(), "2");
/// ```
pub fn scan_lines(lines: &[SourceLine], options: &ScanOptions) -> Result<ScanOutcome> {
    let state = lines
        .iter()
        .try_fold(ScanState::new(options), |state, line| state.step(line, options))?;

    let outcome = state.finish(options);
    debug!(
        "Scan selected {} of {} lines for tag [{}]",
        outcome.units.len(),
        lines.len(),
        options.tag()
    );
    Ok(outcome)
}
