//! Executable Units
//!
//! A [`Unit`] is the data describing one command to run; an
//! [`Executable`] is anything the engine can drive through the four-step
//! lifecycle (pre-execute, execute, post-execute, validate).
//!
//! Text-line and JSON-declared units differ only in their data, so both are
//! run by the single generic [`CommandUnit`].

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, trace};

use crate::error::{Result, SmokeError};

use super::invoker::CommandInvoker;
use super::result::{State, UnitResult};

/// Error returned by a lifecycle step.
pub type StepError = Box<dyn Error + Send + Sync>;

/// One independently executable command plus its identity and overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    id: String,
    command: String,
    overrides: BTreeMap<String, String>,
}

impl Unit {
    /// Creates a unit, rejecting an empty or whitespace-only id.
    ///
    /// # Example
    ///
    /// ```
    /// use smokerunner::execution::Unit;
    ///
    /// let unit = Unit::new("12", "echo hi")
    ///     .unwrap()
    ///     .with_override("ST_TAG", "dev");
    /// assert_eq!(unit.overrides().get("ST_TAG").map(String::as_str), Some("dev"));
    /// ```
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(SmokeError::invalid("unit id cannot be empty"));
        }

        Ok(Self {
            id,
            command: command.into().trim().to_string(),
            overrides: BTreeMap::new(),
        })
    }

    /// Adds one environment override.
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Adds every override from `overrides`, replacing existing names.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn overrides(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id [{}], cmd [{}]", self.id, self.command)
    }
}

/// The lifecycle every unit exposes to the engine.
///
/// Any `Err` or panic from any step is caught by the engine and recorded as
/// [`State::UserError`]; it never reaches sibling units.
pub trait Executable: Send {
    fn id(&self) -> &str;

    fn pre_execute(&mut self) -> std::result::Result<(), StepError> {
        Ok(())
    }

    fn execute(&mut self) -> std::result::Result<(), StepError>;

    fn post_execute(&mut self) -> std::result::Result<(), StepError> {
        Ok(())
    }

    /// Produces the final result. Called once, after the other steps.
    fn validate(&mut self) -> std::result::Result<UnitResult, StepError>;
}

/// Runs a [`Unit`]'s command through a shared [`CommandInvoker`].
///
/// Exit code 0 is [`State::Pass`], any other exit is [`State::Fail`], and a
/// failure to spawn or wait on the process is [`State::ExecError`].
pub struct CommandUnit {
    unit: Unit,
    invoker: Arc<dyn CommandInvoker>,
    state: State,
    elapsed: Duration,
    message: String,
}

impl CommandUnit {
    pub fn new(unit: Unit, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            unit,
            invoker,
            state: State::Fail,
            elapsed: Duration::ZERO,
            message: String::new(),
        }
    }

    /// Wraps every unit of a batch around the same invoker.
    pub fn boxed_batch(units: Vec<Unit>, invoker: Arc<dyn CommandInvoker>) -> Vec<Box<dyn Executable>> {
        units
            .into_iter()
            .map(|unit| Box::new(Self::new(unit, Arc::clone(&invoker))) as Box<dyn Executable>)
            .collect()
    }

    fn details(&self, state: State, exit_code: Option<i32>) -> String {
        let exit = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
        format!(
            "{}: id [{}], cmd [{}], exit [{}], elapsed [{} ms]",
            state,
            self.unit.id(),
            self.unit.command(),
            exit,
            self.elapsed.as_millis()
        )
    }
}

impl Executable for CommandUnit {
    fn id(&self) -> &str {
        self.unit.id()
    }

    fn execute(&mut self) -> std::result::Result<(), StepError> {
        let start = Instant::now();
        let outcome = self
            .invoker
            .invoke(self.unit.command(), self.unit.overrides());
        self.elapsed = start.elapsed();

        match outcome {
            Ok(invocation) => {
                self.state = if invocation.success() {
                    State::Pass
                } else {
                    State::Fail
                };
                self.message = format!(
                    "{}, stdout [{}], stderr [{}]",
                    self.details(self.state, invocation.exit_code),
                    invocation.stdout,
                    invocation.stderr
                );
            }
            Err(e) => {
                error!("Unit {} could not be invoked: {}", self.unit, e);
                self.state = State::ExecError;
                self.message = format!("{}, ERROR: {}", self.details(self.state, None), e);
            }
        }

        Ok(())
    }

    fn validate(&mut self) -> std::result::Result<UnitResult, StepError> {
        let result = UnitResult::new(
            self.unit.id(),
            self.state,
            self.elapsed,
            self.message.clone(),
        );
        trace!("Validated {}: {}", self.unit, result.state());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::invoker::Invocation;
    use std::io;
    use std::sync::Mutex;

    /// Returns a preset outcome and records what it was asked to run.
    struct StubInvoker {
        exit_code: Option<i32>,
        fail_spawn: bool,
        seen: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    }

    impl StubInvoker {
        fn exiting(code: i32) -> Self {
            Self {
                exit_code: Some(code),
                fail_spawn: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn broken() -> Self {
            Self {
                exit_code: None,
                fail_spawn: true,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandInvoker for StubInvoker {
        fn invoke(&self, command: &str, env: &BTreeMap<String, String>) -> io::Result<Invocation> {
            self.seen
                .lock()
                .unwrap()
                .push((command.to_string(), env.clone()));
            if self.fail_spawn {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no shell"));
            }
            Ok(Invocation {
                exit_code: self.exit_code,
                stdout: "out".to_string(),
                stderr: "err".to_string(),
            })
        }
    }

    fn run(unit: &mut CommandUnit) -> UnitResult {
        unit.pre_execute().unwrap();
        unit.execute().unwrap();
        unit.post_execute().unwrap();
        unit.validate().unwrap()
    }

    #[test]
    fn test_unit_rejects_empty_id() {
        assert!(Unit::new("", "echo").is_err());
        assert!(Unit::new("   ", "echo").is_err());
    }

    #[test]
    fn test_unit_trims_fields() {
        let unit = Unit::new(" 4 ", "  echo hi  ").unwrap();
        assert_eq!(unit.id(), "4");
        assert_eq!(unit.command(), "echo hi");
    }

    #[test]
    fn test_unit_with_overrides_replaces() {
        let unit = Unit::new("1", "true")
            .unwrap()
            .with_override("A", "1")
            .with_overrides([("A", "2"), ("B", "3")]);

        assert_eq!(unit.overrides().len(), 2);
        assert_eq!(unit.overrides()["A"], "2");
    }

    #[test]
    fn test_command_unit_pass() {
        let invoker = Arc::new(StubInvoker::exiting(0));
        let unit = Unit::new("3", "echo hi").unwrap().with_override("ST_TAG", "dev");
        let mut cmd = CommandUnit::new(unit, invoker.clone());

        let result = run(&mut cmd);

        assert_eq!(result.id(), "3");
        assert_eq!(result.state(), State::Pass);
        assert!(result.message().starts_with("PASS: id [3], cmd [echo hi]"));
        assert!(result.message().contains("stdout [out]"));

        let seen = invoker.seen.lock().unwrap();
        assert_eq!(seen[0].0, "echo hi");
        assert_eq!(seen[0].1["ST_TAG"], "dev");
    }

    #[test]
    fn test_command_unit_fail_on_non_zero_exit() {
        let mut cmd = CommandUnit::new(
            Unit::new("9", "false").unwrap(),
            Arc::new(StubInvoker::exiting(1)),
        );

        let result = run(&mut cmd);
        assert_eq!(result.state(), State::Fail);
        assert!(result.message().contains("exit [1]"));
    }

    #[test]
    fn test_command_unit_exec_error_on_spawn_failure() {
        let mut cmd = CommandUnit::new(
            Unit::new("2", "whatever").unwrap(),
            Arc::new(StubInvoker::broken()),
        );

        let result = run(&mut cmd);
        assert_eq!(result.state(), State::ExecError);
        assert!(result.message().contains("ERROR: no shell"));
    }

    #[test]
    fn test_boxed_batch_preserves_order() {
        let units = vec![
            Unit::new("b", "true").unwrap(),
            Unit::new("a", "true").unwrap(),
        ];
        let batch = CommandUnit::boxed_batch(units, Arc::new(StubInvoker::exiting(0)));

        let ids: Vec<&str> = batch.iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
