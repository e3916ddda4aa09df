//! Unit Results
//!
//! The immutable outcome of attempting to run one unit.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Final state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// The unit's own validation passed
    Pass,
    /// The unit's own validation reported a business-rule failure
    Fail,
    /// Invocation failed, the batch deadline expired, or the engine lost the unit
    ExecError,
    /// A lifecycle step returned an error or panicked
    UserError,
}

impl State {
    pub fn is_pass(self) -> bool {
        self == State::Pass
    }

    pub fn label(self) -> &'static str {
        match self {
            State::Pass => "PASS",
            State::Fail => "FAIL",
            State::ExecError => "EXEC_ERROR",
            State::UserError => "USER_ERROR",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one unit, always correlated to it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    id: String,
    state: State,
    #[serde(with = "duration_ms")]
    elapsed: Duration,
    message: String,
}

impl UnitResult {
    pub fn new(
        id: impl Into<String>,
        state: State,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            state,
            elapsed,
            message: message.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_pass(&self) -> bool {
        self.state.is_pass()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
