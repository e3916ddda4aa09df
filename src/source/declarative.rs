//! Declarative Source
//!
//! Loads JSON or YAML smoke-test definitions:
//!
//! ```yaml
//! setup:
//!   timeout_seconds_for_all_tests: 30
//!   thread_pool_size: 4
//!   system_variables:
//!     - { name: ST_TAG, internal_value: TAG }
//!     - { name: GREETING, inline_value: hello }
//!     - name: BASE_URL
//!       inline_value_from_matching_tag: { dev: "http://dev", prod: "http://prod" }
//! test:
//!   ping:  { cmd: "curl -s $BASE_URL", run: { always: true } }
//!   admin: { cmd: "./admin.sh", run: { if_tag_matches: [dev, sit] } }
//!   heavy: { cmd: "./load.sh", run: { unless_tag_matches: [prod] } }
//! ```
//!
//! Tests run in declaration order, with each test's key as its unit id.
//! Every selected unit receives every resolved system variable.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::os_name;
use crate::error::Result;
use crate::execution::Unit;
use crate::selection::{fold_override, should_select, Directive, RunContext, ScanOptions, ScanOutcome};

use super::SourceFormat;

/// Facts about the current invocation exposed through `internal_value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationMeta {
    pub config_file: String,
    pub cmd_line: String,
}

impl InvocationMeta {
    pub fn new(config_file: impl Into<String>, cmd_line: impl Into<String>) -> Self {
        Self {
            config_file: config_file.into(),
            cmd_line: cmd_line.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    setup: Setup,
    #[serde(default)]
    test: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Setup {
    timeout_seconds_for_all_tests: Option<u64>,
    thread_pool_size: Option<usize>,
    #[serde(default)]
    system_variables: Vec<SystemVariable>,
}

#[derive(Debug, Deserialize)]
struct SystemVariable {
    name: String,
    internal_value: Option<InternalValue>,
    inline_value: Option<String>,
    inline_value_from_matching_tag: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum InternalValue {
    Version,
    ConfigFile,
    CmdLine,
    Timeout,
    ThreadPoolSize,
    Id,
    Os,
    Tag,
}

#[derive(Debug, Deserialize)]
struct TestEntry {
    cmd: Option<String>,
    #[serde(default)]
    run: RunBlock,
}

/// The first present key decides; a block with none of them never runs.
#[derive(Debug, Default, Deserialize)]
struct RunBlock {
    always: Option<IgnoredAny>,
    if_tag_matches: Option<Vec<String>>,
    unless_tag_matches: Option<Vec<String>>,
    never: Option<IgnoredAny>,
}

impl RunBlock {
    fn into_directive(self) -> Directive {
        if self.always.is_some() {
            Directive::SelectAlways
        } else if let Some(tags) = self.if_tag_matches {
            Directive::SelectIfTagIn(tags)
        } else if let Some(tags) = self.unless_tag_matches {
            Directive::DeselectIfTagIn(tags)
        } else {
            if self.never.is_none() {
                debug!("Run block without a recognised rule, treating as never");
            }
            Directive::Never
        }
    }
}

/// A system variable value, resolved up to the unit id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Fixed(String),
    UnitId,
}

/// Resolves every system variable; unmatched tag maps set nothing.
fn resolve_variables(
    setup: &Setup,
    context: &RunContext,
    meta: &InvocationMeta,
) -> Vec<(String, Resolved)> {
    let mut resolved = Vec::new();

    for var in &setup.system_variables {
        let value = if let Some(internal) = var.internal_value {
            Some(match internal {
                InternalValue::Version => Resolved::Fixed(crate::VERSION.to_string()),
                InternalValue::ConfigFile => Resolved::Fixed(meta.config_file.clone()),
                InternalValue::CmdLine => Resolved::Fixed(meta.cmd_line.clone()),
                InternalValue::Timeout => Resolved::Fixed(context.timeout_seconds().to_string()),
                InternalValue::ThreadPoolSize => Resolved::Fixed(context.pool_size().to_string()),
                InternalValue::Id => Resolved::UnitId,
                InternalValue::Os => Resolved::Fixed(os_name().to_string()),
                InternalValue::Tag => Resolved::Fixed(context.tag().to_string()),
            })
        } else if let Some(inline) = &var.inline_value {
            Some(Resolved::Fixed(inline.clone()))
        } else if let Some(by_tag) = &var.inline_value_from_matching_tag {
            tag_value(context.tag(), by_tag).map(Resolved::Fixed)
        } else {
            warn!("System variable [{}] has no value source", var.name);
            None
        };

        match value {
            Some(value) => {
                debug!("System variable [{}] = {:?}", var.name, value);
                resolved.push((var.name.clone(), value));
            }
            None => debug!("System variable [{}] not set for this tag", var.name),
        }
    }

    resolved
}

fn tag_value(tag: &str, by_tag: &BTreeMap<String, String>) -> Option<String> {
    by_tag.iter().fold(None, |current, (key, value)| {
        let assignment = Directive::ValueAssignment {
            tag: key.clone(),
            value: value.clone(),
        };
        fold_override(tag, &assignment, current)
    })
}

/// The tag-resolved value reported in the run context.
fn resolved_value(tag: &str, setup: &Setup) -> Option<String> {
    setup
        .system_variables
        .iter()
        .filter_map(|var| var.inline_value_from_matching_tag.as_ref())
        .fold(None, |current, by_tag| tag_value(tag, by_tag).or(current))
}

/// Parses declarative source text into selected units and their context.
///
/// # Errors
///
/// * `Json` / `Yaml` - the document does not match the schema
/// * `InvalidArgument` - a selected test has an empty id
pub fn parse_declarative(
    content: &str,
    format: SourceFormat,
    options: &ScanOptions,
    meta: &InvocationMeta,
) -> Result<ScanOutcome> {
    let document: Document = match format {
        SourceFormat::Yaml => serde_yaml::from_str(content)?,
        _ => serde_json::from_str(content)?,
    };

    let setup = &document.setup;
    let context = RunContext::new(
        options.tag(),
        setup.thread_pool_size.unwrap_or(options.pool_size()),
        setup
            .timeout_seconds_for_all_tests
            .unwrap_or(options.timeout_seconds()),
        resolved_value(options.tag(), setup),
    );
    let variables = resolve_variables(setup, &context, meta);

    let mut units = Vec::new();
    for (id, value) in document.test {
        let entry: TestEntry = serde_json::from_value(value)?;
        let directive = entry.run.into_directive();

        if !should_select(options.tag(), &directive) {
            debug!("Test [{}]: not selected for [{}]", id, options.tag());
            continue;
        }

        let command = entry.cmd.unwrap_or_default();
        if command.trim().is_empty() {
            warn!("Test [{}]: selected but has no cmd, skipping", id);
            continue;
        }

        if !options.accepts(&id, &command) {
            debug!("Test [{}]: rejected by filter", id);
            continue;
        }

        let unit = Unit::new(id.as_str(), command)?;
        let overrides: Vec<(String, String)> = variables
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Resolved::Fixed(v) => v.clone(),
                    Resolved::UnitId => unit.id().to_string(),
                };
                (name.clone(), value)
            })
            .collect();
        let unit = unit.with_overrides(overrides);

        debug!("Test [{}]: selected {}", id, unit);
        units.push(unit);
    }

    Ok(ScanOutcome { context, units })
}

/// Loads a JSON or YAML source from disk.
///
/// # Example
///
/// ```rust,no_run
/// use smokerunner::selection::ScanOptions;
/// use smokerunner::source::{load_declarative, InvocationMeta};
///
/// let options = ScanOptions::new("dev").unwrap();
/// let meta = InvocationMeta::new("smoke.json", "smoke.json dev");
/// let outcome = load_declarative("smoke.json", &options, &meta).unwrap();
/// println!("{} units selected", outcome.units.len());
/// ```
pub fn load_declarative(
    path: impl AsRef<Path>,
    options: &ScanOptions,
    meta: &InvocationMeta,
) -> Result<ScanOutcome> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path);
    info!("Loading {:?} smoke tests from: {}", format, path.display());

    let content = fs::read_to_string(path)?;
    let outcome = parse_declarative(&content, format, options, meta)?;

    info!(
        "Selected {} tests for tag [{}]",
        outcome.units.len(),
        options.tag()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmokeError;
    use crate::selection::SelectionFilter;
    use std::io::Write;
    use tempfile::Builder;

    const SAMPLE: &str = r#"{
        "setup": {
            "timeout_seconds_for_all_tests": 30,
            "thread_pool_size": 4,
            "system_variables": [
                { "name": "ST_TAG", "internal_value": "TAG" },
                { "name": "ST_ID", "internal_value": "ID" },
                { "name": "ST_POOL", "internal_value": "THREAD_POOL_SIZE" },
                { "name": "ST_FILE", "internal_value": "CONFIG_FILE" },
                { "name": "GREETING", "inline_value": "hello" },
                { "name": "BASE_URL", "inline_value_from_matching_tag": { "DEV": "http://dev", "prod": "http://prod" } }
            ]
        },
        "test": {
            "zeta":  { "cmd": "echo zeta",  "run": { "always": true } },
            "admin": { "cmd": "./admin.sh", "run": { "if_tag_matches": ["dev", "SIT"] } },
            "heavy": { "cmd": "./load.sh",  "run": { "unless_tag_matches": ["prod"] } },
            "off":   { "cmd": "echo off",   "run": { "never": true } },
            "odd":   { "cmd": "echo odd",   "run": { "sometimes": true } }
        }
    }"#;

    fn parse(tag: &str) -> ScanOutcome {
        parse_declarative(
            SAMPLE,
            SourceFormat::Json,
            &ScanOptions::new(tag).unwrap(),
            &InvocationMeta::new("smoke.json", "smoke.json dev"),
        )
        .unwrap()
    }

    fn ids(outcome: &ScanOutcome) -> Vec<&str> {
        outcome.units.iter().map(|u| u.id()).collect()
    }

    #[test]
    fn test_run_rules_in_declaration_order() {
        assert_eq!(ids(&parse("dev")), vec!["zeta", "admin", "heavy"]);
        assert_eq!(ids(&parse("uat")), vec!["zeta", "heavy"]);
        assert_eq!(ids(&parse("PROD")), vec!["zeta"]);
    }

    #[test]
    fn test_setup_limits_used() {
        let outcome = parse("dev");
        assert_eq!(outcome.context.pool_size(), 4);
        assert_eq!(outcome.context.timeout_seconds(), 30);
    }

    #[test]
    fn test_system_variables_resolved() {
        let outcome = parse("dev");
        let admin = outcome.units[1].overrides();

        assert_eq!(admin["ST_TAG"], "dev");
        assert_eq!(admin["ST_ID"], "admin");
        assert_eq!(admin["ST_POOL"], "4");
        assert_eq!(admin["ST_FILE"], "smoke.json");
        assert_eq!(admin["GREETING"], "hello");
        assert_eq!(admin["BASE_URL"], "http://dev");
        assert_eq!(outcome.context.resolved_value(), Some("http://dev"));
    }

    #[test]
    fn test_unmatched_tag_value_not_set() {
        let outcome = parse("uat");
        assert!(!outcome.units[0].overrides().contains_key("BASE_URL"));
        assert_eq!(outcome.context.resolved_value(), None);
    }

    #[test]
    fn test_filter_applies_to_selected_tests() {
        let options = ScanOptions::new("dev")
            .unwrap()
            .with_filter(SelectionFilter::parse("#admin#zeta#").unwrap());
        let outcome =
            parse_declarative(SAMPLE, SourceFormat::Json, &options, &InvocationMeta::default())
                .unwrap();

        assert_eq!(ids(&outcome), vec!["zeta", "admin"]);
    }

    #[test]
    fn test_missing_setup_uses_option_limits() {
        let json = r#"{ "test": { "a": { "cmd": "true", "run": { "always": 1 } } } }"#;
        let options = ScanOptions::new("dev").unwrap().with_limits(2, 15);
        let outcome =
            parse_declarative(json, SourceFormat::Json, &options, &InvocationMeta::default())
                .unwrap();

        assert_eq!(outcome.context.pool_size(), 2);
        assert_eq!(outcome.context.timeout_seconds(), 15);
        assert_eq!(ids(&outcome), vec!["a"]);
    }

    #[test]
    fn test_selected_test_without_cmd_skipped() {
        let json = r#"{ "test": { "a": { "run": { "always": true } }, "b": { "cmd": "true", "run": { "always": true } } } }"#;
        let outcome = parse_declarative(
            json,
            SourceFormat::Json,
            &ScanOptions::new("dev").unwrap(),
            &InvocationMeta::default(),
        )
        .unwrap();

        assert_eq!(ids(&outcome), vec!["b"]);
    }

    #[test]
    fn test_unknown_internal_value_rejected() {
        let json = r#"{ "setup": { "system_variables": [ { "name": "X", "internal_value": "NOPE" } ] } }"#;
        let err = parse_declarative(
            json,
            SourceFormat::Json,
            &ScanOptions::new("dev").unwrap(),
            &InvocationMeta::default(),
        )
        .unwrap_err();

        assert!(matches!(err, SmokeError::Json(_)));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "setup:\n  thread_pool_size: 3\n  system_variables:\n    - {{ name: WHO, internal_value: OS }}\n\
             test:\n  second:\n    cmd: echo two\n    run: {{ always: true }}\n  first:\n    cmd: echo one\n    run: {{ if_tag_matches: [sit] }}\n"
        )
        .unwrap();

        let outcome = load_declarative(
            file.path(),
            &ScanOptions::new("SIT").unwrap(),
            &InvocationMeta::default(),
        )
        .unwrap();

        assert_eq!(ids(&outcome), vec!["second", "first"]);
        assert_eq!(outcome.context.pool_size(), 3);
        assert_eq!(outcome.units[0].overrides()["WHO"], os_name());
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_declarative(
            file.path(),
            &ScanOptions::new("dev").unwrap(),
            &InvocationMeta::default(),
        )
        .unwrap_err();

        assert!(matches!(err, SmokeError::Json(_)));
    }
}
