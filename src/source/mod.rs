//! Source Module
//!
//! Loads smoke-test definitions from disk.
//!
//! # Architecture
//!
//! - [`text`]: Line-oriented files with `#:`, `#=` and `#@` directives
//! - [`declarative`]: JSON or YAML files with a `setup` and a `test` block
//!
//! The format is picked from the file extension by [`SourceFormat::from_path`].

pub mod declarative;
pub mod text;

use std::path::Path;

use crate::error::Result;
use crate::selection::{scan_lines, ScanOptions, ScanOutcome};

pub use declarative::{load_declarative, parse_declarative, InvocationMeta};
pub use text::{parse_lines, read_lines, SourceLine};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Json,
    Yaml,
}

impl SourceFormat {
    /// `.json` is JSON, `.yaml`/`.yml` is YAML, anything else is text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Text,
        }
    }

    pub fn is_declarative(self) -> bool {
        self != Self::Text
    }
}

/// Loads any supported source and selects its units.
///
/// # Arguments
///
/// * `path` - Text, JSON or YAML source file
/// * `options` - Tag, filter and default limits
/// * `meta` - Invocation facts for declarative `internal_value`s
///
/// # Returns
///
/// * `Ok(ScanOutcome)` - Selected units in source order plus the run context
/// * `Err` - The file could not be read, parsed or scanned
pub fn load_source(
    path: impl AsRef<Path>,
    options: &ScanOptions,
    meta: &InvocationMeta,
) -> Result<ScanOutcome> {
    let path = path.as_ref();
    if SourceFormat::from_path(path).is_declarative() {
        load_declarative(path, options, meta)
    } else {
        scan_lines(&read_lines(path)?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.json")), SourceFormat::Json);
        assert_eq!(SourceFormat::from_path(Path::new("a.YML")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("a.yaml")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("scripts.txt")), SourceFormat::Text);
        assert_eq!(SourceFormat::from_path(Path::new("smoke")), SourceFormat::Text);
    }

    #[test]
    fn test_load_source_dispatches_on_extension() {
        use std::io::Write;

        let mut text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(text, "#:dev: echo text").unwrap();
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{ "test": {{ "t": {{ "cmd": "echo json", "run": {{ "always": true }} }} }} }}"#).unwrap();

        let options = ScanOptions::new("dev").unwrap();
        let meta = InvocationMeta::default();

        let outcome = load_source(text.path(), &options, &meta).unwrap();
        assert_eq!(outcome.units[0].command(), "echo text");

        let outcome = load_source(json.path(), &options, &meta).unwrap();
        assert_eq!(outcome.units[0].id(), "t");
    }

    #[test]
    fn test_is_declarative() {
        assert!(SourceFormat::Json.is_declarative());
        assert!(SourceFormat::Yaml.is_declarative());
        assert!(!SourceFormat::Text.is_declarative());
    }
}
