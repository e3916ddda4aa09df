//! Text Source
//!
//! Loads a line-oriented smoke-test file. Every line is kept, including
//! blanks and plain comments, so line numbers stay aligned with the file.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::Result;

/// One line of a text source with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Splits already-loaded text into numbered lines.
pub fn parse_lines(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .map(|(index, text)| SourceLine::new(index + 1, text))
        .collect()
}

/// Reads a text source from disk.
///
/// # Arguments
///
/// * `path` - Path to the smoke-test file
///
/// # Returns
///
/// * `Ok(Vec<SourceLine>)` - Every line of the file, in order
/// * `Err(SmokeError::Io)` - The file could not be read
///
/// # Example
///
/// ```rust,no_run
/// use smokerunner::source::read_lines;
///
/// let lines = read_lines("smoke.txt").unwrap();
/// println!("{} lines", lines.len());
/// ```
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<SourceLine>> {
    let path = path.as_ref();
    info!("Loading smoke tests from: {}", path.display());

    let content = fs::read_to_string(path)?;
    let lines = parse_lines(&content);

    debug!("Read {} lines ({} bytes)", lines.len(), content.len());
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmokeError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_lines_numbers_from_one() {
        let lines = parse_lines("first\n\nthird");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], SourceLine::new(1, "first"));
        assert_eq!(lines[1], SourceLine::new(2, ""));
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn test_parse_lines_handles_crlf() {
        let lines = parse_lines("a\r\nb\r\n");
        assert_eq!(lines, vec![SourceLine::new(1, "a"), SourceLine::new(2, "b")]);
    }

    #[test]
    fn test_read_lines_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#:+: echo one").unwrap();
        writeln!(file, "# comment").unwrap();

        let lines = read_lines(file.path()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "#:+: echo one");
    }

    #[test]
    fn test_read_lines_missing_file() {
        let err = read_lines("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, SmokeError::Io(_)));
    }
}
