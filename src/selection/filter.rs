//! Selection Filter
//!
//! A secondary predicate applied to units that already passed tag
//! selection. The filter text's prefix picks the match mode:
//!
//! | Prefix      | Passes when                                  |
//! |-------------|----------------------------------------------|
//! | `==<regex>` | the regex is found in the unit text          |
//! | `=!<regex>` | the regex is not found in the unit text      |
//! | `~=<text>`  | the unit text contains `<text>`              |
//! | `~!<text>`  | the unit text does not contain `<text>`      |
//! | `#a#b#`     | the unit id is one of `a`, `b`               |
//! | *(none)*    | the unit text contains the whole filter text |

use regex::Regex;

use crate::error::{Result, SmokeError};

const REGEX_MATCH: &str = "==";
const REGEX_NO_MATCH: &str = "=!";
const CONTAINS: &str = "~=";
const NOT_CONTAINS: &str = "~!";
const ID_DELIMITER: char = '#';

/// Parsed filter predicate.
#[derive(Debug, Clone)]
pub enum SelectionFilter {
    Matches(Regex),
    NotMatches(Regex),
    Contains(String),
    NotContains(String),
    /// Raw `#id#id#` list, matched by looking up `#<id>#`
    Ids(String),
}

impl SelectionFilter {
    /// Parses filter text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty text, a prefix with nothing after
    /// it, or a regex that does not compile.
    ///
    /// # Example
    ///
    /// ```
    /// use smokerunner::selection::SelectionFilter;
    ///
    /// let filter = SelectionFilter::parse("==a.+[0-9]{3}").unwrap();
    /// assert!(filter.is_match("7", "play a123"));
    /// assert!(!filter.is_match("8", "play b"));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(SmokeError::invalid("filter text cannot be empty"));
        }

        if let Some(pattern) = text.strip_prefix(REGEX_MATCH) {
            return Ok(Self::Matches(compile(text, pattern)?));
        }
        if let Some(pattern) = text.strip_prefix(REGEX_NO_MATCH) {
            return Ok(Self::NotMatches(compile(text, pattern)?));
        }
        if let Some(needle) = text.strip_prefix(CONTAINS) {
            return Ok(Self::Contains(non_empty(text, needle)?.to_string()));
        }
        if let Some(needle) = text.strip_prefix(NOT_CONTAINS) {
            return Ok(Self::NotContains(non_empty(text, needle)?.to_string()));
        }
        if text.starts_with(ID_DELIMITER) {
            non_empty(text, text.trim_matches(ID_DELIMITER))?;
            let mut ids = text.to_string();
            if !ids.ends_with(ID_DELIMITER) {
                ids.push(ID_DELIMITER);
            }
            return Ok(Self::Ids(ids));
        }

        Ok(Self::Contains(text.to_string()))
    }

    /// Returns true if the unit with `id` and source `text` passes.
    pub fn is_match(&self, id: &str, text: &str) -> bool {
        match self {
            Self::Matches(re) => re.is_match(text),
            Self::NotMatches(re) => !re.is_match(text),
            Self::Contains(needle) => text.contains(needle.as_str()),
            Self::NotContains(needle) => !text.contains(needle.as_str()),
            Self::Ids(ids) => ids.contains(&format!("{ID_DELIMITER}{id}{ID_DELIMITER}")),
        }
    }
}

fn non_empty<'a>(text: &str, body: &'a str) -> Result<&'a str> {
    if body.is_empty() {
        return Err(SmokeError::invalid(format!(
            "filter [{}] has nothing to match after its prefix",
            text
        )));
    }
    Ok(body)
}

fn compile(text: &str, pattern: &str) -> Result<Regex> {
    let pattern = non_empty(text, pattern)?;
    Regex::new(pattern)
        .map_err(|e| SmokeError::invalid(format!("filter [{}] is not a valid regex: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_match() {
        let filter = SelectionFilter::parse("==a.+[0-9]{3}").unwrap();
        assert!(filter.is_match("1", "play a123"));
        assert!(!filter.is_match("1", "play b"));
    }

    #[test]
    fn test_regex_no_match() {
        let filter = SelectionFilter::parse("=!^curl").unwrap();
        assert!(filter.is_match("1", "wget http://x"));
        assert!(!filter.is_match("1", "curl http://x"));
    }

    #[test]
    fn test_contains_and_not_contains() {
        let contains = SelectionFilter::parse("~=admin").unwrap();
        assert!(contains.is_match("1", "./admin.sh"));
        assert!(!contains.is_match("1", "./user.sh"));

        let not_contains = SelectionFilter::parse("~!admin").unwrap();
        assert!(not_contains.is_match("1", "./user.sh"));
        assert!(!not_contains.is_match("1", "./admin.sh"));
    }

    #[test]
    fn test_plain_text_is_contains() {
        let filter = SelectionFilter::parse("ping").unwrap();
        assert!(filter.is_match("1", "ping -c 1 localhost"));
        assert!(!filter.is_match("1", "curl localhost"));
    }

    #[test]
    fn test_id_list() {
        let filter = SelectionFilter::parse("#3#17#").unwrap();
        assert!(filter.is_match("3", "anything"));
        assert!(filter.is_match("17", "anything"));
        assert!(!filter.is_match("1", "anything"));
        assert!(!filter.is_match("7", "anything"));
    }

    #[test]
    fn test_id_list_without_trailing_delimiter() {
        let filter = SelectionFilter::parse("#ping#admin").unwrap();
        assert!(filter.is_match("admin", ""));
        assert!(filter.is_match("ping", ""));
        assert!(!filter.is_match("heavy", ""));
    }

    #[test]
    fn test_empty_filters_rejected() {
        for text in ["", "==", "=!", "~=", "~!", "#", "##"] {
            assert!(
                matches!(
                    SelectionFilter::parse(text),
                    Err(SmokeError::InvalidArgument(_))
                ),
                "filter [{}]",
                text
            );
        }
    }

    #[test]
    fn test_bad_regex_rejected() {
        let err = SelectionFilter::parse("==a(b").unwrap_err();
        assert!(matches!(err, SmokeError::InvalidArgument(_)));
        assert!(err.to_string().contains("regex"));
    }
}
