//! Directive Parsing
//!
//! Recognises the control lines of a text source:
//!
//! ```text
//! #:+: echo always            selection marker (first token)
//! #:-DEV:-SIT: ./check.sh     selection marker with deselected tags
//! #=DEV=Hello from DEV        value assignment for tag DEV
//! #@THREAD_POOL_SIZE@3        global setting
//! ```
//!
//! Any other line is not a directive and never participates.

/// Leader shared by every directive.
pub const COMMENT_LEADER: char = '#';

/// Separates tags inside a selection marker.
pub const TAG_SENTINEL: char = ':';

/// Explicit "select" prefix inside a selection marker.
pub const SELECTED_PREFIX: char = '+';

/// "Do not select" prefix inside a selection marker.
pub const NOT_SELECTED_PREFIX: char = '-';

/// Separates tag and value in a value assignment.
pub const VALUE_SENTINEL: char = '=';

/// Separates name and value in a global setting.
pub const GLOBAL_SENTINEL: char = '@';

/// Shortest line that can carry a value assignment or global setting.
const MIN_ASSIGNMENT_LEN: usize = 5;

/// One parsed control line or declarative run rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Selected for every tag
    SelectAlways,
    /// Selected only for the listed tags
    SelectIfTagIn(Vec<String>),
    /// Selected for every tag except the listed ones
    DeselectIfTagIn(Vec<String>),
    /// Never selected
    Never,
    /// Lowercased `#:...:` first token of a text line, evaluated literally
    TagMarker(String),
    /// Tag-scoped value that carries forward to later units
    ValueAssignment { tag: String, value: String },
    /// Run-wide setting such as pool size or timeout
    GlobalSetting { name: String, value: String },
}

impl Directive {
    /// Parses one source line, returning `None` for ordinary lines.
    pub fn parse(line: &str) -> Option<Self> {
        parse_global_setting(line)
            .or_else(|| parse_value_assignment(line))
            .or_else(|| parse_tag_marker(line))
    }
}

fn parse_tag_marker(line: &str) -> Option<Directive> {
    let token = line.split_whitespace().next()?.to_lowercase();
    let leader: String = [COMMENT_LEADER, TAG_SENTINEL].iter().collect();

    token
        .starts_with(&leader)
        .then(|| Directive::TagMarker(token))
}

fn parse_value_assignment(line: &str) -> Option<Directive> {
    let (tag, value) = split_assignment(line, VALUE_SENTINEL)?;
    Some(Directive::ValueAssignment { tag, value })
}

fn parse_global_setting(line: &str) -> Option<Directive> {
    let (name, value) = split_assignment(line, GLOBAL_SENTINEL)?;
    Some(Directive::GlobalSetting { name, value })
}

/// Splits `#<s><key><s><value>` into key and value.
///
/// The value is everything after the second sentinel and must contain at
/// least one non-sentinel character.
fn split_assignment(line: &str, sentinel: char) -> Option<(String, String)> {
    if line.len() < MIN_ASSIGNMENT_LEN {
        return None;
    }

    let rest = line.strip_prefix(COMMENT_LEADER)?.strip_prefix(sentinel)?;
    let (key, value) = rest.split_once(sentinel)?;

    if key.is_empty() || !value.chars().any(|c| c != sentinel) {
        return None;
    }

    Some((key.to_string(), value.to_string()))
}

/// Returns the text after the first space (or, failing that, the first tab).
///
/// Lines without either separator have no command and yield `""`.
pub fn strip_leading_token(line: &str) -> &str {
    line.find(' ')
        .or_else(|| line.find('\t'))
        .map_or("", |index| &line[index + 1..])
}
