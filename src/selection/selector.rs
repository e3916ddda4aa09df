//! Tag Selection
//!
//! Decides whether a directive selects its unit for a run tag, and folds
//! value assignments into the carried-forward override value. Tag matching
//! is case-insensitive.

use log::trace;

use super::directive::{Directive, NOT_SELECTED_PREFIX, SELECTED_PREFIX, TAG_SENTINEL};

/// Returns true if `directive` selects its unit for `tag`.
///
/// Value assignments and global settings never select anything.
pub fn should_select(tag: &str, directive: &Directive) -> bool {
    match directive {
        Directive::SelectAlways => true,
        Directive::Never => false,
        Directive::SelectIfTagIn(tags) => contains_tag(tags, tag),
        Directive::DeselectIfTagIn(tags) => !contains_tag(tags, tag),
        Directive::TagMarker(token) => marker_selects(token, tag),
        Directive::ValueAssignment { .. } | Directive::GlobalSetting { .. } => false,
    }
}

/// Returns the override value in effect after `directive`.
///
/// A value assignment for `tag` replaces `current`; anything else keeps it.
pub fn fold_override(tag: &str, directive: &Directive, current: Option<String>) -> Option<String> {
    match directive {
        Directive::ValueAssignment {
            tag: assigned,
            value,
        } if same_tag(assigned, tag) => Some(value.clone()),
        _ => current,
    }
}

fn same_tag(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn contains_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| same_tag(t, tag))
}

/// Evaluates a `#:...:` marker token; the first matching rule wins.
///
/// When both plain and `-` sub-tokens are present and the plain list is
/// non-empty, only the plain list decides.
fn marker_selects(token: &str, tag: &str) -> bool {
    let token = token.to_lowercase();
    let tag = tag.to_lowercase();
    let s = TAG_SENTINEL;

    if token.contains(&format!("{s}{NOT_SELECTED_PREFIX}{s}")) {
        return false;
    }
    if token.contains(&format!("{s}{NOT_SELECTED_PREFIX}{tag}{s}")) {
        return false;
    }
    if token.contains(&format!("{s}{SELECTED_PREFIX}{s}")) {
        return true;
    }
    if token.contains(&format!("{s}{tag}{s}")) {
        return true;
    }
    if token.contains(&format!("{s}{SELECTED_PREFIX}{tag}{s}")) {
        return true;
    }

    // Mixed markers: split into selected and deselected tags
    let (deselected, selected): (Vec<&str>, Vec<&str>) = token
        .get(1..)
        .unwrap_or_default()
        .split(TAG_SENTINEL)
        .filter(|piece| !piece.is_empty())
        .partition(|piece| piece.starts_with(NOT_SELECTED_PREFIX));

    let selected: Vec<&str> = selected
        .into_iter()
        .map(|piece| piece.strip_prefix(SELECTED_PREFIX).unwrap_or(piece))
        .collect();

    trace!(
        "Marker [{}]: selected {:?}, deselected {:?}, tag [{}]",
        token,
        selected,
        deselected,
        tag
    );

    selected.is_empty() || selected.contains(&tag.as_str())
}
