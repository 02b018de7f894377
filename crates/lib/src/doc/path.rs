//! Dotted path helpers used by the resolver and the serializer.

use crate::constants::PATH_SEPARATOR;

/// Joins a parent path and a local segment. An empty parent is the root.
///
/// ```
/// # use docfields::doc::path::join;
/// assert_eq!(join("", "hp"), "hp");
/// assert_eq!(join("inv.sword", "qty"), "inv.sword.qty");
/// ```
pub fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{segment}")
    }
}

/// Returns true if `path` equals `ancestor` or lies beneath it.
///
/// ```
/// # use docfields::doc::path::is_within;
/// assert!(is_within("inv.sword", "inv"));
/// assert!(is_within("inv", "inv"));
/// assert!(!is_within("inventory", "inv"));
/// ```
pub fn is_within(path: &str, ancestor: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// Checks that a map key can be used as a single path segment.
pub(crate) fn check_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        Err("key is empty")
    } else if segment.contains(PATH_SEPARATOR) {
        Err("key contains a path separator")
    } else if segment.starts_with('$') {
        Err("key starts with '$'")
    } else {
        Ok(())
    }
}
