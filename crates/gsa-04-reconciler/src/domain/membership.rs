//! Member list set operations.
//!
//! Slack member lists are small id vectors with unique entries, compared and
//! edited without allocating intermediate sets.

use std::collections::HashSet;

/// Whether `item` appears in `list` by exact equality.
pub fn contains(list: &[String], item: &str) -> bool {
    list.iter().any(|i| i == item)
}

/// Order-independent equality of two lists with unique elements.
pub fn equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let existing: HashSet<&str> = a.iter().map(String::as_str).collect();
    b.iter().all(|v| existing.contains(v.as_str()))
}

/// Copy of `list` without the first occurrence of `item`.
pub fn remove(list: &[String], item: &str) -> Vec<String> {
    let mut out = list.to_vec();
    if let Some(pos) = out.iter().position(|v| v == item) {
        out.remove(pos);
    }
    out
}
