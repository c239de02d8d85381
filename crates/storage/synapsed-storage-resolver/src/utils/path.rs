//! Namespace to file-system path mapping

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Longest file name most file systems accept, in bytes
const MAX_COMPONENT_LEN: usize = 255;

static WINDOWS_RESERVED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").expect("valid regex")
});

fn is_namespace_separator(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '|')
}

fn is_illegal(c: char) -> bool {
    matches!(c, '?' | '<' | '>' | '*' | '"' | '\'' | '^') || c.is_control()
}

fn sanitize_component(raw: &str) -> String {
    if raw.is_empty() {
        return "_".to_string();
    }
    // `.` and `..` would walk the tree
    if raw.chars().all(|c| c == '.') {
        return "_".repeat(raw.len());
    }
    if WINDOWS_RESERVED.is_match(raw) {
        return "_".to_string();
    }

    let mut component: String = raw.chars().map(|c| if is_illegal(c) { '_' } else { c }).collect();

    let leading = component.len() - component.trim_start_matches(' ').len();
    let trailing = component.len() - component.trim_end_matches(' ').len();
    if leading + trailing > 0 {
        let inner = component.trim_matches(' ');
        let inner_is_empty = inner.is_empty();
        component = format!("{}{}{}", "_".repeat(leading), inner, "_".repeat(trailing));
        if inner_is_empty {
            // All spaces: both counts cover the same characters
            component = "_".repeat(leading);
        }
    }

    if component.len() > MAX_COMPONENT_LEN {
        let mut end = MAX_COMPONENT_LEN;
        while !component.is_char_boundary(end) {
            end -= 1;
        }
        component.truncate(end);
    }
    component
}

/// Map a namespace to a relative, file-system safe path.
///
/// Namespace separators (`/ \ : |`) become directory levels, so `kv:users`
/// maps to `kv/users`. The result never contains `..` components and is
/// never absolute. The same namespace always maps to the same path.
pub fn sanitize_path(namespace: &str) -> PathBuf {
    namespace
        .split(is_namespace_separator)
        .map(sanitize_component)
        .collect()
}

/// Root directory for `namespace` under `root`
pub fn join_namespace(root: impl AsRef<Path>, namespace: &str) -> PathBuf {
    root.as_ref().join(sanitize_path(namespace))
}
