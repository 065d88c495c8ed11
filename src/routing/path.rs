//! Path normalization and joining.
//!
//! # Responsibilities
//! - Normalize base paths and route templates to canonical form
//! - Join a router's base path with a relative route path
//! - Decide whether one base path is nested under another
//!
//! # Design Decisions
//! - Canonical form: exactly one leading `/`, no empty segments, no trailing
//!   `/` except for the root
//! - Already-canonical input is returned borrowed
//! - Pure functions, no allocation beyond the normalized output

use std::borrow::Cow;

/// Returns true if `path` is already in canonical form.
pub fn is_canonical(path: &str) -> bool {
    if !path.starts_with('/') || path.contains("//") {
        return false;
    }
    path == "/" || !path.ends_with('/')
}

/// Normalize a path to canonical form.
///
/// ```
/// use strata::routing::path::normalize;
///
/// assert_eq!(normalize("/users"), "/users");
/// assert_eq!(normalize("users/"), "/users");
/// assert_eq!(normalize("//api///v1/"), "/api/v1");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> Cow<'_, str> {
    if is_canonical(path) {
        return Cow::Borrowed(path);
    }

    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    Cow::Owned(format!("/{joined}"))
}

/// Join a base path and a route path into one canonical absolute path.
pub fn join(base: &str, path: &str) -> String {
    let base = normalize(base);
    let path = normalize(path);

    match (base.as_ref(), path.as_ref()) {
        ("/", p) => p.to_owned(),
        (b, "/") => b.to_owned(),
        (b, p) => format!("{b}{p}"),
    }
}

/// Returns true if `base` equals `parent` or lies beneath it segment-wise.
///
/// Every base path lies under the root.
pub fn is_nested_under(base: &str, parent: &str) -> bool {
    let base = normalize(base);
    let parent = normalize(parent);

    if parent == "/" || base == parent {
        return true;
    }

    base.strip_prefix(parent.as_ref())
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_paths_are_borrowed() {
        assert!(matches!(normalize("/"), Cow::Borrowed("/")));
        assert!(matches!(normalize("/api/users"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_fixes_slashes() {
        assert_eq!(normalize("api"), "/api");
        assert_eq!(normalize("/api/"), "/api");
        assert_eq!(normalize("/api//users///:id"), "/api/users/:id");
        assert_eq!(normalize("///"), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "/users"), "/users");
        assert_eq!(join("", "users"), "/users");
        assert_eq!(join("/api", "/users/:id"), "/api/users/:id");
        assert_eq!(join("/api/", "users/"), "/api/users");
        assert_eq!(join("/api", ""), "/api");
        assert_eq!(join("/", ""), "/");
    }

    #[test]
    fn test_nested_under() {
        assert!(is_nested_under("/api/users", "/api"));
        assert!(is_nested_under("/api", "/api"));
        assert!(is_nested_under("/anything", "/"));
        assert!(!is_nested_under("/apiv2", "/api"));
        assert!(!is_nested_under("/", "/api"));
    }
}
