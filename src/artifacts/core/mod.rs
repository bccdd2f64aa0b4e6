//! Core utilities and shared types
//!
//! Feature paths are `/`-separated node names relative to the root tree, e.g.
//! `roads/highways/101`. The empty string is the root itself.

use std::cmp::Ordering;

pub const PATH_SEPARATOR: char = '/';

/// Append a node name to a parent path
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{name}")
    }
}

/// Split a path into its parent path and final name
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once(PATH_SEPARATOR) {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|part| !part.is_empty())
}

/// Component-wise ordering: a tree sorts right before everything below it
pub fn path_cmp(left: &str, right: &str) -> Ordering {
    components(left).cmp(components(right))
}

/// Whether `path` equals `ancestor` or lies below it
pub fn is_under(path: &str, ancestor: &str) -> bool {
    let mut path_parts = components(path);
    components(ancestor).all(|part| path_parts.next() == Some(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", "a/b", Ordering::Less)]
    #[case("a/b", "a-b", Ordering::Less)]
    #[case("a/z", "b", Ordering::Less)]
    #[case("roads/1", "roads/1", Ordering::Equal)]
    #[case("roads/2", "roads/10", Ordering::Greater)]
    fn paths_order_component_wise(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(path_cmp(left, right), expected);
    }

    #[test]
    fn child_and_split_are_inverse() {
        let path = child_path("layer/parcels", "42");

        assert_eq!(path, "layer/parcels/42");
        assert_eq!(split_path(&path), ("layer/parcels", "42"));
        assert_eq!(split_path("42"), ("", "42"));
        assert_eq!(child_path("", "layer"), "layer");
    }

    #[test]
    fn under_matches_whole_components_only() {
        assert!(is_under("roads/1", "roads"));
        assert!(is_under("roads", "roads"));
        assert!(is_under("roads", ""));
        assert!(!is_under("roadsigns/1", "roads"));
        assert!(!is_under("roads", "roads/1"));
    }
}
