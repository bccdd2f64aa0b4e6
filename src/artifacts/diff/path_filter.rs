use crate::artifacts::core::components;
use std::collections::HashMap;
use std::hash::Hash;

/// Restricts diffs and lookups to a set of path prefixes
#[derive(Debug, Clone)]
pub struct PathFilter {
    path_trie: Trie<String>,
}

impl PathFilter {
    /// Filter that lets every path through
    pub fn all() -> Self {
        Self {
            path_trie: Trie::with_matching(true),
        }
    }

    /// Filter on path prefixes; no prefixes means no restriction
    pub fn new(paths: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut trie = Trie::new();
        let mut any = false;
        for path in paths {
            let parts = components(path.as_ref())
                .map(str::to_string)
                .collect::<Vec<_>>();
            trie.insert(&parts);
            any = true;
        }

        if any { Self { path_trie: trie } } else { Self::all() }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.path_trie.is_matching
    }

    /// Whether `path` equals a filter path or lies below one
    pub fn matches(&self, path: &str) -> bool {
        let parts = components(path).map(str::to_string).collect::<Vec<_>>();
        self.path_trie.contains_prefix_of(&parts)
    }

    /// Whether a tree at `path` can hold something the filter matches
    pub fn may_contain(&self, path: &str) -> bool {
        let parts = components(path).map(str::to_string).collect::<Vec<_>>();
        self.path_trie.contains_prefix_of(&parts) || self.path_trie.has_branch(&parts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trie<T: Hash + Eq + Clone> {
    is_matching: bool,
    children: HashMap<T, Trie<T>>,
}

impl<T: Hash + Eq + Clone> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> Trie<T> {
    pub fn new() -> Self {
        Trie {
            is_matching: false,
            children: HashMap::new(),
        }
    }

    pub fn with_matching(is_matching: bool) -> Self {
        Trie {
            is_matching,
            children: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: &[T]) {
        let mut node = self;
        for part in path {
            node = node.children.entry(part.clone()).or_default();
        }
        node.is_matching = true;
    }

    pub fn contains(&self, path: &[T]) -> bool {
        let mut node = self;
        for part in path {
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_matching
    }

    /// Some inserted path is a prefix of (or equal to) `path`
    pub fn contains_prefix_of(&self, path: &[T]) -> bool {
        let mut node = self;
        if node.is_matching {
            return true;
        }
        for part in path {
            match node.children.get(part) {
                Some(child) if child.is_matching => return true,
                Some(child) => node = child,
                None => return false,
            }
        }
        false
    }

    /// `path` is a prefix of some inserted path
    pub fn has_branch(&self, path: &[T]) -> bool {
        let mut node = self;
        for part in path {
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trie_does_not_match_partial_path() {
        let mut trie = Trie::new();
        let path = vec!["roads", "highways", "101"];
        trie.insert(&path);

        assert!(trie.contains(&path));
        assert!(!trie.contains(&["roads"]));
        assert!(trie.has_branch(&["roads", "highways"]));
        assert!(!trie.has_branch(&["rivers"]));
    }

    #[test]
    fn trie_contains_prefix_of_longer_paths() {
        let mut trie = Trie::new();
        trie.insert(&["roads"]);

        assert!(trie.contains_prefix_of(&["roads", "1"]));
        assert!(trie.contains_prefix_of(&["roads"]));
        assert!(!trie.contains_prefix_of(&["rivers", "1"]));
    }

    #[test]
    fn unrestricted_filter_matches_everything() {
        let filter = PathFilter::new(Vec::<String>::new());

        assert!(filter.is_unrestricted());
        assert!(filter.matches("anything/at/all"));
        assert!(filter.may_contain(""));
    }

    #[test]
    fn filter_matches_paths_below_a_prefix() {
        let filter = PathFilter::new(["roads/highways"]);

        assert!(filter.matches("roads/highways"));
        assert!(filter.matches("roads/highways/101"));
        assert!(!filter.matches("roads"));
        assert!(!filter.matches("roads/streets/1"));
    }

    #[test]
    fn filter_descends_into_trees_above_a_prefix() {
        let filter = PathFilter::new(["roads/highways/101", "rivers"]);

        assert!(filter.may_contain(""));
        assert!(filter.may_contain("roads"));
        assert!(filter.may_contain("roads/highways"));
        assert!(filter.may_contain("rivers/nile"));
        assert!(!filter.may_contain("roads/streets"));
        assert!(!filter.may_contain("lakes"));
    }
}
