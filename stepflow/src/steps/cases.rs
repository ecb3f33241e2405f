//! Keyed continuations handed to Switch and MultiFork steps.

use crate::mode::{Mode, Next};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

/// Bounds every case key must satisfy.
pub trait CaseKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<K> CaseKey for K where K: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Compiled branches of a keyed step, indexed by case key.
///
/// Cloning is cheap; the table is shared.
pub struct Cases<K, T, M: Mode> {
    branches: Arc<HashMap<K, Next<T, M>>>,
}

impl<K: CaseKey, T, M: Mode> Cases<K, T, M> {
    /// Creates a case table from `(key, continuation)` pairs.
    pub fn new(branches: impl IntoIterator<Item = (K, Next<T, M>)>) -> Self {
        Self {
            branches: Arc::new(branches.into_iter().collect()),
        }
    }

    /// Returns the branch for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&Next<T, M>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.branches.get(key)
    }

    /// Returns the branch for `key`, or `default` when no case matches.
    ///
    /// Exactly one continuation comes back, so a step that calls the
    /// result routes to exactly one branch.
    pub fn select<'a, Q>(&'a self, key: &Q, default: &'a Next<T, M>) -> &'a Next<T, M>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.branches.get(key).unwrap_or(default)
    }

    /// Returns true if a branch exists for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.branches.contains_key(key)
    }

    /// Returns the case keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.branches.keys()
    }

    /// Returns the number of keyed branches, not counting the default.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns true if there are no keyed branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl<K, T, M: Mode> Clone for Cases<K, T, M> {
    fn clone(&self) -> Self {
        Self {
            branches: Arc::clone(&self.branches),
        }
    }
}

impl<K: Debug, T, M: Mode> Debug for Cases<K, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cases")
            .field("keys", &self.branches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{next_fn, Blocking};

    type M = Blocking<&'static str>;

    fn table() -> Cases<String, (), M> {
        Cases::new([
            ("a".to_string(), next_fn::<(), M, _>(|(), ()| "branch a")),
            ("b".to_string(), next_fn::<(), M, _>(|(), ()| "branch b")),
        ])
    }

    #[test]
    fn test_select_matching_case() {
        let cases = table();
        let default = next_fn::<(), M, _>(|(), ()| "default");

        assert_eq!(cases.select("a", &default)((), ()), "branch a");
        assert_eq!(cases.select("b", &default)((), ()), "branch b");
    }

    #[test]
    fn test_select_falls_back_to_default() {
        let cases = table();
        let default = next_fn::<(), M, _>(|(), ()| "default");

        assert_eq!(cases.select("zzz", &default)((), ()), "default");
        assert_eq!(cases.select("", &default)((), ()), "default");
    }

    #[test]
    fn test_lookup_helpers() {
        let cases = table();
        assert_eq!(cases.len(), 2);
        assert!(!cases.is_empty());
        assert!(cases.contains_key("a"));
        assert!(cases.get("c").is_none());

        let mut keys: Vec<_> = cases.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
