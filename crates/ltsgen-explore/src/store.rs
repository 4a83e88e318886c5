//! Exact visited-set for runs where memory permits storing every state.

use std::hash::Hash;

use ahash::AHashMap;

/// Identity handed out for states: a dense id in the exact store, a bit
/// index in the bit-hash table.
pub type StateId = usize;

/// Indexed state set: every distinct state gets the next id in insertion
/// order and keeps it for the lifetime of the store.
///
/// Removing a state only un-marks it; a later insert marks it again under
/// the same id. States are cloned into both the index and the id table, so
/// `S` should be cheap to clone (shared trees).
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    index: AHashMap<S, StateId>,
    states: Vec<S>,
    marked: Vec<bool>,
    marked_count: usize,
}

impl<S: Hash + Eq + Clone> StateStore<S> {
    pub fn new() -> Self {
        Self {
            index: AHashMap::new(),
            states: Vec::new(),
            marked: Vec::new(),
            marked_count: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: AHashMap::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            marked: Vec::with_capacity(capacity),
            marked_count: 0,
        }
    }

    /// Mark `state`. Returns its id and whether it was unmarked before.
    pub fn insert(&mut self, state: &S) -> (StateId, bool) {
        if let Some(&id) = self.index.get(state) {
            if self.marked[id] {
                return (id, false);
            }
            self.marked[id] = true;
            self.marked_count += 1;
            return (id, true);
        }
        let id = self.states.len();
        self.index.insert(state.clone(), id);
        self.states.push(state.clone());
        self.marked.push(true);
        self.marked_count += 1;
        (id, true)
    }

    /// Id of `state` if it was ever inserted, marked or not.
    #[inline]
    pub fn get_id(&self, state: &S) -> Option<StateId> {
        self.index.get(state).copied()
    }

    /// Whether `state` is currently marked.
    pub fn contains(&self, state: &S) -> bool {
        self.get_id(state).is_some_and(|id| self.marked[id])
    }

    /// State that owns `id`.
    pub fn get(&self, id: StateId) -> Option<&S> {
        self.states.get(id)
    }

    /// Un-mark `state`. Returns whether it was marked.
    pub fn remove(&mut self, state: &S) -> bool {
        match self.index.get(state) {
            Some(&id) if self.marked[id] => {
                self.marked[id] = false;
                self.marked_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of states currently marked.
    #[inline]
    pub fn len(&self) -> usize {
        self.marked_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.marked_count == 0
    }

    /// Number of ids handed out so far, including un-marked states.
    pub fn ids_issued(&self) -> usize {
        self.states.len()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.states.clear();
        self.marked.clear();
        self.marked_count = 0;
    }
}

impl<S: Hash + Eq + Clone> Default for StateStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltsgen_term::Term;

    #[test]
    fn test_store_insert() {
        let mut store = StateStore::new();
        let s1 = Term::int(1);
        let s2 = Term::int(2);

        assert_eq!(store.insert(&s1), (0, true));
        assert_eq!(store.insert(&s1), (0, false)); // duplicate
        assert_eq!(store.insert(&s2), (1, true));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1), Some(&s2));
        assert_eq!(store.get_id(&s1), Some(0));
        assert_eq!(store.get_id(&Term::int(3)), None);
    }

    #[test]
    fn test_store_remove_and_reinsert() {
        let mut store = StateStore::with_capacity(4);
        let a = Term::constant("a");
        let b = Term::constant("b");
        store.insert(&a);
        store.insert(&b);

        assert!(store.remove(&a));
        assert!(!store.remove(&a));
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&a));
        assert!(store.contains(&b));
        // The id stays attached to the state.
        assert_eq!(store.get_id(&a), Some(0));
        assert_eq!(store.get(0), Some(&a));

        // Rediscovered states are marked again under their old id.
        assert_eq!(store.insert(&a), (0, true));
        assert_eq!(store.insert(&a), (0, false));
        assert_eq!(store.len(), 2);
        assert_eq!(store.ids_issued(), 2);
    }

    #[test]
    fn test_store_structural_identity() {
        let mut store = StateStore::new();
        let x = Term::appl("s", vec![Term::list(vec![Term::int(1)])]);
        let y = Term::appl("s", vec![Term::list(vec![Term::int(1)])]);
        store.insert(&x);
        assert_eq!(store.insert(&y), (0, false));
        store.clear();
        assert!(store.is_empty());
    }
}
