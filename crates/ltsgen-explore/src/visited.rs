//! Common interface over the exact and the lossy visited-set.

use std::hash::Hash;

use crate::bithash::{BitBlock, BitHashTable};
use crate::explorer::{ExploreConfig, ExploreResult};
use crate::hash::Structural;
use crate::store::{StateId, StateStore};

/// Remembers which states have been discovered.
pub trait VisitedSet<S> {
    /// Mark `state`, returning its identity and whether it was unmarked before.
    fn test_and_mark(&mut self, state: &S) -> (StateId, bool);

    /// Un-mark `state` so it can be discovered again.
    fn forget(&mut self, state: &S);

    /// Identity of `state`, if it is known to the set.
    fn state_id(&self, state: &S) -> Option<StateId>;

    /// Number of marked entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether distinct states always get distinct identities.
    fn is_exact(&self) -> bool;

    /// State behind an identity. Only exact sets can answer.
    fn lookup(&self, _id: StateId) -> Option<&S> {
        None
    }
}

impl<S: Structural, B: BitBlock> VisitedSet<S> for BitHashTable<B> {
    fn test_and_mark(&mut self, state: &S) -> (StateId, bool) {
        self.add_state(state)
    }

    fn forget(&mut self, state: &S) {
        self.remove_state(state);
    }

    fn state_id(&self, state: &S) -> Option<StateId> {
        Some(self.state_index(state))
    }

    fn len(&self) -> usize {
        self.count_set()
    }

    fn is_exact(&self) -> bool {
        false
    }
}

impl<S: Hash + Eq + Clone> VisitedSet<S> for StateStore<S> {
    fn test_and_mark(&mut self, state: &S) -> (StateId, bool) {
        self.insert(state)
    }

    fn forget(&mut self, state: &S) {
        self.remove(state);
    }

    fn state_id(&self, state: &S) -> Option<StateId> {
        self.get_id(state)
    }

    fn len(&self) -> usize {
        StateStore::len(self)
    }

    fn is_exact(&self) -> bool {
        true
    }

    fn lookup(&self, id: StateId) -> Option<&S> {
        self.get(id)
    }
}

/// Visited-set chosen at runtime from an [`ExploreConfig`].
#[derive(Debug, Clone)]
pub enum VisitedStates<S> {
    Exact(StateStore<S>),
    BitHash(BitHashTable),
}

impl<S: Structural + Hash + Eq + Clone> VisitedStates<S> {
    /// A bit-hash table when `bithash_table_size` is set, the exact store
    /// otherwise.
    pub fn from_config(config: &ExploreConfig) -> ExploreResult<Self> {
        config.validate()?;
        Ok(match config.bithash_table_size {
            Some(size) => VisitedStates::BitHash(BitHashTable::with_width(size, config.hash_width)),
            None => VisitedStates::Exact(StateStore::new()),
        })
    }
}

impl<S: Structural + Hash + Eq + Clone> VisitedSet<S> for VisitedStates<S> {
    fn test_and_mark(&mut self, state: &S) -> (StateId, bool) {
        match self {
            VisitedStates::Exact(store) => store.test_and_mark(state),
            VisitedStates::BitHash(table) => table.test_and_mark(state),
        }
    }

    fn forget(&mut self, state: &S) {
        match self {
            VisitedStates::Exact(store) => store.forget(state),
            VisitedStates::BitHash(table) => VisitedSet::<S>::forget(table, state),
        }
    }

    fn state_id(&self, state: &S) -> Option<StateId> {
        match self {
            VisitedStates::Exact(store) => store.state_id(state),
            VisitedStates::BitHash(table) => table.state_id(state),
        }
    }

    fn len(&self) -> usize {
        match self {
            VisitedStates::Exact(store) => store.len(),
            VisitedStates::BitHash(table) => table.count_set(),
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, VisitedStates::Exact(_))
    }

    fn lookup(&self, id: StateId) -> Option<&S> {
        match self {
            VisitedStates::Exact(store) => store.get(id),
            VisitedStates::BitHash(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltsgen_term::Term;

    #[test]
    fn test_from_config() {
        let exact: VisitedStates<Term> = VisitedStates::from_config(&ExploreConfig::default()).unwrap();
        assert!(exact.is_exact());

        let config = ExploreConfig {
            bithash_table_size: Some(64),
            ..Default::default()
        };
        let lossy: VisitedStates<Term> = VisitedStates::from_config(&config).unwrap();
        assert!(!lossy.is_exact());

        let bad = ExploreConfig {
            bithash_table_size: Some(0),
            ..Default::default()
        };
        assert!(VisitedStates::<Term>::from_config(&bad).is_err());
    }

    #[test]
    fn test_same_contract_both_modes() {
        let config = ExploreConfig {
            bithash_table_size: Some(1_000_003),
            ..Default::default()
        };
        let sets: Vec<VisitedStates<Term>> = vec![
            VisitedStates::from_config(&ExploreConfig::default()).unwrap(),
            VisitedStates::from_config(&config).unwrap(),
        ];
        for mut set in sets {
            let a = Term::appl("p", vec![Term::int(1)]);
            let (id, is_new) = set.test_and_mark(&a);
            assert!(is_new);
            assert_eq!(set.test_and_mark(&a), (id, false));
            assert_eq!(set.state_id(&a), Some(id));
            assert_eq!(set.len(), 1);

            set.forget(&a);
            assert!(set.is_empty());
            assert!(set.test_and_mark(&a).1);
        }
    }

    #[test]
    fn test_lookup_only_exact() {
        let mut store = StateStore::new();
        let a = Term::constant("a");
        let (id, _) = VisitedSet::test_and_mark(&mut store, &a);
        assert_eq!(VisitedSet::lookup(&store, id), Some(&a));

        let mut table = BitHashTable::new(17);
        let (idx, _) = table.test_and_mark(&a);
        assert_eq!(VisitedSet::<Term>::lookup(&table, idx), None);
    }
}
