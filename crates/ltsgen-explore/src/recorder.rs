//! Sinks for the transitions discovered during a run.

use std::fmt;

use ahash::AHashSet;

use crate::store::StateId;

/// Receives the initial state and every enumerated transition, including
/// transitions into already visited states.
pub trait TransitionRecorder<S, L> {
    fn initial(&mut self, id: StateId, state: &S);
    fn transition(&mut self, from: StateId, from_state: &S, label: &L, to: StateId, to_state: &S);
}

/// Discards everything.
impl<S, L> TransitionRecorder<S, L> for () {
    fn initial(&mut self, _id: StateId, _state: &S) {}
    fn transition(&mut self, _: StateId, _: &S, _: &L, _: StateId, _: &S) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<L> {
    pub from: StateId,
    pub label: L,
    pub to: StateId,
}

/// In-memory transition list keyed by state identity.
#[derive(Debug, Clone)]
pub struct TransitionLog<L> {
    initial: Option<StateId>,
    transitions: Vec<Transition<L>>,
    states: AHashSet<StateId>,
}

impl<L> TransitionLog<L> {
    pub fn new() -> Self {
        Self {
            initial: None,
            transitions: Vec::new(),
            states: AHashSet::new(),
        }
    }

    pub fn initial_id(&self) -> Option<StateId> {
        self.initial
    }

    pub fn transitions(&self) -> &[Transition<L>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Number of distinct identities mentioned.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

impl<L: Clone> TransitionLog<L> {
    /// Renumber identities densely in order of first appearance, starting
    /// with the initial state at 0.
    ///
    /// Bit indices are sparse; this makes them usable as state numbers.
    pub fn compact(&self) -> TransitionLog<L> {
        let mut ids = ahash::AHashMap::new();
        let mut renumber = |id: StateId| {
            let next = ids.len();
            *ids.entry(id).or_insert(next)
        };
        let initial = self.initial.map(&mut renumber);
        let transitions = self
            .transitions
            .iter()
            .map(|t| Transition {
                from: renumber(t.from),
                label: t.label.clone(),
                to: renumber(t.to),
            })
            .collect();
        TransitionLog {
            initial,
            transitions,
            states: ids.into_values().collect(),
        }
    }
}

impl<L> Default for TransitionLog<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, L: Clone> TransitionRecorder<S, L> for TransitionLog<L> {
    fn initial(&mut self, id: StateId, _state: &S) {
        self.initial = Some(id);
        self.states.insert(id);
    }

    fn transition(&mut self, from: StateId, _: &S, label: &L, to: StateId, _: &S) {
        self.states.insert(from);
        self.states.insert(to);
        self.transitions.push(Transition {
            from,
            label: label.clone(),
            to,
        });
    }
}

/// Aldebaran (`.aut`) rendering: a `des (initial, transitions, states)`
/// header followed by one `(from,"label",to)` line per transition.
impl<L: fmt::Display> fmt::Display for TransitionLog<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "des ({}, {}, {})",
            self.initial.unwrap_or(0),
            self.transitions.len(),
            self.states.len()
        )?;
        for t in &self.transitions {
            let label = t.label.to_string().replace('\\', "\\\\").replace('"', "\\\"");
            writeln!(f, "({},\"{}\",{})", t.from, label, t.to)?;
        }
        Ok(())
    }
}
