//! Built-in parameterised systems.
//!
//! States are plain terms; integers encode local state so the structural
//! hash can tell states apart.

use clap::ValueEnum;
use ltsgen_explore::{GeneratorError, SuccessorGenerator};
use ltsgen_term::{Action, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// `size` states in a single cycle
    Ring,
    /// `size` independent counters, each bounded by `max`
    Counters,
    /// Infinite binary tree of integers
    Tree,
    /// Dining philosophers around a table of `size` seats
    Philosophers,
}

/// A model instance: kind plus parameters.
#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub kind: ModelKind,
    pub size: usize,
    pub max: i64,
}

type Step = Result<(Action, Term), GeneratorError>;

impl Model {
    pub fn new(kind: ModelKind, size: usize, max: i64) -> Self {
        Self { kind, size, max }
    }

    pub fn initial(&self) -> Term {
        match self.kind {
            ModelKind::Ring => Term::appl("ring", vec![Term::int(0)]),
            ModelKind::Counters => Term::appl("c", vec![Term::int(0); self.size]),
            ModelKind::Tree => Term::appl("n", vec![Term::int(0)]),
            ModelKind::Philosophers => Term::appl(
                "table",
                vec![
                    Term::list(vec![Term::int(THINKING); self.size]),
                    Term::list(vec![Term::int(FREE); self.size]),
                ],
            ),
        }
    }

    fn ring(&self, state: &Term) -> Result<Vec<Step>, GeneratorError> {
        let k = int_arg(state, 0)?;
        let next = (k + 1) % self.size as i64;
        Ok(vec![Ok((Action::named("next"), Term::appl("ring", vec![Term::int(next)])))])
    }

    fn counters(&self, state: &Term) -> Result<Vec<Step>, GeneratorError> {
        let values = state.children();
        let mut out = Vec::new();
        for (i, value) in values.iter().enumerate() {
            let v = value.as_int().ok_or_else(|| malformed(state))?;
            if v < self.max {
                let mut next = values.to_vec();
                next[i] = Term::int(v + 1);
                out.push(Ok((
                    Action::new("inc", vec![Term::int(i as i64)]),
                    Term::appl("c", next),
                )));
            }
        }
        Ok(out)
    }

    /// Children are produced lazily; the overflow error surfaces as an item.
    fn tree(&self, state: &Term) -> Result<Vec<Step>, GeneratorError> {
        let k = int_arg(state, 0)?;
        Ok([("left", 1), ("right", 2)]
            .into_iter()
            .map(|(name, offset)| -> Step {
                let child = k
                    .checked_mul(2)
                    .and_then(|v| v.checked_add(offset))
                    .ok_or_else(|| GeneratorError::new(format!("n({k}) has no {name} child: overflow")))?;
                Ok((Action::named(name), Term::appl("n", vec![Term::int(child)])))
            })
            .collect())
    }

    fn philosophers(&self, state: &Term) -> Result<Vec<Step>, GeneratorError> {
        let [phils, forks] = state.children() else {
            return Err(malformed(state));
        };
        let phils = ints(phils).ok_or_else(|| malformed(state))?;
        let forks = ints(forks).ok_or_else(|| malformed(state))?;
        let n = phils.len();
        let mut out = Vec::new();
        for i in 0..n {
            let (left, right) = (i, (i + 1) % n);
            let mut p = phils.clone();
            let mut f = forks.clone();
            let name = match phils[i] {
                THINKING if forks[left] == FREE => {
                    p[i] = HUNGRY;
                    f[left] = TAKEN;
                    "take_left"
                }
                HUNGRY if forks[right] == FREE => {
                    p[i] = EATING;
                    f[right] = TAKEN;
                    "take_right"
                }
                EATING => {
                    p[i] = THINKING;
                    f[left] = FREE;
                    f[right] = FREE;
                    "release"
                }
                _ => continue,
            };
            out.push(Ok((
                Action::new(name, vec![Term::int(i as i64)]),
                table(&p, &f),
            )));
        }
        Ok(out)
    }
}

const THINKING: i64 = 0;
const HUNGRY: i64 = 1;
const EATING: i64 = 2;
const FREE: i64 = 0;
const TAKEN: i64 = 1;

fn table(phils: &[i64], forks: &[i64]) -> Term {
    let list = |xs: &[i64]| Term::list(xs.iter().copied().map(Term::int).collect());
    Term::appl("table", vec![list(phils), list(forks)])
}

fn ints(t: &Term) -> Option<Vec<i64>> {
    t.children().iter().map(Term::as_int).collect()
}

fn int_arg(state: &Term, i: usize) -> Result<i64, GeneratorError> {
    state
        .children()
        .get(i)
        .and_then(Term::as_int)
        .ok_or_else(|| malformed(state))
}

fn malformed(state: &Term) -> GeneratorError {
    GeneratorError::new(format!("malformed state {state}"))
}

impl SuccessorGenerator for Model {
    type State = Term;
    type Label = Action;
    type Successors<'a> = std::vec::IntoIter<Step>;

    fn successors<'a>(&'a self, state: &'a Term) -> Result<Self::Successors<'a>, GeneratorError> {
        let steps = match self.kind {
            ModelKind::Ring => self.ring(state)?,
            ModelKind::Counters => self.counters(state)?,
            ModelKind::Tree => self.tree(state)?,
            ModelKind::Philosophers => self.philosophers(state)?,
        };
        Ok(steps.into_iter())
    }
}
