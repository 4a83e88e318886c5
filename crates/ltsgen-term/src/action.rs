//! Transition labels.

use std::fmt;
use std::sync::Arc;

use crate::term::Term;

/// A named action with term arguments, printed as `name(args...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    name: Arc<str>,
    args: Arc<[Term]>,
}

impl Action {
    pub fn new(name: impl Into<Arc<str>>, args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            args: Arc::from(args),
        }
    }

    /// Action without arguments.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The internal (unobservable) action.
    pub fn tau() -> Self {
        Self::named("tau")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
