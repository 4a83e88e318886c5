//! Tree/list shaped term values.
//!
//! `Term` is cheap to clone: composite nodes share their children through
//! `Arc`, so handing a state to the frontier or a transition log is a
//! refcount increment rather than a deep copy.

use std::fmt;
use std::sync::Arc;

/// A structured value: application, list, integer or atom.
///
/// Equality, ordering and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// Function application `head(args...)`. Zero arguments is a constant.
    Appl { head: Arc<str>, args: Arc<[Term]> },
    /// Ordered list `[items...]`.
    List(Arc<[Term]>),
    /// Machine integer leaf.
    Int(i64),
    /// Any other atomic leaf (string literals, placeholders, blobs).
    Atom(Arc<str>),
}

/// Node kind of a term, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Appl,
    List,
    Int,
    Atom,
}

impl Term {
    #[inline]
    pub fn int(n: i64) -> Self {
        Term::Int(n)
    }

    pub fn atom(text: impl Into<Arc<str>>) -> Self {
        Term::Atom(text.into())
    }

    /// Constant: application without arguments.
    pub fn constant(head: impl Into<Arc<str>>) -> Self {
        Term::Appl {
            head: head.into(),
            args: Arc::from(Vec::new()),
        }
    }

    pub fn appl(head: impl Into<Arc<str>>, args: Vec<Term>) -> Self {
        Term::Appl {
            head: head.into(),
            args: Arc::from(args),
        }
    }

    pub fn list(items: Vec<Term>) -> Self {
        Term::List(Arc::from(items))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Appl { .. } => TermKind::Appl,
            Term::List(_) => TermKind::List,
            Term::Int(_) => TermKind::Int,
            Term::Atom(_) => TermKind::Atom,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Head symbol of an application.
    pub fn head(&self) -> Option<&str> {
        match self {
            Term::Appl { head, .. } => Some(head),
            _ => None,
        }
    }

    /// Arguments of an application or elements of a list; empty for leaves.
    pub fn children(&self) -> &[Term] {
        match self {
            Term::Appl { args, .. } => args,
            Term::List(items) => items,
            Term::Int(_) | Term::Atom(_) => &[],
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Term::size).sum::<usize>()
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Term::Int(n)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
    for (i, t) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", t)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Appl { head, args } if args.is_empty() => write!(f, "{}", head),
            Term::Appl { head, args } => {
                write!(f, "{}(", head)?;
                write_seq(f, args)?;
                write!(f, ")")
            }
            Term::List(items) => {
                write!(f, "[")?;
                write_seq(f, items)?;
                write!(f, "]")
            }
            Term::Int(n) => write!(f, "{}", n),
            Term::Atom(text) => write!(f, "{:?}", text),
        }
    }
}
