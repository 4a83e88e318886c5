//! The successor-generation seam.
//!
//! The explorer never computes transitions itself: a generator turns a state
//! into a finite, lazily produced sequence of `(label, next_state)` pairs.

use std::fmt;
use std::marker::PhantomData;

use ltsgen_term::Action;
use thiserror::Error;

/// Failure reported by a successor generator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GeneratorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A printable transition tag.
pub trait Label: Clone + fmt::Display {
    /// Name used to match the label against detection requests.
    fn action_name(&self) -> &str;
}

impl Label for Action {
    fn action_name(&self) -> &str {
        self.name()
    }
}

impl Label for String {
    fn action_name(&self) -> &str {
        self
    }
}

impl Label for &'static str {
    fn action_name(&self) -> &str {
        self
    }
}

/// Produces the outgoing transitions of a state.
///
/// Each call must yield a finite sequence and must not mutate the state. An
/// error, either up front or from the sequence, ends the exploration.
pub trait SuccessorGenerator {
    type State;
    type Label;
    type Successors<'a>: Iterator<Item = Result<(Self::Label, Self::State), GeneratorError>>
    where
        Self: 'a;

    fn successors<'a>(
        &'a self,
        state: &'a Self::State,
    ) -> Result<Self::Successors<'a>, GeneratorError>;
}

type Wrap<L, S> = fn((L, S)) -> Result<(L, S), GeneratorError>;

/// Generator backed by a closure returning all successors at once.
pub struct FnGenerator<S, L, F> {
    f: F,
    _marker: PhantomData<fn(&S) -> (L, S)>,
}

/// Wrap a closure as a [`SuccessorGenerator`].
pub fn from_fn<S, L, F>(f: F) -> FnGenerator<S, L, F>
where
    F: Fn(&S) -> Result<Vec<(L, S)>, GeneratorError>,
{
    FnGenerator {
        f,
        _marker: PhantomData,
    }
}

impl<S, L, F> SuccessorGenerator for FnGenerator<S, L, F>
where
    F: Fn(&S) -> Result<Vec<(L, S)>, GeneratorError>,
{
    type State = S;
    type Label = L;
    type Successors<'a>
        = std::iter::Map<std::vec::IntoIter<(L, S)>, Wrap<L, S>>
    where
        Self: 'a;

    fn successors<'a>(&'a self, state: &'a S) -> Result<Self::Successors<'a>, GeneratorError> {
        let wrap: Wrap<L, S> = Ok;
        Ok((self.f)(state)?.into_iter().map(wrap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_generator() {
        let generator = from_fn(|n: &u32| {
            if *n > 2 {
                return Err(GeneratorError::new("too big"));
            }
            Ok(vec![("inc", n + 1), ("dbl", n * 2)])
        });
        let succ: Vec<_> = generator
            .successors(&1)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(succ, vec![("inc", 2), ("dbl", 2)]);
        let err = generator.successors(&3).err().unwrap();
        assert_eq!(err.to_string(), "too big");
    }

    #[test]
    fn test_generator_error_source() {
        use std::error::Error;
        let io = std::io::Error::other("disk");
        let err = GeneratorError::with_source("rewriter failed", io);
        assert_eq!(err.message(), "rewriter failed");
        assert_eq!(err.source().unwrap().to_string(), "disk");
    }

    #[test]
    fn test_label_names() {
        assert_eq!(Action::named("send").action_name(), "send");
        assert_eq!("tau".action_name(), "tau");
        assert_eq!(String::from("recv").action_name(), "recv");
    }
}
