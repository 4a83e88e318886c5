//! Structured term values for ltsgen.
//!
//! States handed to the explorer are trees of function applications, lists,
//! integers and opaque atoms. Transition labels are named actions carrying
//! term arguments.

pub mod action;
pub mod term;

pub use action::Action;
pub use term::{Term, TermKind};
