//! Bounded-memory state-space exploration.
//!
//! Breadth-first generation of a labelled transition system from a
//! successor function, with an optional lossy bit-hash visited-set and a
//! frontier that falls back to reservoir sampling once it reaches its
//! memory ceiling.

pub mod bithash;
pub mod explorer;
pub mod generator;
pub mod hash;
pub mod queue;
pub mod recorder;
pub mod store;
pub mod visited;

pub use bithash::{BitBlock, BitHashTable};
pub use explorer::{
    explore, explore_bithash, Completeness, Deadlock, Detection, ExploreConfig, ExploreError,
    ExploreResult, ExploreStats, Explorer, FailedState, ProgressCounters, RunStatus, RunSummary, Trace, Walk,
};
pub use generator::{from_fn, FnGenerator, GeneratorError, Label, SuccessorGenerator};
pub use hash::{Digest, HashWidth, Node, Structural, StructuralHasher};
pub use queue::FrontierQueue;
pub use recorder::{Transition, TransitionLog, TransitionRecorder};
pub use store::{StateId, StateStore};
pub use visited::{VisitedSet, VisitedStates};
