//! Level-by-level exploration driver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use memory_stats::memory_stats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::bithash::BitHashTable;
use crate::generator::{GeneratorError, Label, SuccessorGenerator};
use crate::hash::HashWidth;
use crate::queue::FrontierQueue;
use crate::recorder::{TransitionLog, TransitionRecorder};
use crate::store::StateId;
use crate::visited::{VisitedSet, VisitedStates};

/// Returns current process memory usage in MB, or None if unavailable.
fn current_memory_mb() -> Option<usize> {
    memory_stats().map(|stats| stats.physical_mem / (1024 * 1024))
}

/// Exploration error.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("successor generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("no trace available for state {id}")]
    TraceUnavailable { id: StateId },
}

pub type ExploreResult<T> = Result<T, ExploreError>;

/// Path from the initial state: each state with the label that reached it.
pub type Trace<S, L> = Vec<(S, Option<L>)>;

/// Live counters the driver publishes while it runs. Readers may poll them
/// from another thread.
pub struct ProgressCounters {
    pub explored: AtomicUsize,
    pub seen: AtomicUsize,
    pub level: AtomicUsize,
    pub frontier: AtomicUsize,
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self {
            explored: AtomicUsize::new(0),
            seen: AtomicUsize::new(0),
            level: AtomicUsize::new(0),
            frontier: AtomicUsize::new(0),
        }
    }
}

/// Configuration for an exploration run.
#[derive(Clone)]
pub struct ExploreConfig {
    /// Use a bit-hash table of this many bits as visited-set (lossy). `None`
    /// keeps every state exactly.
    pub bithash_table_size: Option<usize>,
    /// Accumulator width of the structural hash.
    pub hash_width: HashWidth,
    /// Ceiling on the states stored for the next level (`None` = unbounded).
    pub frontier_max_capacity: Option<usize>,
    /// Seed for reservoir sampling and random walks.
    pub seed: u64,
    /// Maximum number of states to explore (0 = unlimited).
    pub max_states: usize,
    /// Maximum memory usage in MB (0 = unlimited).
    pub memory_limit_mb: usize,
    /// Report states without outgoing transitions.
    pub detect_deadlock: bool,
    /// Report transitions whose action name is in this list.
    pub detect_actions: Vec<String>,
    /// Stop recording deadlocks and detections after this many of each.
    pub max_traces: usize,
    /// Keep back-pointers so reports carry a trace. Exact mode only.
    pub trace: bool,
    /// Un-mark states the frontier drops so they can be discovered again.
    pub forget_evicted: bool,
    /// Shared counters updated during the run.
    pub progress: Option<Arc<ProgressCounters>>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            bithash_table_size: None,
            hash_width: HashWidth::default(),
            frontier_max_capacity: None,
            seed: 0,
            max_states: 0,
            memory_limit_mb: 0,
            detect_deadlock: false,
            detect_actions: Vec::new(),
            max_traces: 10,
            trace: false,
            forget_evicted: true,
            progress: None,
        }
    }
}

impl std::fmt::Debug for ExploreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExploreConfig")
            .field("bithash_table_size", &self.bithash_table_size)
            .field("hash_width", &self.hash_width)
            .field("frontier_max_capacity", &self.frontier_max_capacity)
            .field("seed", &self.seed)
            .field("max_states", &self.max_states)
            .field("memory_limit_mb", &self.memory_limit_mb)
            .field("detect_deadlock", &self.detect_deadlock)
            .field("detect_actions", &self.detect_actions)
            .field("max_traces", &self.max_traces)
            .field("trace", &self.trace)
            .field("forget_evicted", &self.forget_evicted)
            .field("progress", &self.progress.as_ref().map(|_| "..."))
            .finish()
    }
}

impl ExploreConfig {
    pub fn validate(&self) -> ExploreResult<()> {
        if self.bithash_table_size == Some(0) {
            return Err(ExploreError::InvalidConfig {
                message: "bit-hash table size must be positive".into(),
            });
        }
        if self.frontier_max_capacity == Some(0) {
            return Err(ExploreError::InvalidConfig {
                message: "frontier capacity must be positive".into(),
            });
        }
        Ok(())
    }

    /// Whether this configuration yields an exact visited-set.
    pub fn is_exact(&self) -> bool {
        self.bithash_table_size.is_none()
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// The frontier drained.
    Done,
    /// The stop flag was raised.
    Cancelled,
    /// `max_states` states were explored.
    StateLimitReached,
    /// Process memory reached `memory_limit_mb`.
    MemoryLimitReached { memory_mb: usize },
    /// The successor generator failed. Statistics cover the work done so far.
    Failed(ExploreError),
}

impl RunStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, RunStatus::Done)
    }
}

/// Whether the explored states are guaranteed to be every reachable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Exhaustive,
    /// Hash collisions or frontier sampling may have hidden states.
    Approximate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreStats {
    /// Distinct states marked, minus states forgotten after eviction.
    pub states_seen: usize,
    /// States whose successors were enumerated.
    pub states_explored: usize,
    pub transitions: usize,
    /// Successors that were already marked.
    pub duplicates: usize,
    /// States dropped by the frontier.
    pub evictions: usize,
    /// Levels fully explored.
    pub levels: usize,
    /// Largest number of states stored for one level.
    pub max_frontier: usize,
}

/// A state without outgoing transitions.
#[derive(Debug, Clone)]
pub struct Deadlock<S, L> {
    pub id: StateId,
    pub state: S,
    pub trace: Option<Trace<S, L>>,
}

/// A transition whose action was asked for.
#[derive(Debug, Clone)]
pub struct Detection<S, L> {
    pub label: L,
    pub from_id: StateId,
    pub from: S,
    pub to_id: StateId,
    pub to: S,
    /// Ends with `(to, Some(label))`.
    pub trace: Option<Trace<S, L>>,
}

/// The state whose successors could not be generated.
#[derive(Debug, Clone)]
pub struct FailedState<S, L> {
    pub id: StateId,
    pub state: S,
    pub trace: Option<Trace<S, L>>,
}

#[derive(Debug)]
pub struct RunSummary<S, L> {
    pub status: RunStatus,
    pub completeness: Completeness,
    pub stats: ExploreStats,
    pub deadlocks: Vec<Deadlock<S, L>>,
    pub detections: Vec<Detection<S, L>>,
    /// Set when the run ended in [`RunStatus::Failed`].
    pub failure: Option<FailedState<S, L>>,
}

impl<S, L> RunSummary<S, L> {
    pub fn is_exhaustive(&self) -> bool {
        self.completeness == Completeness::Exhaustive
    }

    /// Turn a failed run into its error.
    pub fn into_result(self) -> ExploreResult<Self> {
        match self.status {
            RunStatus::Failed(err) => Err(err),
            status => Ok(Self { status, ..self }),
        }
    }
}

/// Outcome of a random walk.
#[derive(Debug)]
pub struct Walk<S, L> {
    pub status: RunStatus,
    /// States visited along the walk.
    pub trace: Trace<S, L>,
    /// The walk stopped in a state without successors.
    pub deadlocked: bool,
    pub stats: ExploreStats,
}

/// Breadth-first explorer over a [`SuccessorGenerator`].
pub struct Explorer<S, L> {
    config: ExploreConfig,
    queue: FrontierQueue<S>,
    /// Predecessor and incoming label per state id, when tracing.
    parents: Vec<Option<(StateId, L)>>,
    tracing: bool,
    stats: ExploreStats,
    deadlocks: Vec<Deadlock<S, L>>,
    detections: Vec<Detection<S, L>>,
    failure: Option<FailedState<S, L>>,
    /// External stop flag.
    stop_flag: Option<Arc<AtomicBool>>,
}

impl<S: Clone + PartialEq, L: Label> Explorer<S, L> {
    pub fn new(config: ExploreConfig) -> ExploreResult<Self> {
        config.validate()?;
        debug!(?config, "explorer configured");
        let queue = FrontierQueue::with_seed(config.frontier_max_capacity, config.seed);
        Ok(Self {
            config,
            queue,
            parents: Vec::new(),
            tracing: false,
            stats: ExploreStats::default(),
            deadlocks: Vec::new(),
            detections: Vec::new(),
            failure: None,
            stop_flag: None,
        })
    }

    /// Set an external stop flag, checked before every state expansion.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop_flag = Some(flag);
    }

    pub fn config(&self) -> &ExploreConfig {
        &self.config
    }

    /// Statistics of the current or last run.
    pub fn stats(&self) -> &ExploreStats {
        &self.stats
    }

    /// The frontier of the current or last run.
    pub fn queue(&self) -> &FrontierQueue<S> {
        &self.queue
    }

    fn stopped(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn reset(&mut self, exact: bool) {
        self.queue = FrontierQueue::with_seed(self.config.frontier_max_capacity, self.config.seed);
        self.parents.clear();
        self.tracing = self.config.trace && exact;
        self.stats = ExploreStats::default();
        self.deadlocks.clear();
        self.detections.clear();
        self.failure = None;
    }

    fn publish_progress(&self, level: usize) {
        if let Some(ref p) = self.config.progress {
            p.explored.store(self.stats.states_explored, Ordering::Relaxed);
            p.seen.store(self.stats.states_seen, Ordering::Relaxed);
            p.level.store(level, Ordering::Relaxed);
            p.frontier.store(
                self.queue.len_current() + self.queue.len_next(),
                Ordering::Relaxed,
            );
        }
    }

    /// Explore everything reachable from `initial`, level by level.
    ///
    /// Every enumerated transition is handed to `recorder`. A generator
    /// failure ends the run with [`RunStatus::Failed`]; the statistics and
    /// reports gathered up to that point are kept.
    pub fn run<G, V, R>(
        &mut self,
        initial: S,
        generator: &G,
        visited: &mut V,
        recorder: &mut R,
    ) -> RunSummary<S, L>
    where
        G: SuccessorGenerator<State = S, Label = L>,
        V: VisitedSet<S>,
        R: TransitionRecorder<S, L>,
    {
        let exact = visited.is_exact();
        self.reset(exact);
        if self.config.trace && !exact {
            warn!("traces need an exact visited-set; reports will carry no trace");
        }
        info!(
            exact,
            frontier_max_capacity = ?self.config.frontier_max_capacity,
            max_states = self.config.max_states,
            "starting exploration"
        );

        let (initial_id, is_new) = visited.test_and_mark(&initial);
        if is_new {
            self.stats.states_seen += 1;
        }
        recorder.initial(initial_id, &initial);
        if self.tracing {
            self.record_parent(initial_id, None);
        }
        if let Some(dropped) = self.queue.push(initial) {
            self.evicted(dropped, visited);
        }
        self.queue.swap_levels();
        self.stats.max_frontier = self.queue.len_current();

        let mut level = 0;
        let status = 'explore: loop {
            let explored_before = self.stats.states_explored;
            let transitions_before = self.stats.transitions;

            while let Some(state) = self.queue.pop_current() {
                if self.stopped() {
                    info!(states = self.stats.states_explored, "exploration cancelled");
                    break 'explore RunStatus::Cancelled;
                }

                if self.config.max_states > 0 && self.stats.states_explored >= self.config.max_states {
                    info!(states = self.stats.states_explored, "reached state limit");
                    break 'explore RunStatus::StateLimitReached;
                }

                // Check memory limit (every 1000 states to reduce overhead)
                if self.config.memory_limit_mb > 0
                    && self.stats.states_explored > 0
                    && self.stats.states_explored.is_multiple_of(1000)
                {
                    if let Some(mem_mb) = current_memory_mb() {
                        if mem_mb >= self.config.memory_limit_mb {
                            info!(
                                memory_mb = mem_mb,
                                limit_mb = self.config.memory_limit_mb,
                                "reached memory limit"
                            );
                            break 'explore RunStatus::MemoryLimitReached { memory_mb: mem_mb };
                        }
                    }
                }

                trace!(level, remaining = self.queue.len_current(), "exploring state");
                if let Err(err) = self.expand(state, generator, visited, recorder) {
                    warn!(error = %err, states = self.stats.states_explored, "exploration failed");
                    break 'explore RunStatus::Failed(err);
                }
                if self.stats.states_explored.is_multiple_of(1000) {
                    self.publish_progress(level);
                }
            }

            self.stats.levels = level + 1;
            info!(
                level,
                explored = self.stats.states_explored - explored_before,
                transitions = self.stats.transitions - transitions_before,
                seen = self.stats.states_seen,
                next = self.queue.len_next(),
                "level done"
            );

            if self.queue.len_next() == 0 {
                if self.config.max_states > 0 && self.stats.states_explored >= self.config.max_states {
                    break 'explore RunStatus::StateLimitReached;
                }
                break 'explore RunStatus::Done;
            }
            if self.stopped() {
                info!(states = self.stats.states_explored, "exploration cancelled");
                break 'explore RunStatus::Cancelled;
            }

            self.queue.swap_levels();
            level += 1;
            self.stats.max_frontier = self.stats.max_frontier.max(self.queue.len_current());
            if !exact && self.config.max_states > 0 {
                // Never store more states for the next level than are left to explore.
                let budget = self
                    .config
                    .max_states
                    .saturating_sub(self.stats.states_explored + self.queue.len_current());
                for dropped in self.queue.limit_max_capacity(budget) {
                    self.evicted(dropped, visited);
                }
            }
            self.publish_progress(level);
        };

        self.stats.evictions = self.queue.evictions();
        self.publish_progress(level);
        let completeness = if exact && self.stats.evictions == 0 && status.is_done() {
            Completeness::Exhaustive
        } else {
            Completeness::Approximate
        };
        info!(
            states = self.stats.states_seen,
            explored = self.stats.states_explored,
            transitions = self.stats.transitions,
            levels = self.stats.levels,
            evictions = self.stats.evictions,
            ?completeness,
            "exploration complete"
        );

        RunSummary {
            status,
            completeness,
            stats: self.stats.clone(),
            deadlocks: std::mem::take(&mut self.deadlocks),
            detections: std::mem::take(&mut self.detections),
            failure: self.failure.take(),
        }
    }

    /// Expand one state. On a generator failure the state is kept in
    /// `self.failure` along with its trace.
    fn expand<G, V, R>(
        &mut self,
        state: S,
        generator: &G,
        visited: &mut V,
        recorder: &mut R,
    ) -> ExploreResult<()>
    where
        G: SuccessorGenerator<State = S, Label = L>,
        V: VisitedSet<S>,
        R: TransitionRecorder<S, L>,
    {
        let from_id = match visited.state_id(&state) {
            Some(id) => id,
            None => visited.test_and_mark(&state).0,
        };

        let has_successor = match self.enumerate(from_id, &state, generator, visited, recorder) {
            Ok(has_successor) => has_successor,
            Err(err) => {
                let trace = self.trace_from(from_id, visited);
                self.failure = Some(FailedState {
                    id: from_id,
                    state,
                    trace,
                });
                return Err(err);
            }
        };

        if !has_successor
            && self.config.detect_deadlock
            && self.deadlocks.len() < self.config.max_traces
        {
            info!(state = from_id, "deadlock");
            let trace = self.trace_from(from_id, visited);
            self.deadlocks.push(Deadlock {
                id: from_id,
                state,
                trace,
            });
        }
        self.stats.states_explored += 1;
        Ok(())
    }

    /// Mark, record and enqueue every successor of `state`. Returns whether
    /// there was any.
    fn enumerate<G, V, R>(
        &mut self,
        from_id: StateId,
        state: &S,
        generator: &G,
        visited: &mut V,
        recorder: &mut R,
    ) -> ExploreResult<bool>
    where
        G: SuccessorGenerator<State = S, Label = L>,
        V: VisitedSet<S>,
        R: TransitionRecorder<S, L>,
    {
        let mut has_successor = false;
        for successor in generator.successors(state)? {
            let (label, next) = successor?;
            has_successor = true;
            self.stats.transitions += 1;

            let (to_id, is_new) = visited.test_and_mark(&next);
            if is_new {
                self.stats.states_seen += 1;
                if self.tracing {
                    self.record_parent(to_id, Some((from_id, label.clone())));
                }
            } else {
                self.stats.duplicates += 1;
            }
            recorder.transition(from_id, state, &label, to_id, &next);

            if self.detections.len() < self.config.max_traces
                && self.config.detect_actions.iter().any(|a| a == label.action_name())
            {
                info!(action = %label, from = from_id, to = to_id, "detected action");
                let trace = self.trace_from(from_id, visited).map(|mut trace| {
                    trace.push((next.clone(), Some(label.clone())));
                    trace
                });
                self.detections.push(Detection {
                    label: label.clone(),
                    from_id,
                    from: state.clone(),
                    to_id,
                    to: next.clone(),
                    trace,
                });
            }

            if is_new {
                if let Some(dropped) = self.queue.push(next) {
                    self.evicted(dropped, visited);
                }
                self.stats.max_frontier = self.stats.max_frontier.max(self.queue.len_next());
            }
        }
        Ok(has_successor)
    }

    fn evicted<V: VisitedSet<S>>(&mut self, state: S, visited: &mut V) {
        if self.config.forget_evicted {
            visited.forget(&state);
            self.stats.states_seen = self.stats.states_seen.saturating_sub(1);
        }
    }

    fn record_parent(&mut self, id: StateId, parent: Option<(StateId, L)>) {
        if self.parents.len() <= id {
            self.parents.resize_with(id + 1, || None);
        }
        self.parents[id] = parent;
    }

    fn trace_from<V: VisitedSet<S>>(&self, id: StateId, visited: &V) -> Option<Trace<S, L>> {
        if !self.tracing {
            return None;
        }
        let mut trace = Vec::new();
        let mut current = id;
        loop {
            let state = visited.lookup(current)?.clone();
            match self.parents.get(current).and_then(Option::as_ref) {
                Some((parent, label)) => {
                    trace.push((state, Some(label.clone())));
                    current = *parent;
                }
                None => {
                    trace.push((state, None));
                    break;
                }
            }
        }
        trace.reverse();
        Some(trace)
    }

    /// Path from the initial state to the state with `id` in the last run.
    pub fn trace_to<V: VisitedSet<S>>(&self, id: StateId, visited: &V) -> ExploreResult<Trace<S, L>> {
        self.trace_from(id, visited)
            .ok_or(ExploreError::TraceUnavailable { id })
    }

    /// Random walk of at most `max_steps` transitions from `initial`.
    ///
    /// Every successor of a visited state is marked and recorded; one of them
    /// is picked uniformly to continue. The walk ends early in a deadlock.
    pub fn simulate<G, V, R>(
        &mut self,
        initial: S,
        generator: &G,
        visited: &mut V,
        recorder: &mut R,
        max_steps: usize,
    ) -> Walk<S, L>
    where
        G: SuccessorGenerator<State = S, Label = L>,
        V: VisitedSet<S>,
        R: TransitionRecorder<S, L>,
    {
        self.reset(false);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        info!(seed = self.config.seed, max_steps, "starting random walk");

        let (mut id, is_new) = visited.test_and_mark(&initial);
        if is_new {
            self.stats.states_seen += 1;
        }
        recorder.initial(id, &initial);
        let mut trace: Trace<S, L> = vec![(initial.clone(), None)];
        let mut state = initial;
        let mut deadlocked = false;

        let status = loop {
            if self.stats.states_explored >= max_steps {
                break RunStatus::Done;
            }
            if self.stopped() {
                break RunStatus::Cancelled;
            }

            let mut successors = Vec::new();
            let collected: Result<(), GeneratorError> = generator
                .successors(&state)
                .and_then(|iter| iter.map(|s| s.map(|succ| successors.push(succ))).collect());
            if let Err(err) = collected {
                break RunStatus::Failed(err.into());
            }
            self.stats.states_explored += 1;

            let mut ids = Vec::with_capacity(successors.len());
            for (label, next) in &successors {
                self.stats.transitions += 1;
                let (to_id, is_new) = visited.test_and_mark(next);
                if is_new {
                    self.stats.states_seen += 1;
                } else {
                    self.stats.duplicates += 1;
                }
                recorder.transition(id, &state, label, to_id, next);
                ids.push(to_id);
            }

            if successors.is_empty() {
                info!(steps = trace.len() - 1, "random walk reached a deadlock");
                deadlocked = true;
                break RunStatus::Done;
            }
            let pick = rng.gen_range(0..successors.len());
            let (label, next) = successors.swap_remove(pick);
            trace!(step = trace.len(), action = %label, "random step");
            trace.push((next.clone(), Some(label)));
            id = ids[pick];
            state = next;
        };

        info!(
            steps = trace.len() - 1,
            states = self.stats.states_seen,
            "random walk complete"
        );
        Walk {
            status,
            trace,
            deadlocked,
            stats: self.stats.clone(),
        }
    }
}

/// Explore from `initial` with a visited-set and frontier built from `config`,
/// collecting every transition.
pub fn explore<G>(
    config: ExploreConfig,
    initial: G::State,
    generator: &G,
) -> ExploreResult<(RunSummary<G::State, G::Label>, TransitionLog<G::Label>)>
where
    G: SuccessorGenerator,
    G::State: crate::hash::Structural + std::hash::Hash + Eq + Clone,
    G::Label: Label,
{
    let mut visited = VisitedStates::from_config(&config)?;
    let mut explorer = Explorer::new(config)?;
    let mut log = TransitionLog::new();
    let summary = explorer.run(initial, generator, &mut visited, &mut log);
    Ok((summary, log))
}

/// Run with a lossy bit-hash table of `table_size` bits.
pub fn explore_bithash<G>(
    config: ExploreConfig,
    table_size: usize,
    initial: G::State,
    generator: &G,
) -> ExploreResult<RunSummary<G::State, G::Label>>
where
    G: SuccessorGenerator,
    G::State: crate::hash::Structural + Clone + PartialEq,
    G::Label: Label,
{
    let config = ExploreConfig {
        bithash_table_size: Some(table_size),
        ..config
    };
    config.validate()?;
    let mut table: BitHashTable = BitHashTable::with_width(table_size, config.hash_width);
    let mut explorer = Explorer::new(config)?;
    Ok(explorer.run(initial, generator, &mut table, &mut ()))
}
