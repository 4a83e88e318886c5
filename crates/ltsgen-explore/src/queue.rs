//! Breadth-first frontier with a memory ceiling.
//!
//! States of the level being explored are drained from `current` while their
//! successors are collected in `next`; `swap_levels` promotes `next` at the end
//! of a level. The `next` buffer grows geometrically up to `max_capacity`.
//! Once it can no longer grow (ceiling reached, or the allocator refused) the
//! queue is *fixed* and further insertions go through reservoir sampling, so
//! the stored level is a uniform random sample of every state offered to it.

use std::collections::{TryReserveError, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Capacity of the first allocation.
pub const INITIAL_CAPACITY: usize = 128;

/// Double-buffered breadth-first work queue.
#[derive(Debug)]
pub struct FrontierQueue<S> {
    current: VecDeque<S>,
    next: Vec<S>,
    /// Slots `next` may use before growing or sampling.
    capacity: usize,
    /// Hard ceiling on `capacity` (`None` = unbounded).
    max_capacity: Option<usize>,
    /// Set once `capacity` stops growing; never cleared.
    fixed: bool,
    /// States that entered `next` on the exact path during this level.
    accepted_count: usize,
    /// States offered to `next` in fixed mode during this level.
    extra_count: usize,
    /// States dropped by sampling over the queue's lifetime.
    evictions: usize,
    rng: StdRng,
}

impl<S: PartialEq> FrontierQueue<S> {
    /// Create a queue with an entropy-seeded sampler.
    pub fn new(max_capacity: Option<usize>) -> Self {
        Self::with_rng(max_capacity, StdRng::from_entropy())
    }

    /// Create a queue whose sampling decisions are reproducible.
    pub fn with_seed(max_capacity: Option<usize>, seed: u64) -> Self {
        Self::with_rng(max_capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_capacity: Option<usize>, rng: StdRng) -> Self {
        Self {
            current: VecDeque::new(),
            next: Vec::new(),
            capacity: 0,
            max_capacity,
            fixed: max_capacity == Some(0),
            accepted_count: 0,
            extra_count: 0,
            evictions: 0,
            rng,
        }
    }

    /// Add a state to the next level.
    ///
    /// Returns `None` if the state was stored without displacing anything,
    /// or if it was sampled onto a slot already holding an equal state. In
    /// fixed mode otherwise returns the state that did not make it: either the
    /// previous occupant of the slot it replaced, or `state` itself when it
    /// was not sampled.
    pub fn push(&mut self, state: S) -> Option<S> {
        if self.next.len() == self.capacity && !self.fixed {
            self.grow();
        }
        if self.next.len() < self.capacity && self.ensure_room() {
            self.next.push(state);
            self.accepted_count += 1;
            return None;
        }
        self.sample(state)
    }

    /// Promote the next level to current. Anything left in the current level
    /// is discarded.
    pub fn swap_levels(&mut self) {
        let next = std::mem::take(&mut self.next);
        let mut old: Vec<S> = std::mem::replace(&mut self.current, VecDeque::from(next)).into();
        old.clear();
        self.next = old;
        self.accepted_count = 0;
        self.extra_count = 0;
    }

    /// Take the next state of the current level.
    #[inline]
    pub fn pop_current(&mut self) -> Option<S> {
        self.current.pop_front()
    }

    /// Lower the ceiling to `max_capacity`. Has no effect if the current
    /// ceiling is already lower.
    ///
    /// Intended for level boundaries; states already in the next level beyond
    /// the new ceiling are removed and returned.
    pub fn limit_max_capacity(&mut self, max_capacity: usize) -> Vec<S> {
        if self.max_capacity.is_some_and(|m| m <= max_capacity) {
            return Vec::new();
        }
        self.max_capacity = Some(max_capacity);
        if self.capacity >= max_capacity {
            self.capacity = max_capacity;
            self.fixed = true;
        }
        if self.next.len() > max_capacity {
            let dropped = self.next.split_off(max_capacity);
            self.evictions += dropped.len();
            return dropped;
        }
        Vec::new()
    }

    fn grow(&mut self) {
        let max = self.max_capacity.unwrap_or(usize::MAX);
        let target = if self.capacity == 0 {
            max.min(INITIAL_CAPACITY)
        } else if self.capacity.saturating_mul(2) > max {
            max
        } else {
            self.capacity * 2
        };
        if self.max_capacity == Some(target) {
            self.fixed = true;
        }
        debug!(
            from = self.capacity,
            to = target,
            fixed = self.fixed,
            "growing frontier"
        );
        self.capacity = target;
    }

    /// Make sure `next` has backing storage for one more entry, reserving up
    /// to `capacity` at once.
    fn ensure_room(&mut self) -> bool {
        if self.next.len() < self.next.capacity() {
            return true;
        }
        match self.next.try_reserve_exact(self.capacity - self.next.len()) {
            Ok(()) => true,
            Err(err) => {
                self.storage_exhausted(err);
                false
            }
        }
    }

    /// Stop growing at the number of states that fit.
    fn storage_exhausted(&mut self, err: TryReserveError) {
        warn!(
            stored = self.next.len(),
            error = %err,
            "state storage exhausted; further states may be dropped"
        );
        self.capacity = self.next.len();
        self.fixed = true;
    }

    /// Reservoir step: the i-th state offered to a full level of size N is
    /// kept with probability N / i, replacing a uniformly chosen slot.
    fn sample(&mut self, state: S) -> Option<S> {
        self.extra_count += 1;
        let stored = self.next.len();
        let offered = self.accepted_count + self.extra_count;
        if stored > 0 && self.rng.gen_range(0..offered) < stored {
            let pos = self.rng.gen_range(0..stored);
            if self.next[pos] == state {
                return None;
            }
            self.evictions += 1;
            return Some(std::mem::replace(&mut self.next[pos], state));
        }
        self.evictions += 1;
        Some(state)
    }
}

impl<S> FrontierQueue<S> {
    pub fn len_current(&self) -> usize {
        self.current.len()
    }

    pub fn len_next(&self) -> usize {
        self.next.len()
    }

    /// Both levels are empty.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    /// Whether the queue has switched to sampling.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Total number of states dropped by sampling or by lowering the ceiling.
    pub fn evictions(&self) -> usize {
        self.evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_below_capacity() {
        let mut q = FrontierQueue::with_seed(None, 1);
        for i in 0..1000 {
            assert_eq!(q.push(i), None);
        }
        assert_eq!(q.len_next(), 1000);
        assert_eq!(q.capacity(), 1024);
        assert!(!q.is_fixed());
        assert_eq!(q.evictions(), 0);
    }

    #[test]
    fn test_growth_schedule() {
        let mut q = FrontierQueue::with_seed(Some(300), 1);
        q.push(0);
        assert_eq!(q.capacity(), 128);
        for i in 1..129 {
            q.push(i);
        }
        assert_eq!(q.capacity(), 256);
        assert!(!q.is_fixed());
        for i in 129..257 {
            q.push(i);
        }
        assert_eq!(q.capacity(), 300);
        assert!(q.is_fixed());
        for i in 257..300 {
            assert_eq!(q.push(i), None);
        }
        assert_eq!(q.len_next(), 300);
        assert!(q.push(300).is_some());
        assert_eq!(q.len_next(), 300);
    }

    #[test]
    fn test_small_ceiling_fixes_on_first_allocation() {
        let mut q = FrontierQueue::with_seed(Some(3), 7);
        assert_eq!(q.push(1), None);
        assert_eq!(q.capacity(), 3);
        assert!(q.is_fixed());
        q.push(2);
        q.push(3);
        assert!(q.push(4).is_some());
        assert_eq!(q.len_next(), 3);
    }

    #[test]
    fn test_zero_ceiling_discards_everything() {
        let mut q = FrontierQueue::with_seed(Some(0), 7);
        assert!(q.is_fixed());
        assert_eq!(q.push(5), Some(5));
        assert_eq!(q.len_next(), 0);
        assert_eq!(q.evictions(), 1);
    }

    #[test]
    fn test_duplicate_in_fixed_mode_is_discarded() {
        let mut absorbed = 0;
        for seed in 0..20 {
            let mut q = FrontierQueue::with_seed(Some(1), seed);
            assert_eq!(q.push(9), None);
            let mut dropped = 0;
            for _ in 0..50 {
                match q.push(9) {
                    Some(s) => {
                        assert_eq!(s, 9);
                        dropped += 1;
                    }
                    // Sampled onto its own copy: nothing left the queue.
                    None => absorbed += 1,
                }
            }
            assert_eq!(q.len_next(), 1);
            assert_eq!(q.evictions(), dropped);
        }
        assert!(absorbed > 0);
    }

    #[test]
    fn test_eviction_returns_previous_occupant() {
        let mut q = FrontierQueue::with_seed(Some(4), 11);
        for i in 0..4 {
            q.push(i);
        }
        let mut kept_new = 0;
        for i in 4..200 {
            match q.push(i) {
                Some(evicted) if evicted != i => {
                    assert!(evicted < i);
                    kept_new += 1;
                }
                Some(_) => {}
                None => panic!("full fixed queue accepted without eviction"),
            }
            assert_eq!(q.len_next(), 4);
        }
        assert!(kept_new > 0);
        assert_eq!(q.evictions(), 196);
    }

    #[test]
    fn test_swap_levels() {
        let mut q = FrontierQueue::with_seed(None, 0);
        q.push("a");
        q.push("b");
        assert_eq!(q.len_current(), 0);
        assert_eq!(q.pop_current(), None);
        q.swap_levels();
        assert_eq!(q.len_current(), 2);
        assert_eq!(q.len_next(), 0);
        q.push("c");
        assert_eq!(q.pop_current(), Some("a"));
        assert_eq!(q.pop_current(), Some("b"));
        assert_eq!(q.pop_current(), None);
        q.swap_levels();
        assert_eq!(q.pop_current(), Some("c"));
        assert!(q.is_empty());
    }

    #[test]
    fn test_swap_resets_sampling_counters() {
        let mut q = FrontierQueue::with_seed(Some(2), 5);
        for i in 0..10 {
            q.push(i);
        }
        q.swap_levels();
        // A fresh level fills exactly again before sampling resumes.
        assert_eq!(q.push(100), None);
        assert_eq!(q.push(101), None);
        assert!(q.push(102).is_some());
    }

    #[test]
    fn test_storage_exhausted_clamps_and_fixes() {
        // The allocator cannot be made to refuse `ensure_room` reliably, so
        // the handler is driven with a real reservation error instead.
        let mut q = FrontierQueue::with_seed(None, 0);
        for i in 0..10 {
            q.push(i);
        }
        let err = Vec::<u8>::new().try_reserve_exact(usize::MAX).unwrap_err();
        q.storage_exhausted(err);
        assert!(q.is_fixed());
        assert_eq!(q.capacity(), 10);
        assert!(q.push(10).is_some());
        assert_eq!(q.len_next(), 10);
    }

    #[test]
    fn test_limit_max_capacity() {
        let mut q = FrontierQueue::with_seed(None, 0);
        for i in 0..200 {
            q.push(i);
        }
        let dropped = q.limit_max_capacity(150);
        assert_eq!(dropped, (150..200).collect::<Vec<_>>());
        assert_eq!(q.capacity(), 150);
        assert!(q.is_fixed());
        assert_eq!(q.max_capacity(), Some(150));
        // Raising the ceiling is ignored.
        assert!(q.limit_max_capacity(1000).is_empty());
        assert_eq!(q.max_capacity(), Some(150));
    }

    #[test]
    fn test_reservoir_uniform_after_fixing() {
        let (n, m, runs) = (10usize, 50usize, 4000u64);
        let mut kept = vec![0u32; m];
        for seed in 0..runs {
            let mut q = FrontierQueue::with_seed(Some(n), seed);
            for i in 0..m {
                q.push(i);
            }
            q.swap_levels();
            while let Some(i) = q.pop_current() {
                kept[i] += 1;
            }
        }
        // Expected 800 per state, standard deviation about 25.
        for (i, &k) in kept.iter().enumerate() {
            assert!((650..=950).contains(&k), "state {i} kept {k} times");
        }
    }

    #[test]
    fn test_reservoir_uniform_after_growth() {
        // Grows 128 -> 200, then samples.
        let (n, m, runs) = (200usize, 600usize, 300u64);
        let mut kept = vec![0u32; m];
        for seed in 0..runs {
            let mut q = FrontierQueue::with_seed(Some(n), seed);
            for i in 0..m {
                q.push(i);
            }
            assert_eq!(q.len_next(), n);
            q.swap_levels();
            while let Some(i) = q.pop_current() {
                kept[i] += 1;
            }
        }
        // Expected 100 per state, standard deviation about 8.
        for (i, &k) in kept.iter().enumerate() {
            assert!((50..=150).contains(&k), "state {i} kept {k} times");
        }
        let early: u32 = kept[..n].iter().sum();
        let late: u32 = kept[m - n..].iter().sum();
        let diff = (early as i64 - late as i64).abs();
        assert!(diff < 1500, "prefix {early} vs suffix {late}");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Pop,
        Swap,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => any::<u32>().prop_map(Op::Push),
            2 => Just(Op::Pop),
            1 => Just(Op::Swap),
        ]
    }

    proptest! {
        #[test]
        fn prop_capacity_invariants(
            max in prop::option::of(0usize..400),
            ops in prop::collection::vec(arb_op(), 0..800),
            seed in any::<u64>(),
        ) {
            let mut q = FrontierQueue::with_seed(max, seed);
            let mut was_fixed = q.is_fixed();
            for op in ops {
                match op {
                    Op::Push(v) => { q.push(v); }
                    Op::Pop => { q.pop_current(); }
                    Op::Swap => q.swap_levels(),
                }
                prop_assert!(q.len_next() <= q.capacity());
                if let Some(m) = max {
                    prop_assert!(q.capacity() <= m);
                }
                prop_assert!(!was_fixed || q.is_fixed());
                was_fixed = q.is_fixed();
            }
        }

        #[test]
        fn prop_no_eviction_below_capacity(k in 0usize..=128, max in 128usize..1000) {
            let mut q = FrontierQueue::with_seed(Some(max), 0);
            for i in 0..k {
                prop_assert_eq!(q.push(i), None);
            }
            prop_assert_eq!(q.len_next(), k);
        }

        #[test]
        fn prop_level_isolation(
            levels in prop::collection::vec(prop::collection::vec(any::<u16>(), 0..50), 1..6)
        ) {
            let mut q: FrontierQueue<(usize, u16)> = FrontierQueue::with_seed(None, 0);
            for (level, states) in levels.iter().enumerate() {
                for &s in states {
                    q.push((level, s));
                }
                q.swap_levels();
                let mut popped = Vec::new();
                while let Some((l, s)) = q.pop_current() {
                    prop_assert_eq!(l, level);
                    popped.push(s);
                    // Pushed during this level, only visible after the next swap.
                    q.push((level + 1, s));
                }
                prop_assert_eq!(&popped, states);
                q.swap_levels();
                while q.pop_current().is_some() {}
            }
        }
    }
}
