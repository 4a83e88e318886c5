//! Bit-hash table: a fixed-memory, lossy visited-set.
//!
//! Every state maps to one bit via its structural digest. Collisions are never
//! resolved: two states landing on the same bit are treated as the same state,
//! which can hide part of the state space. In exchange the table costs exactly
//! `table_size` bits no matter how many states are presented.

use tracing::debug;

use crate::hash::{HashWidth, Structural, StructuralHasher};

/// Storage word of the bit array.
pub trait BitBlock: Copy + Default + Eq {
    const BITS: usize;

    fn bit(self, i: usize) -> bool;
    fn with_bit(self, i: usize) -> Self;
    fn without_bit(self, i: usize) -> Self;
}

macro_rules! impl_bit_block {
    ($t:ty) => {
        impl BitBlock for $t {
            const BITS: usize = <$t>::BITS as usize;

            #[inline]
            fn bit(self, i: usize) -> bool {
                (self >> i) & 1 != 0
            }

            #[inline]
            fn with_bit(self, i: usize) -> Self {
                self | ((1 as $t) << i)
            }

            #[inline]
            fn without_bit(self, i: usize) -> Self {
                self & !((1 as $t) << i)
            }
        }
    };
}

impl_bit_block!(u8);
impl_bit_block!(u32);
impl_bit_block!(u64);

/// Fixed-size bit array keyed by structural digest.
///
/// `B` is the packing granularity of the backing storage.
#[derive(Debug, Clone)]
pub struct BitHashTable<B: BitBlock = u64> {
    blocks: Vec<B>,
    table_size: usize,
    hasher: StructuralHasher,
    set: usize,
}

impl BitHashTable<u64> {
    /// Create a table of `table_size` bits, all clear, with the default hash width.
    ///
    /// Panics if `table_size` is zero.
    pub fn new(table_size: usize) -> Self {
        Self::with_width(table_size, HashWidth::default())
    }
}

impl<B: BitBlock> BitHashTable<B> {
    /// Create a table hashing with the given accumulator width.
    ///
    /// Panics if `table_size` is zero.
    pub fn with_width(table_size: usize, width: HashWidth) -> Self {
        assert!(table_size > 0, "bit-hash table size must be positive");
        let blocks = vec![B::default(); table_size.div_ceil(B::BITS)];
        debug!(
            bits = table_size,
            bytes = blocks.len() * B::BITS / 8,
            ?width,
            "allocated bit-hash table"
        );
        Self {
            blocks,
            table_size,
            hasher: StructuralHasher::new(width),
            set: 0,
        }
    }

    #[inline]
    fn get(&self, i: usize) -> bool {
        self.blocks[i / B::BITS].bit(i % B::BITS)
    }

    /// Mark `state`. Returns its bit index and whether the bit was clear before.
    pub fn add_state<T: Structural>(&mut self, state: &T) -> (usize, bool) {
        let i = self.state_index(state);
        let block = &mut self.blocks[i / B::BITS];
        let is_new = !block.bit(i % B::BITS);
        if is_new {
            *block = block.with_bit(i % B::BITS);
            self.set += 1;
        }
        (i, is_new)
    }

    /// Clear the bit of `state`, whether or not it was set.
    ///
    /// Any other state sharing the bit is un-marked as well.
    pub fn remove_state<T: Structural>(&mut self, state: &T) {
        let i = self.state_index(state);
        let block = &mut self.blocks[i / B::BITS];
        if block.bit(i % B::BITS) {
            *block = block.without_bit(i % B::BITS);
            self.set -= 1;
        }
    }

    /// Bit index of `state`. Only meaningful as an identity once `add_state`
    /// has marked the state.
    #[inline]
    pub fn state_index<T: Structural>(&self, state: &T) -> usize {
        self.hasher.index(state, self.table_size)
    }

    /// Whether the bit of `state` is set (possibly by a colliding state).
    pub fn contains<T: Structural>(&self, state: &T) -> bool {
        self.get(self.state_index(state))
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Number of set bits.
    pub fn count_set(&self) -> usize {
        self.set
    }

    pub fn is_empty(&self) -> bool {
        self.set == 0
    }

    /// Memory usage of the bit array in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.len() * B::BITS / 8
    }

    /// Probability that a never-seen state lands on an already set bit.
    pub fn estimated_collision_rate(&self) -> f64 {
        self.set as f64 / self.table_size as f64
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.blocks.iter_mut().for_each(|b| *b = B::default());
        self.set = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltsgen_term::Term;

    fn s(i: i64) -> Term {
        Term::appl("s", vec![Term::int(i)])
    }

    #[test]
    fn test_bithash_basic() {
        let mut table = BitHashTable::new(1_000_003);
        let (i1, new1) = table.add_state(&s(1));
        assert!(new1);
        let (i1b, again) = table.add_state(&s(1));
        assert_eq!(i1, i1b);
        assert!(!again);
        assert!(table.contains(&s(1)));
        assert_eq!(table.state_index(&s(1)), i1);
        assert_eq!(table.count_set(), 1);
    }

    #[test]
    fn test_bithash_remove() {
        let mut table = BitHashTable::new(4093);
        table.add_state(&s(7));
        table.remove_state(&s(7));
        assert!(!table.contains(&s(7)));
        assert!(table.is_empty());
        // Clearing an unset bit is a no-op.
        table.remove_state(&s(7));
        assert_eq!(table.count_set(), 0);
        assert!(table.add_state(&s(7)).1);
    }

    #[test]
    fn test_bithash_collisions_are_shared() {
        // One bit: everything collides after the first state.
        let mut table = BitHashTable::new(1);
        assert_eq!(table.add_state(&s(1)), (0, true));
        assert_eq!(table.add_state(&s(2)), (0, false));
        assert_eq!(table.add_state(&Term::list(vec![])), (0, false));
        // Removing one state un-marks its collision partners too.
        table.remove_state(&s(2));
        assert!(!table.contains(&s(1)));
    }

    #[test]
    fn test_bithash_novelty_per_index() {
        let mut table: BitHashTable<u8> = BitHashTable::with_width(97, HashWidth::Narrow);
        let mut seen = std::collections::HashSet::new();
        for i in 0..500 {
            let (idx, is_new) = table.add_state(&s(i));
            assert!(idx < 97);
            assert_eq!(is_new, seen.insert(idx));
        }
        assert_eq!(table.count_set(), seen.len());
    }

    #[test]
    fn test_bithash_memory_is_fixed() {
        let mut table = BitHashTable::new(1 << 20);
        assert_eq!(table.memory_bytes(), 1 << 17);
        for i in 0..10_000 {
            table.add_state(&s(i));
        }
        assert_eq!(table.memory_bytes(), 1 << 17);
        assert!(table.estimated_collision_rate() < 0.01);

        // Sizes that are not a multiple of the block width round up.
        let odd: BitHashTable<u32> = BitHashTable::with_width(33, HashWidth::Wide);
        assert_eq!(odd.memory_bytes(), 8);
    }

    #[test]
    fn test_bithash_clear() {
        let mut table = BitHashTable::new(101);
        for i in 0..20 {
            table.add_state(&s(i));
        }
        table.clear();
        assert!(table.is_empty());
        assert!(table.add_state(&s(0)).1);
    }

    #[test]
    #[should_panic(expected = "bit-hash table size must be positive")]
    fn test_bithash_zero_size_panics() {
        let _ = BitHashTable::new(0);
    }
}
