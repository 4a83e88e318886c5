//! Structural hashing of tree-shaped states.
//!
//! The digest is an order-sensitive pre-order walk over the state: every step
//! absorbs one integer into one of three accumulator words in round-robin
//! order, and every third absorption runs Bob Jenkins' 96-bit mix over the
//! three words. Composite nodes absorb a per-kind tag before their children,
//! integer leaves absorb their own value.
//!
//! All accumulator state lives on the stack of a single `digest` call, so the
//! hasher is reentrant and can be shared freely.

use std::fmt;
use std::ops::{BitXor, Shl, Shr};

use ltsgen_term::Term;

/// Tag absorbed before the arguments of an application node.
const TAG_APPL: u64 = 0x13ad_3780;
/// Tag absorbed before the elements of a list node.
const TAG_LIST: u64 = 0x7eb9_cdba;
/// Absorbed for atomic leaves that are not integers.
const TAG_OTHER: u64 = 0xaa14_3f06;
/// Padding used to complete the last group of three.
const PAD: u64 = 0x76a3_4e87;

const SEED_A: u64 = 0x9e37_79b9;
const SEED_B: u64 = 0x65e3_083a;
const SEED_C: u64 = 0xa45f_7582;

/// Borrowed view of one node of a structured state.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a, T> {
    /// Application node with its arguments in declared order.
    Appl(&'a [T]),
    /// List node with its elements front to back.
    List(&'a [T]),
    /// Integer leaf.
    Int(i64),
    /// Any other atomic leaf.
    Other,
}

/// States the structural hasher can walk.
///
/// Structurally identical values must return identical node views.
pub trait Structural: Sized {
    fn node(&self) -> Node<'_, Self>;
}

impl Structural for Term {
    #[inline]
    fn node(&self) -> Node<'_, Self> {
        match self {
            Term::Appl { args, .. } => Node::Appl(args),
            Term::List(items) => Node::List(items),
            Term::Int(n) => Node::Int(*n),
            Term::Atom(_) => Node::Other,
        }
    }
}

/// A 64-bit structural digest. Distinct states may share a digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(u64);

impl Digest {
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_u64(v: u64) -> Self {
        Digest(v)
    }

    /// Reduce the digest to a slot in a table of `table_size` entries.
    #[inline]
    pub fn index(self, table_size: usize) -> usize {
        (self.0 % table_size as u64) as usize
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({:016x})", self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Accumulator word of the mixer.
pub trait MixWord:
    Copy + BitXor<Output = Self> + Shl<u32, Output = Self> + Shr<u32, Output = Self>
{
    const BITS: u32;

    /// Truncating conversion from an absorbed integer.
    fn from_u64(v: u64) -> Self;
    fn wrapping_add(self, other: Self) -> Self;
    fn wrapping_sub(self, other: Self) -> Self;
    fn to_u64(self) -> u64;

    /// The word folded down to 32 bits.
    #[inline]
    fn fold32(self) -> u64 {
        let v = self.to_u64();
        if Self::BITS > 32 {
            (v ^ (v >> 32)) & 0xffff_ffff
        } else {
            v
        }
    }

    #[inline]
    fn high16(self) -> u64 {
        self.fold32() >> 16
    }

    #[inline]
    fn low16(self) -> u64 {
        self.fold32() & 0xffff
    }
}

macro_rules! impl_mix_word {
    ($t:ty) => {
        impl MixWord for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline]
            fn from_u64(v: u64) -> Self {
                v as $t
            }

            #[inline]
            fn wrapping_add(self, other: Self) -> Self {
                <$t>::wrapping_add(self, other)
            }

            #[inline]
            fn wrapping_sub(self, other: Self) -> Self {
                <$t>::wrapping_sub(self, other)
            }

            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }
        }
    };
}

impl_mix_word!(u32);
impl_mix_word!(u64);

/// Accumulator width used by the hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashWidth {
    /// Three 32-bit words.
    Narrow,
    /// Three 64-bit words.
    #[default]
    Wide,
}

struct Mixer<W> {
    a: W,
    b: W,
    c: W,
    slot: u8,
}

impl<W: MixWord> Mixer<W> {
    fn new() -> Self {
        Self {
            a: W::from_u64(SEED_A),
            b: W::from_u64(SEED_B),
            c: W::from_u64(SEED_C),
            slot: 0,
        }
    }

    #[inline]
    fn absorb(&mut self, n: u64) {
        let n = W::from_u64(n);
        match self.slot {
            0 => {
                self.a = self.a.wrapping_add(n);
                self.slot = 1;
            }
            1 => {
                self.b = self.b.wrapping_add(n);
                self.slot = 2;
            }
            _ => {
                self.c = self.c.wrapping_add(n);
                self.slot = 0;
                self.mix();
            }
        }
    }

    #[inline]
    fn mix(&mut self) {
        let (mut a, mut b, mut c) = (self.a, self.b, self.c);
        a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 13);
        b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 8);
        c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 13);
        a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 12);
        b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 16);
        c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 5);
        a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 3);
        b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 10);
        c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 15);
        self.a = a;
        self.b = b;
        self.c = c;
    }

    fn finish(mut self) -> Digest {
        // Always end on a completed group so the final mix runs.
        while self.slot != 0 {
            self.absorb(PAD);
        }
        Digest(
            (self.a.high16() << 48)
                | (self.b.high16() << 32)
                | (self.c.high16() << 16)
                | (self.a.low16() ^ self.b.low16() ^ self.c.low16()),
        )
    }
}

/// Digest a state using accumulator words of type `W`.
pub fn digest_with<W: MixWord, T: Structural>(state: &T) -> Digest {
    let mut mixer = Mixer::<W>::new();
    let mut stack: Vec<&T> = vec![state];
    while let Some(t) = stack.pop() {
        match t.node() {
            Node::Appl(args) => {
                mixer.absorb(TAG_APPL);
                stack.extend(args.iter().rev());
            }
            Node::List(items) => {
                mixer.absorb(TAG_LIST);
                stack.extend(items.iter().rev());
            }
            Node::Int(n) => mixer.absorb(n as u64),
            Node::Other => mixer.absorb(TAG_OTHER),
        }
    }
    mixer.finish()
}

/// Digest a state with the default (wide) accumulators.
pub fn digest<T: Structural>(state: &T) -> Digest {
    digest_with::<u64, T>(state)
}

/// Structural hasher with a configured accumulator width.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralHasher {
    width: HashWidth,
}

impl StructuralHasher {
    pub fn new(width: HashWidth) -> Self {
        Self { width }
    }

    pub fn width(&self) -> HashWidth {
        self.width
    }

    #[inline]
    pub fn digest<T: Structural>(&self, state: &T) -> Digest {
        match self.width {
            HashWidth::Narrow => digest_with::<u32, T>(state),
            HashWidth::Wide => digest_with::<u64, T>(state),
        }
    }

    /// Table slot of `state` in a table of `table_size` entries.
    #[inline]
    pub fn index<T: Structural>(&self, state: &T, table_size: usize) -> usize {
        self.digest(state).index(table_size)
    }
}
