#![no_main]
use libfuzzer_sys::fuzz_target;
use ltsgen_explore::hash::digest;
use ltsgen_explore::{HashWidth, StructuralHasher};
use ltsgen_term::Term;

/// Decode a term from a byte stream; bytes pick the node kind.
fn decode(data: &mut &[u8], depth: usize) -> Term {
    let Some((&b, rest)) = data.split_first() else {
        return Term::int(0);
    };
    *data = rest;
    if depth > 16 {
        return Term::int(b as i64);
    }
    match b % 4 {
        0 => Term::int((b as i64) << 3),
        1 => Term::constant("c"),
        2 => {
            let n = (b / 4 % 4) as usize;
            Term::list((0..n).map(|_| decode(data, depth + 1)).collect())
        }
        _ => {
            let n = (b / 4 % 4) as usize;
            Term::appl("f", (0..n).map(|_| decode(data, depth + 1)).collect())
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let size = data[0] as usize + 1;
    let mut input = &data[1..];
    let term = decode(&mut input, 0);
    let copy = decode(&mut &data[1..], 0);

    let wide = StructuralHasher::new(HashWidth::Wide);
    assert_eq!(wide.digest(&term), digest(&term));
    assert_eq!(wide.digest(&term), wide.digest(&copy));
    assert!(wide.index(&term, size) < size);

    let narrow = StructuralHasher::new(HashWidth::Narrow);
    assert_eq!(narrow.digest(&term), narrow.digest(&term.clone()));
});
