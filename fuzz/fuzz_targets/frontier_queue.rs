#![no_main]
use libfuzzer_sys::fuzz_target;
use ltsgen_explore::FrontierQueue;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let max = match data[0] {
        0 => None,
        m => Some(m as usize - 1),
    };
    let mut q = FrontierQueue::with_seed(max, data[1] as u64);
    let mut offered = 0usize;
    for &op in &data[2..] {
        match op % 8 {
            0 => {
                q.swap_levels();
                offered = 0;
            }
            1 => {
                q.pop_current();
            }
            7 => {
                q.limit_max_capacity(op as usize / 8);
            }
            _ => {
                let before = q.len_next();
                let dropped = q.push(op);
                offered += 1;
                if dropped.is_none() {
                    // Either stored, or sampled onto an equal occupant.
                    assert!(q.len_next() == before + 1 || (q.is_fixed() && q.len_next() == before));
                } else {
                    assert!(q.is_fixed());
                    assert_eq!(q.len_next(), before);
                }
            }
        }
        assert!(q.len_next() <= q.capacity());
        if let Some(m) = q.max_capacity() {
            assert!(q.capacity() <= m);
        }
        assert!(q.len_next() <= offered);
    }
});
