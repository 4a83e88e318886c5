#![no_main]
use libfuzzer_sys::fuzz_target;
use ltsgen_explore::{explore, from_fn, ExploreConfig, RunStatus};
use ltsgen_term::{Action, Term};

// A graph over `n(0..N)` whose edges come from the input bytes.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let table = data[0] as usize + 1;
    let frontier = match data[1] {
        0 => None,
        f => Some(f as usize),
    };
    let edges = data[2..].to_vec();
    let n = edges.len() as i64;
    let generator = from_fn(move |s: &Term| {
        let k = s.children()[0].as_int().unwrap_or(0);
        let b = edges[k as usize] as i64;
        Ok(vec![
            (Action::named("a"), Term::appl("n", vec![Term::int(b % n)])),
            (Action::named("b"), Term::appl("n", vec![Term::int((k + b / 7) % n)])),
        ])
    });
    let config = ExploreConfig {
        bithash_table_size: Some(table),
        frontier_max_capacity: frontier,
        max_states: 10_000,
        ..Default::default()
    };
    let (summary, log) = explore(config, Term::appl("n", vec![Term::int(0)]), &generator).unwrap();
    assert!(!matches!(summary.status, RunStatus::Failed(_)));
    assert_eq!(log.len(), summary.stats.transitions);
    assert!(summary.stats.states_explored <= 10_000);
});
