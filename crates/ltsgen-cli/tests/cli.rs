//! Runs the `ltsgen` binary end to end.

use std::fs;
use std::process::{Command, Output};

fn ltsgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ltsgen"))
        .args(args)
        .output()
        .expect("failed to run ltsgen")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_exact_ring_writes_aut() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.aut");
    let output = ltsgen(&["explore", "ring", "-n", "5", "-o", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    assert!(stdout(&output).contains("Result: OK"));
    assert!(stdout(&output).contains("Coverage: exhaustive"));

    let aut = fs::read_to_string(&path).unwrap();
    let mut lines = aut.lines();
    assert_eq!(lines.next(), Some("des (0, 5, 5)"));
    assert_eq!(lines.next(), Some("(0,\"next\",1)"));
    assert_eq!(lines.last(), Some("(4,\"next\",0)"));
}

#[test]
fn test_bithash_run_is_approximate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counters.aut");
    let output = ltsgen(&[
        "explore",
        "counters",
        "-n",
        "2",
        "--max",
        "4",
        "--bithash",
        "1000003",
        "-o",
        path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("Coverage: approximate"));
    assert!(stdout(&output).contains("Bit-hash table"));

    // Sparse bit indices are renumbered from zero.
    let aut = fs::read_to_string(&path).unwrap();
    assert!(aut.starts_with("des (0, 40, 25)"));
}

#[test]
fn test_deadlock_with_fail_on_detect() {
    let output = ltsgen(&[
        "explore",
        "philosophers",
        "-n",
        "3",
        "--deadlock",
        "--trace",
        "--fail-on-detect",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("Deadlock: table([1, 1, 1], [1, 1, 1])"));
    assert!(out.contains("0: init -> table([0, 0, 0], [0, 0, 0])"));

    let relaxed = ltsgen(&["explore", "philosophers", "-n", "3", "--deadlock"]);
    assert_eq!(relaxed.status.code(), Some(0));
}

#[test]
fn test_state_limit_on_infinite_model() {
    let output = ltsgen(&[
        "explore",
        "tree",
        "--frontier",
        "32",
        "--max-states",
        "1000",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let out = stdout(&output);
    assert!(out.contains("Result: STATE LIMIT REACHED"));
    assert!(out.contains("States explored: 1000"));
}

#[test]
fn test_invalid_table_size() {
    let output = ltsgen(&["explore", "ring", "--bithash", "0"]);
    assert_eq!(output.status.code(), Some(1));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("bit-hash table size must be positive"));
}

#[test]
fn test_simulate_ring() {
    let output = ltsgen(&["simulate", "ring", "-n", "3", "--steps", "4"]);
    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("Trace (5 steps):"));
    assert!(out.contains("4: next -> ring(1)"));
}

#[test]
fn test_generator_failure_prints_trace() {
    // A single-state frontier descends the tree until the child index overflows.
    let output = ltsgen(&["explore", "tree", "--frontier", "1", "--trace"]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("Result: FAILED"));
    assert!(out.contains("Failed in state: n("));
    assert!(out.contains("0: init -> n(0)"));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("overflow"));
}
