//! Command-line interface for ltsgen state-space exploration.

mod models;

use clap::{Args, Parser, Subcommand};
use ltsgen_explore::{
    Completeness, ExploreConfig, ExploreStats, Explorer, HashWidth, RunStatus, Trace,
    TransitionLog, VisitedStates,
};
use ltsgen_term::{Action, Term};
use miette::Diagnostic;
use models::{Model, ModelKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI error.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to write {path}: {message}")]
    #[diagnostic(code(ltsgen::io_error))]
    IoError { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(ltsgen::config_error))]
    ConfigError { message: String },

    #[error("exploration failed: {message}")]
    #[diagnostic(
        code(ltsgen::explore_error),
        help("statistics above cover the states explored before the failure")
    )]
    ExploreError { message: String },
}

impl From<ltsgen_explore::ExploreError> for CliError {
    fn from(e: ltsgen_explore::ExploreError) -> Self {
        match e {
            ltsgen_explore::ExploreError::InvalidConfig { message } => {
                CliError::ConfigError { message }
            }
            other => CliError::ExploreError {
                message: other.to_string(),
            },
        }
    }
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ltsgen", version)]
#[command(
    about = "Breadth-first state-space generation under a memory budget",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Built-in model to explore
    #[arg(value_enum)]
    model: ModelKind,

    /// Model size (ring length, number of counters or philosophers)
    #[arg(short = 'n', long, default_value = "4", value_parser = clap::value_parser!(u64).range(1..))]
    size: u64,

    /// Upper bound of each counter
    #[arg(long, default_value = "3")]
    max: i64,
}

impl ModelArgs {
    fn model(&self) -> Model {
        Model::new(self.model, self.size as usize, self.max)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Explore every reachable state breadth-first
    Explore {
        #[command(flatten)]
        model: ModelArgs,

        /// Use a bit-hash table of this many bits instead of storing states
        #[arg(long, value_name = "BITS")]
        bithash: Option<usize>,

        /// Hash with 32-bit accumulator words
        #[arg(long)]
        narrow_hash: bool,

        /// Maximum number of states kept for the next level
        #[arg(long, value_name = "STATES")]
        frontier: Option<usize>,

        /// Seed for frontier sampling
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum number of states to explore (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_states: usize,

        /// Maximum memory usage in MB (0 = unlimited)
        #[arg(long, default_value = "0")]
        memory_limit: usize,

        /// Report states without outgoing transitions
        #[arg(long)]
        deadlock: bool,

        /// Report transitions with this action name (repeatable)
        #[arg(short, long, value_name = "NAME")]
        action: Vec<String>,

        /// Maximum number of deadlocks and detections to report
        #[arg(long, default_value = "10")]
        max_traces: usize,

        /// Reconstruct traces for reports (exact mode only)
        #[arg(long)]
        trace: bool,

        /// Keep states dropped by the frontier marked as visited
        #[arg(long)]
        keep_evicted: bool,

        /// Exit with status 1 when a deadlock or action is reported
        #[arg(long)]
        fail_on_detect: bool,

        /// Write the transition system in Aldebaran format
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Follow one random path through the state space
    Simulate {
        #[command(flatten)]
        model: ModelArgs,

        /// Maximum number of steps
        #[arg(long, default_value = "100")]
        steps: usize,

        /// Seed for choosing successors
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write the transitions seen along the walk in Aldebaran format
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if matches!(
        &cli.command,
        Commands::Explore { verbose: true, .. } | Commands::Simulate { verbose: true, .. }
    ) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Explore {
            model,
            bithash,
            narrow_hash,
            frontier,
            seed,
            max_states,
            memory_limit,
            deadlock,
            action,
            max_traces,
            trace,
            keep_evicted,
            fail_on_detect,
            output,
            verbose: _,
        } => {
            let config = ExploreConfig {
                bithash_table_size: bithash,
                hash_width: if narrow_hash {
                    HashWidth::Narrow
                } else {
                    HashWidth::Wide
                },
                frontier_max_capacity: frontier,
                seed,
                max_states,
                memory_limit_mb: memory_limit,
                detect_deadlock: deadlock,
                detect_actions: action,
                max_traces,
                trace,
                forget_evicted: !keep_evicted,
                progress: None,
            };
            cmd_explore(model.model(), config, fail_on_detect, output.as_deref())
        }
        Commands::Simulate {
            model,
            steps,
            seed,
            output,
            verbose: _,
        } => {
            let config = ExploreConfig {
                seed,
                ..Default::default()
            };
            cmd_simulate(model.model(), config, steps, output.as_deref())
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(1);
        }
    }
}

fn build(config: &ExploreConfig) -> CliResult<(VisitedStates<Term>, Explorer<Term, Action>)> {
    let visited = VisitedStates::from_config(config)?;
    let explorer = Explorer::new(config.clone())?;
    Ok((visited, explorer))
}

fn cmd_explore(
    model: Model,
    config: ExploreConfig,
    fail_on_detect: bool,
    output: Option<&Path>,
) -> CliResult<i32> {
    let (mut visited, mut explorer) = build(&config)?;
    let mut log = TransitionLog::new();

    info!(model = ?model.kind, size = model.size, "exploring...");
    let start = Instant::now();
    let summary = explorer.run(model.initial(), &model, &mut visited, &mut log);
    let elapsed = start.elapsed();

    println!();
    match &summary.status {
        RunStatus::Done => println!("Result: OK"),
        RunStatus::Cancelled => println!("Result: CANCELLED"),
        RunStatus::StateLimitReached => println!("Result: STATE LIMIT REACHED"),
        RunStatus::MemoryLimitReached { memory_mb } => {
            println!("Result: MEMORY LIMIT REACHED");
            println!("  Memory usage: {} MB", memory_mb);
        }
        RunStatus::Failed(_) => println!("Result: FAILED"),
    }
    let exhaustive = summary.completeness == Completeness::Exhaustive;
    println!(
        "  Coverage: {}",
        if exhaustive { "exhaustive" } else { "approximate" }
    );
    print_stats(&summary.stats);
    if let VisitedStates::BitHash(table) = &visited {
        println!(
            "  Bit-hash table: {} of {} bits set ({:.4} collision probability)",
            table.count_set(),
            table.table_size(),
            table.estimated_collision_rate()
        );
    }
    println!("  Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "  States/sec: {:.0}",
        summary.stats.states_explored as f64 / elapsed.as_secs_f64()
    );

    for deadlock in &summary.deadlocks {
        println!();
        println!("Deadlock: {}", deadlock.state);
        if let Some(trace) = &deadlock.trace {
            print_trace(trace);
        }
    }
    for detection in &summary.detections {
        println!();
        println!(
            "Action {}: {} -> {}",
            detection.label, detection.from, detection.to
        );
        if let Some(trace) = &detection.trace {
            print_trace(trace);
        }
    }

    if let Some(failure) = &summary.failure {
        println!();
        println!("Failed in state: {}", failure.state);
        if let Some(trace) = &failure.trace {
            print_trace(trace);
        }
    }

    if let Some(path) = output {
        write_aut(path, &log)?;
    }

    let detected = !summary.deadlocks.is_empty() || !summary.detections.is_empty();
    let summary = summary.into_result()?;
    Ok(if fail_on_detect && detected {
        1
    } else if !summary.status.is_done() || !exhaustive {
        2
    } else {
        0
    })
}

fn cmd_simulate(
    model: Model,
    config: ExploreConfig,
    steps: usize,
    output: Option<&Path>,
) -> CliResult<i32> {
    let (mut visited, mut explorer) = build(&config)?;
    let mut log = TransitionLog::new();

    info!(model = ?model.kind, size = model.size, "simulating...");
    let walk = explorer.simulate(model.initial(), &model, &mut visited, &mut log, steps);

    println!();
    if walk.deadlocked {
        println!("Result: DEADLOCK");
    } else {
        println!("Result: OK");
    }
    print_trace(&walk.trace);
    print_stats(&walk.stats);

    if let Some(path) = output {
        write_aut(path, &log)?;
    }
    if let RunStatus::Failed(e) = walk.status {
        return Err(e.into());
    }
    Ok(0)
}

fn print_stats(stats: &ExploreStats) {
    println!("  States seen: {}", stats.states_seen);
    println!("  States explored: {}", stats.states_explored);
    println!("  Transitions: {}", stats.transitions);
    println!("  Levels: {}", stats.levels);
    if stats.evictions > 0 {
        println!("  Evicted from frontier: {}", stats.evictions);
    }
}

fn print_trace(trace: &Trace<Term, Action>) {
    println!("  Trace ({} steps):", trace.len());
    for (i, (state, action)) in trace.iter().enumerate() {
        let action_str = action
            .as_ref()
            .map_or_else(|| "init".to_string(), |a| a.to_string());
        println!("    {}: {} -> {}", i, action_str, state);
    }
}

/// Write `log` as Aldebaran text, with state ids renumbered densely.
fn write_aut(path: &Path, log: &TransitionLog<Action>) -> CliResult<()> {
    fs::write(path, log.compact().to_string()).map_err(|e| CliError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    info!(path = %path.display(), transitions = log.len(), "wrote transition system");
    Ok(())
}
