//! Latch contention stress harness.
//!
//! Spawns worker threads hammering a set of latches and prints per-latch
//! statistics, for contention tuning of the engine under load.
//!
//! ```bash
//! cargo run --release --bin latch-stress -- --threads 8 --latches 4 --fair
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::Rng;

use vesper_latch::{logging::init_logging, Latch, LatchConfig, LatchContext};

#[derive(Parser, Debug)]
#[command(
    name = "latch-stress",
    version,
    about = "Contention stress harness for vesper latches"
)]
struct Cli {
    #[arg(long, default_value_t = 4, help = "Worker threads to spawn")]
    threads: usize,

    #[arg(long, default_value_t = 4, help = "Latches shared by the workers")]
    latches: usize,

    #[arg(long, default_value_t = 100_000, help = "Operations per thread")]
    ops_per_thread: usize,

    #[arg(
        long,
        default_value_t = 0.2,
        help = "Fraction of operations using the non-blocking acquire"
    )]
    try_ratio: f64,

    #[arg(long, help = "Grant contended latches in FIFO order")]
    fair: bool,

    #[arg(long, help = "Enable the ownership-ledger verification subsystem")]
    verify: bool,

    #[arg(
        long,
        env = "VESPER_LOG",
        default_value = "info",
        help = "Tracing filter directive"
    )]
    log: String,
}

fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{} µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2} ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2} s", micros as f64 / 1_000_000.0)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("latch-stress error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;

    let ctx = LatchContext::new(
        LatchConfig::new()
            .fair_latches(cli.fair)
            .verify_latches(cli.verify),
    );
    let latches: Arc<Vec<Latch>> = Arc::new(
        (0..cli.latches.max(1))
            .map(|i| Latch::with_context(format!("stress-{i}"), Arc::clone(&ctx)))
            .collect(),
    );

    println!(
        "latch-stress: threads={} latches={} ops/thread={} try_ratio={:.2} fair={} verify={}",
        cli.threads,
        latches.len(),
        cli.ops_per_thread,
        cli.try_ratio,
        cli.fair,
        cli.verify
    );

    let start = Instant::now();
    let mut handles = Vec::with_capacity(cli.threads);
    for _ in 0..cli.threads {
        let latches = Arc::clone(&latches);
        let ops = cli.ops_per_thread;
        let try_ratio = cli.try_ratio.clamp(0.0, 1.0);
        handles.push(std::thread::spawn(move || -> vesper_latch::Result<u64> {
            let mut rng = rand::thread_rng();
            let mut completed = 0u64;
            for _ in 0..ops {
                let latch = &latches[rng.gen_range(0..latches.len())];
                if rng.gen_bool(try_ratio) {
                    if latch.try_acquire()? {
                        latch.release()?;
                        completed += 1;
                    }
                } else {
                    latch.acquire()?;
                    latch.release()?;
                    completed += 1;
                }
            }
            Ok(completed)
        }));
    }

    let mut completed = 0u64;
    for handle in handles {
        completed += handle.join().expect("worker panicked")?;
    }
    let elapsed = start.elapsed();

    println!("\nPER-LATCH STATISTICS");
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "LATCH", "NO-WAIT", "CONTENDED", "TRY-OK", "TRY-BUSY", "RELEASES"
    );
    for latch in latches.iter() {
        let stats = latch.stats();
        println!(
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            latch.name(),
            stats.acquires_no_waiters,
            stats.acquires_with_contention,
            stats.acquire_no_wait_successful,
            stats.acquire_no_wait_unsuccessful,
            stats.releases
        );
        latch.emit_stats_tracing();
    }

    let ops_per_sec = completed as f64 / elapsed.as_secs_f64();
    println!(
        "\ncompleted {} critical sections in {} ({:.0} ops/s)",
        completed,
        format_duration(elapsed),
        ops_per_sec
    );

    if let Some(table) = ctx.table() {
        if table.is_empty() {
            println!("ownership ledger: clean");
        } else {
            println!("ownership ledger: LEAKED ENTRIES\n{}", table.dump());
            std::process::exit(2);
        }
    }

    Ok(())
}
