//! # Intern Table Benchmark Harness
//!
//! A dependency-free, repeatable benchmark driver for `sic-table` and
//! `sic-pool`: a small XorShift64 PRNG for reproducible key sequences,
//! `black_box` to keep the optimizer honest, and a `BenchConfig` parsed
//! from `env::args`.

use std::env;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use sic_common::InternResult;
use sic_pool::SharedInternPool;
use sic_table::{InternTable, TableConfig};

const DEFAULT_KEY_COUNT: usize = 1 << 14;
const DEFAULT_OP_COUNT: usize = 1_000_000;
const DEFAULT_KEY_SIZE: usize = 16;
const DEFAULT_THREADS: usize = 1;

struct BenchConfig {
    requested_keys: usize,
    key_count: usize,
    key_mask: usize,
    op_count: usize,
    key_size: usize,
    threads: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let requested_keys = parse_usize(args.next(), DEFAULT_KEY_COUNT);
        let op_count = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let key_size = parse_usize(args.next(), DEFAULT_KEY_SIZE);
        let threads = parse_usize(args.next(), DEFAULT_THREADS);

        let key_count = normalize_power_of_two(requested_keys);
        let key_mask = key_count - 1;

        BenchConfig { requested_keys, key_count, key_mask, op_count, key_size, threads }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn normalize_power_of_two(value: usize) -> usize {
    let value = value.max(1);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

/// Tiny deterministic PRNG used to avoid external dependencies.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    #[inline]
    fn next_index(&mut self, mask: usize) -> usize {
        (self.next_u64() as usize) & mask
    }
}

fn build_keys(count: usize, size: usize, seed: u64) -> Vec<String> {
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let tag = seed ^ (i as u64);
        let mut key = format!("k{tag:016x}");
        key.truncate(size.max(1));
        while key.len() < size {
            key.push('x');
        }
        keys.push(key);
    }
    keys
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {nanos_per_op:.1} ns/op)");
}

fn main() {
    if let Err(err) = run() {
        eprintln!("sic-bench failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> InternResult<()> {
    let config = BenchConfig::from_args();
    println!(
        "keys: requested={}, actual={}, ops={}, key_size={}, threads={}",
        config.requested_keys, config.key_count, config.op_count, config.key_size, config.threads
    );

    bench_single_table(&config)?;
    if config.threads <= 1 {
        bench_shared_pool(&config)?;
    } else {
        bench_shared_pool_concurrent(&config)?;
    }
    Ok(())
}

/// Single-threaded `InternTable`: unique inserts, then repeat lookups.
fn bench_single_table(config: &BenchConfig) -> InternResult<()> {
    let mut table = InternTable::new(TableConfig::new(sic_table::MAX_CANDIDATE_LENGTH))?;
    let keys = build_keys(config.key_count, config.key_size, 0xA5A5_A5A5_A5A5_A5A5);

    let start = Instant::now();
    for key in &keys {
        black_box(table.lookup_or_insert(key)?);
    }
    report("table/insert", config.key_count, start.elapsed());

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        black_box(table.lookup_or_insert(&keys[idx])?);
    }
    report("table/lookup", config.op_count, start.elapsed());

    Ok(())
}

/// Single-threaded access through the sharded façade, to compare the
/// per-operation overhead of shard selection and locking against a bare
/// table.
fn bench_shared_pool(config: &BenchConfig) -> InternResult<()> {
    let pool = SharedInternPool::new();
    let keys = build_keys(config.key_count, config.key_size, 0x5A5A_5A5A_5A5A_5A5A);

    let start = Instant::now();
    for key in &keys {
        black_box(pool.intern_str(key)?);
    }
    report("pool/insert", config.key_count, start.elapsed());

    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        black_box(pool.intern_str(&keys[idx])?);
    }
    report("pool/lookup", config.op_count, start.elapsed());

    Ok(())
}

/// Multi-threaded contention benchmark: `config.threads` workers hammer
/// the same shared pool concurrently, each with its own PRNG stream.
fn bench_shared_pool_concurrent(config: &BenchConfig) -> InternResult<()> {
    let pool = Arc::new(SharedInternPool::new());
    let keys = Arc::new(build_keys(config.key_count, config.key_size, 0x9E37_79B1_85EB_CA77));

    for key in keys.iter() {
        pool.intern_str(key)?;
    }

    let ops_per_thread = config.op_count / config.threads.max(1);
    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let keys = Arc::clone(&keys);
            let mask = config.key_mask;
            std::thread::spawn(move || {
                let mut rng = XorShift64::new(0xD1B5_4A32_D192_ED03 ^ (worker as u64));
                for _ in 0..ops_per_thread {
                    let idx = rng.next_index(mask);
                    let _ = black_box(pool.intern_str(&keys[idx]));
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }
    report("pool/concurrent_lookup", ops_per_thread * config.threads, start.elapsed());

    Ok(())
}
