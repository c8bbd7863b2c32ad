//! Rangecache bench - memory cache load generator
//!
//! Drives a `MemCache` with concurrent read-through traffic over aligned,
//! non-overlapping chunks of a set of synthetic files, then checks the cache
//! invariants and prints hit/eviction statistics.

use anyhow::{Result, bail};
use bytes::Bytes;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rangecache_common::{
    CacheCounter, CounterSet, CounterSink, EvictionPolicy, IoContext, IoEntry, IoVector,
    MemCacheConfig, MetricsSink,
};
use rangecache_storage::MemCache;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rangecache-bench")]
#[command(about = "Rangecache memory cache load generator")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "rangecache-bench.toml")]
    config: String,

    /// Eviction policy (lru or clock)
    #[arg(long)]
    policy: Option<EvictionPolicy>,

    /// Cache capacity in bytes
    #[arg(long)]
    capacity: Option<u64>,

    /// Number of worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Operations per worker thread
    #[arg(long)]
    ops: Option<u64>,

    /// Number of distinct files
    #[arg(long)]
    files: Option<u64>,

    /// Size of every cached chunk in bytes
    #[arg(long)]
    entry_size: Option<u64>,

    /// Populate the cache through the background update queue
    #[arg(long)]
    async_update: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    cache: MemCacheConfig,
    #[serde(default)]
    workload: WorkloadConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct WorkloadConfig {
    threads: usize,
    ops: u64,
    files: u64,
    chunks_per_file: u64,
    entry_size: u64,
    async_update: bool,
    /// Fraction of reads issued as read-ahead
    preload_ratio: f64,
    seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops: 100_000,
            files: 16,
            chunks_per_file: 256,
            entry_size: 64 * 1024,
            async_update: false,
            preload_ratio: 0.1,
            seed: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    #[serde(default = "default_log_level")]
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Deterministic contents of one chunk
fn chunk_data(file: u64, chunk: u64, size: u64) -> Bytes {
    let fill = (file.wrapping_mul(31) ^ chunk) as u8;
    Bytes::from(vec![fill; size as usize])
}

fn run_worker(
    cache: &MemCache,
    workload: &WorkloadConfig,
    seed: u64,
    counters: Arc<CounterSet>,
) -> Result<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ctx = IoContext::new().with_sink(counters);
    let mut fetches = 0;

    for _ in 0..workload.ops {
        let file = rng.gen_range(0..workload.files);
        let chunk = rng.gen_range(0..workload.chunks_per_file);
        let offset = chunk * workload.entry_size;
        let entries = vec![IoEntry::new(offset, workload.entry_size)];
        let mut vector = IoVector::new(format!("bench:file-{file}"), entries);
        if rng.gen_bool(workload.preload_ratio) {
            vector = vector.with_preloading();
        }

        cache.read(&ctx, &mut vector)?;

        let expected = chunk_data(file, chunk, workload.entry_size);
        let entry = &mut vector.entries[0];
        match &entry.object {
            Some(object) if *object != expected => {
                bail!("corrupt cache hit for file-{file} at offset {offset}");
            }
            Some(_) => {}
            None => {
                entry.resolve(expected, workload.entry_size);
                cache.update(&ctx, &vector, workload.async_update)?;
                fetches += 1;
            }
        }
    }
    Ok(fetches)
}

#[allow(clippy::cast_precision_loss)]
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file if it exists
    let config: Config = if std::path::Path::new(&args.config).exists() {
        let config_str = std::fs::read_to_string(&args.config)?;
        toml::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse config file: {}", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    // Merge CLI args with config file (CLI takes precedence)
    let mut cache_config = config.cache;
    if let Some(policy) = args.policy {
        cache_config.policy = policy;
    }
    if let Some(capacity) = args.capacity {
        cache_config.capacity = capacity;
    }
    let mut workload = config.workload;
    workload.threads = args.threads.unwrap_or(workload.threads);
    workload.ops = args.ops.unwrap_or(workload.ops);
    workload.files = args.files.unwrap_or(workload.files);
    workload.entry_size = args.entry_size.unwrap_or(workload.entry_size);
    workload.async_update |= args.async_update;
    let log_level = if args.log_level != "info" {
        args.log_level
    } else {
        config.logging.level
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if workload.threads == 0 || workload.files == 0 || workload.chunks_per_file == 0 {
        bail!("threads, files and chunks_per_file must be positive");
    }
    if workload.entry_size == 0 {
        bail!("entry_size must be positive");
    }
    if !(0.0..=1.0).contains(&workload.preload_ratio) {
        bail!("preload_ratio must be within [0, 1]");
    }

    info!("Starting rangecache bench");
    info!("Config file: {}", args.config);
    info!("Workload: {:?}", workload);

    let counters = Arc::new(CounterSet::new());
    let cache = Arc::new(
        MemCache::new(cache_config)?
            .with_counter_sinks([Arc::new(MetricsSink) as Arc<dyn CounterSink>]),
    );

    let started = Instant::now();
    let mut handles = Vec::with_capacity(workload.threads);
    for t in 0..workload.threads {
        let cache = Arc::clone(&cache);
        let workload = workload.clone();
        let counters = Arc::clone(&counters);
        let seed = workload.seed.wrapping_add(t as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            run_worker(&cache, &workload, seed, counters)
        }));
    }

    let mut fetches = 0;
    for handle in handles {
        fetches += handle.await??;
    }
    cache.wait_for_pending_updates()?;
    let elapsed = started.elapsed();
    debug!("Workers finished in {:?}", elapsed);

    let snapshot = cache.snapshot();
    if snapshot.used > snapshot.capacity {
        error!("Cache over capacity: {:?}", snapshot);
        bail!("used {} exceeds capacity {}", snapshot.used, snapshot.capacity);
    }
    if snapshot.entries != snapshot.tracked_ranges {
        error!("Cache and overlap checker diverged: {:?}", snapshot);
        bail!(
            "{} cached entries but {} tracked ranges",
            snapshot.entries,
            snapshot.tracked_ranges
        );
    }

    let reads = counters.get(CacheCounter::MemoryRead);
    let stats = cache.stats();
    println!("Rangecache Bench");
    println!("================");
    println!("Policy:     {}", cache.config().policy);
    println!("Threads:    {}", workload.threads);
    println!("Reads:      {}", reads);
    println!("Hits:       {}", counters.get(CacheCounter::MemoryHit));
    println!("Hit ratio:  {:.2}%", counters.hit_ratio() * 100.0);
    println!("Fetches:    {}", fetches);
    println!("Evictions:  {}", stats.evictions.load(Ordering::Relaxed));
    println!("Entries:    {} ({} files)", snapshot.entries, snapshot.tracked_files);
    println!("Used:       {} / {} bytes", snapshot.used, snapshot.capacity);
    println!(
        "Throughput: {:.0} reads/s ({:.2?})",
        reads as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        elapsed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_tables() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            policy = "clock"
            capacity = 4096

            [workload]
            threads = 2
            async_update = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.policy, EvictionPolicy::Clock);
        assert_eq!(config.cache.capacity, 4096);
        assert_eq!(config.workload.threads, 2);
        assert!(config.workload.async_update);
        assert_eq!(config.workload.files, WorkloadConfig::default().files);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_worker_hits_after_warmup() {
        let cache = MemCache::lru(1 << 20).unwrap();
        let workload = WorkloadConfig {
            threads: 1,
            ops: 500,
            files: 2,
            chunks_per_file: 4,
            entry_size: 128,
            ..WorkloadConfig::default()
        };
        let counters = Arc::new(CounterSet::new());
        let fetches = run_worker(&cache, &workload, 1, Arc::clone(&counters)).unwrap();

        // everything fits, so each chunk is fetched once at most
        assert!(fetches <= 8);
        assert_eq!(counters.get(CacheCounter::MemoryRead), 500);
        assert_eq!(counters.get(CacheCounter::MemoryHit), 500 - fetches);
    }
}
