//! # fetchkit-cli
//!
//! Demo driver that runs each fetch pattern over sample identifiers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fetchkit::config::ENV_PREFIX;
use fetchkit::{ApiCache, FetchConfig, Fetcher};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const BATCH_IDS: [&str; 3] = ["/api/users", "/api/posts", "/api/comments"];

#[derive(Parser)]
#[command(name = "fetchkit")]
#[command(about = "Retry, timeout, batch and cache patterns over a simulated API", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML or JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Probability that a simulated call fails
    #[arg(long, global = true)]
    failure_rate: Option<f64>,

    /// Seed for reproducible failure draws
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pattern in sequence
    Demo,

    /// Fetch one resource
    Single {
        /// Resource identifier
        id: String,
    },

    /// Fetch several resources
    Batch {
        /// Resource identifiers
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = BatchMode::Parallel)]
        mode: BatchMode,
    },

    /// Fetch with a deadline
    Timeout {
        id: String,

        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Fetch with retry and exponential backoff
    Retry {
        id: String,

        #[arg(short, long)]
        max_attempts: Option<usize>,
    },

    /// Fetch through the TTL cache several times
    Cache {
        id: String,

        #[arg(short, long, default_value_t = 3)]
        repeat: usize,

        #[arg(long)]
        ttl_ms: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BatchMode {
    Sequential,
    Parallel,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");
    let fetcher = Fetcher::from_config(config.clone());

    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => run_demo(&fetcher).await,
        Commands::Single { id } => {
            single(&fetcher, &id).await;
        }
        Commands::Batch { ids, mode } => {
            batch(&fetcher, &ids, mode).await;
        }
        Commands::Timeout { id, timeout_ms } => {
            let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(config.timeout());
            with_timeout(&fetcher, &id, timeout).await;
        }
        Commands::Retry { id, max_attempts } => {
            retry(&fetcher, &id, max_attempts.unwrap_or(config.max_attempts)).await;
        }
        Commands::Cache { id, repeat, ttl_ms } => {
            let ttl = ttl_ms.map(Duration::from_millis).unwrap_or(config.cache_ttl());
            cached(&fetcher, &id, repeat, ttl).await;
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<FetchConfig> {
    let mut config = match &cli.config {
        Some(path) => FetchConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => FetchConfig::default(),
    };
    config.apply_env(ENV_PREFIX)?;

    if let Some(rate) = cli.failure_rate {
        config.failure_rate = rate;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

async fn run_demo(fetcher: &Fetcher) {
    println!("Async API Fetching Demo");
    println!("{}", "=".repeat(70));

    println!("\nTest 1: Single Resource Fetch");
    single(fetcher, "/api/users").await;

    println!("\nTest 2: Sequential Fetching");
    let sequential = batch(fetcher, &BATCH_IDS, BatchMode::Sequential).await;

    println!("\nTest 3: Parallel Fetching");
    let parallel = batch(fetcher, &BATCH_IDS, BatchMode::Parallel).await;
    let speedup = sequential.as_secs_f64() / parallel.as_secs_f64().max(f64::EPSILON);
    println!("Speed improvement: {:.2}x", speedup);

    println!("\nTest 4: Fetch with Timeout");
    with_timeout(fetcher, "/api/slow", Duration::from_millis(2000)).await;

    println!("\nTest 5: Fetch with Retry");
    retry(fetcher, "/api/unreliable", fetcher.config().max_attempts).await;

    println!("\nTest 6: API Caching");
    cached(fetcher, "/api/cached", 3, Duration::from_millis(3000)).await;

    println!("\nAll tests completed!");
}

async fn single(fetcher: &Fetcher, id: &str) {
    println!("Fetching {}...", id);
    match fetcher.fetch_resource(id).await {
        Some(result) => {
            println!("✓ Successfully fetched {}", id);
            print_result(&result);
        }
        None => println!("✗ Error fetching {}", id),
    }
}

async fn batch<S: AsRef<str>>(fetcher: &Fetcher, ids: &[S], mode: BatchMode) -> Duration {
    let start = Instant::now();
    let (label, results) = match mode {
        BatchMode::Sequential => ("Sequential", fetcher.fetch_sequential(ids).await),
        BatchMode::Parallel => ("Parallel", fetcher.fetch_parallel(ids).await),
    };
    let elapsed = start.elapsed();

    println!("{} fetch completed in {}ms", label, elapsed.as_millis());
    println!("Fetched {} of {} resources", results.len(), ids.len());
    for result in &results {
        println!("  ✓ {}", result.identifier);
    }
    elapsed
}

async fn with_timeout(fetcher: &Fetcher, id: &str, timeout: Duration) {
    match fetcher.fetch_with_timeout(id, timeout).await {
        Ok(result) => {
            println!("✓ {} responded within {}ms", id, timeout.as_millis());
            print_result(&result);
        }
        Err(e) if e.is_timeout() => println!("Handled timeout: {}", e),
        Err(e) => println!("✗ {} failed: {}", id, e),
    }
}

async fn retry(fetcher: &Fetcher, id: &str, max_attempts: usize) {
    match fetcher.fetch_with_retry(id, max_attempts).await {
        Ok(result) => println!("✓ Retry successful: {}", result.identifier),
        Err(e) => println!("All retries failed: {}", e),
    }
}

async fn cached(fetcher: &Fetcher, id: &str, repeat: usize, ttl: Duration) {
    let cache = ApiCache::new(fetcher.endpoint(), ttl).with_fetch_delay(fetcher.config().cache_delay());
    println!("Caching {} for {}ms", id, cache.ttl().as_millis());

    for _ in 0..repeat {
        let hits_before = cache.stats().await.hits;
        let outcome = cache.get(id).await;
        let hit = cache.stats().await.hits > hits_before;
        match outcome {
            Ok(_) if hit => println!("✓ Cache hit for {}", id),
            Ok(_) => println!("Cache miss for {}, fetched", id),
            Err(e) => println!("✗ {}", e),
        }
    }

    let stats = cache.stats().await;
    println!("Cache size: {}", cache.size().await);
    println!(
        "Hits: {}, misses: {} ({:.0}% hit ratio)",
        stats.hits,
        stats.misses,
        stats.hit_ratio() * 100.0
    );
}

fn print_result(result: &fetchkit::FetchResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{:?}", result),
    }
}
