use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use workpool::{Config, WorkerPool};


#[derive(Parser, Debug)]
#[command(name = "workpool", about = "Runs a batch of CPU tasks through the worker pool")]
struct Cli {
    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(long)]
    threads: Option<usize>,

    /// Number of tasks to submit
    #[arg(long, default_value = "100000")]
    tasks: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::cpu_bound();
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }

    let now = Instant::now();
    let pool = WorkerPool::with_config(config)?;

    let handles = (0..cli.tasks)
        .map(|i| pool.submit_with(|x: u64| x.wrapping_mul(x) % 7, (i,)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sum = 0u64;
    for handle in handles {
        sum += handle.read()?;
    }

    let metrics = pool.metrics();
    pool.shutdown();

    println!("sum: {}", sum);
    println!("completed: {}, failed: {}", metrics.completed_tasks, metrics.failed_tasks);
    println!("elapsed: {:?}", now.elapsed());
    Ok(())
}
