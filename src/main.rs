//! kvtable soak driver
//!
//! Opens a TTL table over the chosen backend, keeps refreshing half of a key
//! set and lets the other half expire, logging what the table and its
//! sweeper are doing until Ctrl+C or the configured duration elapses.

use bytes::Bytes;
use kvtable::{MemTable, SledTable, Table, TtlConfig, TtlTable};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Mem,
    Sled,
}

/// Driver configuration
#[derive(Debug)]
struct Config {
    backend: Backend,
    /// Database directory for on-disk backends
    path: PathBuf,
    ttl: TtlConfig,
    /// Number of keys written at start
    keys: usize,
    /// How often the first half of the keys is rewritten
    refresh: Duration,
    /// Stop after this long (0 runs until Ctrl+C)
    duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Mem,
            path: PathBuf::from("kvtable-data"),
            ttl: TtlConfig::new(Duration::from_secs(2), Duration::from_millis(200)),
            keys: 1000,
            refresh: Duration::from_millis(500),
            duration: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("kvtable version {}", kvtable::VERSION);
                    std::process::exit(0);
                }
                _ => {}
            }

            let Some(value) = args.get(i + 1) else {
                eprintln!("Error: {flag} requires a value");
                std::process::exit(1);
            };
            match flag {
                "--backend" | "-b" => {
                    config.backend = match value.as_str() {
                        "mem" => Backend::Mem,
                        "sled" => Backend::Sled,
                        other => {
                            eprintln!("Error: unknown backend '{other}' (expected mem or sled)");
                            std::process::exit(1);
                        }
                    }
                }
                "--path" => config.path = PathBuf::from(value),
                "--ttl-ms" => config.ttl.time_to_live = Duration::from_millis(number(flag, value)),
                "--prune-ms" => {
                    config.ttl.prune_interval = Duration::from_millis(number(flag, value))
                }
                "--keys" | "-k" => config.keys = number(flag, value) as usize,
                "--refresh-ms" => config.refresh = Duration::from_millis(number(flag, value)),
                "--duration-secs" => config.duration = Duration::from_secs(number(flag, value)),
                _ => {
                    eprintln!("Unknown argument: {flag}");
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        config
    }
}

fn number(flag: &str, value: &str) -> u64 {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: {flag} expects a non-negative integer, got '{value}'");
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
kvtable - Self-Expiring Key-Value Table Soak Driver

USAGE:
    kvtable [OPTIONS]

OPTIONS:
    -b, --backend <mem|sled>     Storage engine (default: mem)
        --path <DIR>             Database directory for sled (default: kvtable-data)
        --ttl-ms <MS>            Entry time-to-live (default: 2000)
        --prune-ms <MS>          Sweep interval (default: 200)
    -k, --keys <N>               Keys written at start (default: 1000)
        --refresh-ms <MS>        Refresh period for the first half (default: 500)
        --duration-secs <S>      Run time, 0 for until Ctrl+C (default: 10)
    -v, --version                Print version information
        --help                   Print this help message

Set RUST_LOG=kvtable=debug to see every sweep.
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!(
        version = kvtable::VERSION,
        backend = ?config.backend,
        keys = config.keys,
        "Starting soak run"
    );

    let cancel = CancellationToken::new();
    match config.backend {
        Backend::Mem => {
            let table = TtlTable::new(MemTable::new(), config.ttl, &cancel)?;
            soak(&table, &config, &cancel).await?;
        }
        Backend::Sled => {
            let db = SledTable::open(&config.path)?;
            let table = TtlTable::new(db, config.ttl, &cancel)?;
            soak(&table, &config, &cancel).await?;
            table.inner().flush()?;
        }
    }

    info!("Soak run complete");
    Ok(())
}

/// Writes the key set, refreshes the first half and reports until stopped.
async fn soak<T: Table + 'static>(
    table: &TtlTable<T>,
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let refreshed = config.keys / 2;
    for i in 0..config.keys {
        table.insert(&format!("key:{i}"), Bytes::from(format!("value-{i}")))?;
    }
    info!(keys = config.keys, refreshed, "Initial keys written");

    let mut refresh = time::interval(config.refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut report = time::interval(Duration::from_secs(1));
    report.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = (!config.duration.is_zero()).then(|| Instant::now() + config.duration);
    let run_out = async {
        match deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(run_out);

    let mut rounds = 0u64;
    loop {
        tokio::select! {
            _ = &mut run_out => {
                info!("Run duration elapsed");
                break;
            }
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Shutdown signal received");
                break;
            }
            _ = refresh.tick() => {
                for i in 0..refreshed {
                    table.insert(&format!("key:{i}"), Bytes::from(format!("value-{i}-{rounds}")))?;
                }
                rounds += 1;
            }
            _ = report.tick() => {
                info!(
                    live = table.size()?,
                    stored = table.inner().size()?,
                    pointer = table.prune_pointer(),
                    sweeper = ?table.sweeper_state(),
                    "Table status"
                );
            }
        }
    }

    cancel.cancel();
    table.shutdown().await;

    let live = table.size()?;
    info!(live, expected = refreshed, refresh_rounds = rounds, "Sweeper stopped");
    if live != refreshed {
        warn!(
            live,
            expected = refreshed,
            "Live count differs from the refreshed set; the run may have been shorter than the TTL"
        );
    }
    Ok(())
}
