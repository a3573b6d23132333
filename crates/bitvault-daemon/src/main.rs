//! bitvaultd — headless BitVault wallet backend daemon.
//!
//! ```bash
//! bitvaultd --config /path/to/bitvaultd.toml
//! bitvaultd --validate   # Validate config and exit
//! ```

mod config;
mod coordinator;
mod error;

use anyhow::{Context, Result};
use std::path::PathBuf;

use coordinator::AppStateCoordinator;

fn main() -> Result<()> {
    // Security hardening: keep seed material out of core dumps.
    bitvault_core::memory::disable_core_dumps();

    // Install the rustls CryptoProvider before any TLS connection is
    // opened — the Electrum client panics on first handshake otherwise.
    rustls::crypto::ring::default_provider().install_default().ok();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/etc/bitvaultd/bitvaultd.toml");
    let mut validate_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => validate_only = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("bitvaultd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let mut daemon_config = config::DaemonConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    daemon_config.apply_env_overrides();
    daemon_config.validate().context("configuration validation failed")?;

    std::env::set_var("RUST_LOG", &daemon_config.server.log_level);
    env_logger::init();

    if validate_only {
        println!("configuration is valid.");
        println!("  data dir:    {}", daemon_config.server.data_dir.display());
        println!("  network:     {}", daemon_config.network());
        println!("  electrum:    {:?}", daemon_config.electrum.servers);
        println!("  gap limit:   {}", daemon_config.sync.gap_limit);
        println!("  pin policy:  {:?}", daemon_config.pin.policy);
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    let shutdown = rt.block_on(async {
        tokio::select! {
            result = run(daemon_config) => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("received shutdown signal, exiting");
                Ok(())
            }
        }
    });

    if let Err(e) = shutdown {
        log::error!("daemon error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// Bring up the `AppStateCoordinator` and idle, logging a heartbeat at
/// the configured cadence. Wiring a specific wallet's sync loop onto
/// this coordinator happens per `startSync`/`setActive` commands issued
/// by the UI boundary, which is out of scope for this binary (spec §1).
async fn run(config: config::DaemonConfig) -> Result<()> {
    log::info!("bitvaultd starting");
    log::info!("  data dir:  {}", config.server.data_dir.display());
    log::info!("  network:   {}", config.network());
    log::info!("  electrum:  {:?}", config.electrum.servers);

    let coordinator = AppStateCoordinator::new(&config.server.data_dir)
        .map_err(|e| anyhow::anyhow!("failed to start coordinator: {e}"))?;

    let interval = std::time::Duration::from_secs(config.server.heartbeat_interval_secs);
    loop {
        tokio::time::sleep(interval).await;
        let count = coordinator.list_wallets().len();
        log::debug!("heartbeat: {count} wallet(s) tracked");
    }
}

fn print_help() {
    println!(
        r#"bitvaultd — headless BitVault wallet backend daemon

USAGE:
    bitvaultd [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /etc/bitvaultd/bitvaultd.toml)
    --validate            Validate config file and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    BITVAULT_DATA_DIR         Data directory path
    BITVAULT_LOG_LEVEL        Log level (error/warn/info/debug/trace)
    BITVAULT_ELECTRUM_SERVERS Comma-separated Electrum server URLs
    BITVAULT_GAP_LIMIT        Address discovery gap limit
"#
    );
}
