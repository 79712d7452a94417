//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{RelayBlueprint, StoreConfig};
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};

/// Embedded database file name inside `--db-dir`
const DB_FILE_NAME: &str = "kirb.db";

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = ConfigLoader::parse_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Validate what will actually run, not the raw file
    apply_overrides(&mut blueprint, args)?;
    ConfigLoader::validate(&blueprint)
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    info!(
        account = %blueprint.upstream.account_id,
        backend = blueprint.store.backend_name(),
        backoff_secs = blueprint.upstream.backoff_secs,
        prefix = %blueprint.chat.command_prefix,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let discord_token = args
        .discord_token
        .clone()
        .ok_or_else(|| CliError::missing_credential("DISCORD_TOKEN", "discord-token"))?;
    let twitter_token = args
        .twitter_bearer_token
        .clone()
        .ok_or_else(|| CliError::missing_credential("TWITTER_BEARER_TOKEN", "twitter-bearer-token"))?;

    let relay = Relay::new(RelayConfig {
        blueprint,
        discord_token,
        twitter_token,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        command_buffer: args.command_buffer.max(1),
    });

    info!("Starting relay...");

    let stats = relay
        .run(setup_shutdown_signal())
        .await
        .context("Relay execution failed")?;
    stats.print_summary();

    info!("kirb relay finished");
    Ok(())
}

/// Apply `--mem`, `--db-dir` and `--backoff-secs` on top of the file
fn apply_overrides(blueprint: &mut RelayBlueprint, args: &RunArgs) -> Result<()> {
    if args.mem {
        info!("Using in-memory store from CLI, destinations will not persist");
        blueprint.store = StoreConfig::Memory;
    } else if let Some(ref dir) = args.db_dir {
        let path = dir.join(DB_FILE_NAME);
        info!(path = %path.display(), "Overriding embedded store path from CLI");
        blueprint.store = StoreConfig::Embedded { path };
    }

    if let Some(secs) = args.backoff_secs {
        if secs == 0 {
            anyhow::bail!("--backoff-secs must be greater than 0");
        }
        info!(backoff_secs = secs, "Overriding reconnect backoff from CLI");
        blueprint.upstream.backoff_secs = secs;
    }

    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that cannot be installed never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Upstream:");
    println!("  Account: {}", blueprint.upstream.account_id);
    println!("  API: {}", blueprint.upstream.api_base);
    println!("  Backoff: {}s", blueprint.upstream.backoff_secs);

    println!("\nStore:");
    match &blueprint.store {
        StoreConfig::Memory => println!("  Backend: memory (not persisted)"),
        StoreConfig::Embedded { path } => {
            println!("  Backend: embedded");
            println!("  Path: {}", path.display());
        }
        StoreConfig::Relational {
            max_connections, ..
        } => {
            println!("  Backend: relational");
            println!("  Max connections: {}", max_connections);
        }
    }

    println!("\nChat:");
    println!("  API: {}", blueprint.chat.api_base);
    println!("  Command prefix: {}", blueprint.chat.command_prefix);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use config_loader::ConfigFormat;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[upstream]
account_id = "826639173557837824"

[store]
backend = "embedded"
path = "/var/lib/kirb/kirb.db"
"#;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["kirb-relay", "run"].into_iter().chain(extra.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn blueprint() -> RelayBlueprint {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_mem_selects_memory_backend() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &run_args(&["--mem"])).unwrap();
        assert_eq!(bp.store, StoreConfig::Memory);
    }

    #[test]
    fn test_db_dir_points_at_kirb_db() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &run_args(&["--db-dir", "/data"])).unwrap();
        assert_eq!(
            bp.store,
            StoreConfig::Embedded {
                path: PathBuf::from("/data/kirb.db")
            }
        );
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &run_args(&[])).unwrap();
        assert_eq!(bp.store, blueprint().store);
        assert_eq!(bp.upstream.backoff_secs, 30);
    }

    #[test]
    fn test_backoff_override() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &run_args(&["--backoff-secs", "5"])).unwrap();
        assert_eq!(bp.upstream.backoff_secs, 5);

        let err = apply_overrides(&mut bp, &run_args(&["--backoff-secs", "0"])).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_credentials() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, CONFIG.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut args = run_args(&["--config", &path, "--dry-run"]);
        args.discord_token = None;
        args.twitter_bearer_token = None;
        run_relay(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_connecting() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, CONFIG.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut args = run_args(&["--config", &path, "--mem"]);
        args.discord_token = None;
        args.twitter_bearer_token = Some("bearer".to_string());
        let err = run_relay(&args).await.unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"), "got: {err}");
    }

    #[tokio::test]
    async fn test_mem_overrides_broken_store_block() {
        let config = r#"
[upstream]
account_id = "826639173557837824"

[store]
backend = "relational"
url = "mysql://x"
"#;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, config.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut args = run_args(&["--config", &path, "--dry-run"]);
        assert!(run_relay(&args).await.is_err());

        args.mem = true;
        run_relay(&args).await.unwrap();
    }
}
