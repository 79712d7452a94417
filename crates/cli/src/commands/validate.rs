//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, StoreConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Backoff below this many seconds risks upstream rate limiting
const MIN_RECOMMENDED_BACKOFF_SECS: u64 = 5;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    account_id: String,
    backoff_secs: u64,
    store_backend: String,
    command_prefix: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    account_id: blueprint.upstream.account_id.clone(),
                    backoff_secs: blueprint.upstream.backoff_secs,
                    store_backend: blueprint.store.backend_name().to_string(),
                    command_prefix: blueprint.chat.command_prefix.clone(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    match &blueprint.store {
        StoreConfig::Memory => {
            warnings.push("store.backend is memory - destinations are lost on restart".to_string());
        }
        StoreConfig::Relational { url, .. } if url.starts_with("sqlite:") => {
            warnings.push(
                "store.url uses sqlite - intended for local runs, not shared deployments"
                    .to_string(),
            );
        }
        _ => {}
    }

    if blueprint.upstream.backoff_secs < MIN_RECOMMENDED_BACKOFF_SECS {
        warnings.push(format!(
            "upstream.backoff_secs is {} - reconnecting this fast may be rate limited",
            blueprint.upstream.backoff_secs
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Account: {}", summary.account_id);
            println!("  Backoff: {}s", summary.backoff_secs);
            println!("  Store: {}", summary.store_backend);
            println!("  Prefix: {}", summary.command_prefix);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
