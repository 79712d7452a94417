//! Relay orchestrator - wires store, chat session, listener and command loop.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use admin::AdminHandler;
use anyhow::{Context, Result};
use contracts::{DestinationStore, RelayBlueprint};
use dispatcher::FanoutDispatcher;
use ingestion::{ListenerConfig, UpstreamListener};
use platform::{DiscordGateway, DiscordSession, TwitterStreamSource};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::RelayStats;
use crate::error::CliError;

/// How long the command loop gets to drain after the gateway stops
const COMMAND_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Effective configuration, CLI overrides applied
    pub blueprint: RelayBlueprint,

    /// Discord bot token
    pub discord_token: String,

    /// Twitter bearer token
    pub twitter_token: String,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Gateway to command-handler queue size
    pub command_buffer: usize,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves
    ///
    /// Store open and session verification failures are fatal. After that the
    /// listener reconnects on its own and only `shutdown` ends the run.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RelayStats> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let store = Arc::new(
            store::open_store(&blueprint.store)
                .await
                .map_err(CliError::from)?,
        );
        let snapshot = store
            .list_destinations()
            .await
            .context("Failed to read configured destinations")?;
        info!(
            backend = store.backend(),
            destinations = snapshot.len(),
            "Configuration store opened"
        );

        let session = Arc::new(DiscordSession::new(
            self.config.discord_token.clone(),
            blueprint.chat.api_base.clone(),
        ));
        let bot_id = session.current_user().await.map_err(CliError::from)?;
        info!(bot = %bot_id, "Chat session verified");

        // Command loop: gateway -> admin handler
        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let gateway = DiscordGateway::new(
            self.config.discord_token.clone(),
            blueprint.chat.api_base.clone(),
        )
        .spawn(command_tx);
        let admin = AdminHandler::new(Arc::clone(&store), Arc::clone(&session), &blueprint.chat);
        let admin_task = tokio::spawn(async move { admin.run(command_rx).await });
        info!(prefix = %blueprint.chat.command_prefix, "Command loop started");

        // Relay loop: upstream -> fan-out
        let dispatcher = Arc::new(FanoutDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&session),
        ));
        let dispatch_metrics = dispatcher.metrics();
        let source = TwitterStreamSource::new(
            self.config.twitter_token.clone(),
            blueprint.upstream.api_base.clone(),
            blueprint.upstream.account_id.clone(),
        )
        .with_idle_timeout(Duration::from_secs(blueprint.upstream.stall_timeout_secs));
        let mut listener = UpstreamListener::new(
            source,
            dispatcher,
            ListenerConfig::from_secs(blueprint.upstream.backoff_secs),
        );
        let listener_metrics = listener.metrics();

        info!(account = %blueprint.upstream.account_id, "Relay running");

        tokio::select! {
            _ = listener.run() => {}
            _ = shutdown => {
                warn!("Received shutdown signal, stopping relay...");
            }
        }

        // Aborting the gateway drops the sender, which ends the admin loop
        gateway.abort();
        if tokio::time::timeout(COMMAND_DRAIN_TIMEOUT, admin_task)
            .await
            .is_err()
        {
            warn!("Command loop did not stop in time");
        }

        let stats = RelayStats {
            backend: blueprint.store.backend_name(),
            duration: started.elapsed(),
            listener: listener_metrics.snapshot(),
            dispatch: dispatch_metrics.snapshot(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            relayed = stats.listener.items_relayed,
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}
