//! CLI runner - executes commands

use crate::checkpoint::{Checkpointer, FileStateSink, MemoryStateSink};
use crate::cli::commands::{Cli, Commands, OutputFormat, StateCommands};
use crate::config::{load_config, ConnectorConfig};
use crate::engine::{CancelSignal, SyncConfig, SyncEngine};
use crate::error::{Error, Result, ResultExt};
use crate::extract::JsonlExtractor;
use crate::output::JsonLinesOutput;
use crate::replication;
use crate::state::StateOverride;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Turns Ctrl-C into a cancellation request while a sync runs
struct InterruptListener {
    handle: JoinHandle<()>,
}

impl InterruptListener {
    fn spawn(cancel: CancelSignal) -> Self {
        let handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current batch");
                cancel.cancel();
            }
        });
        Self { handle }
    }

    /// Stop listening; returns whether the listener was still running
    async fn stop(self) -> bool {
        self.handle.abort();
        match self.handle.await {
            Ok(()) => false,
            Err(e) => {
                debug!(cancelled = e.is_cancelled(), "Interrupt listener stopped");
                e.is_cancelled()
            }
        }
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Sync {
                data_dir,
                override_json,
                override_file,
            } => {
                self.sync(data_dir, override_json.as_deref(), override_file.as_deref())
                    .await
            }
            Commands::Streams => self.streams(),
            Commands::Validate => self.validate(),
            Commands::State { command } => match command {
                StateCommands::Show => self.state_show().await,
            },
        }
    }

    /// Load connector configuration
    fn load_config(&self) -> Result<ConnectorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        load_config(path)
    }

    /// Load the operator override, inline JSON taking precedence
    fn load_override(
        &self,
        inline: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Option<StateOverride>> {
        if let Some(json_str) = inline {
            return StateOverride::from_json(json_str).map(Some);
        }

        if let Some(path) = path {
            let content = fs::read_to_string(path).with_context(|| {
                format!("Failed to read override file {}", path.display())
            })?;
            return StateOverride::from_json(&content).map(Some);
        }

        Ok(None)
    }

    /// Checkpointer over the state file, or in memory when none is given
    fn checkpointer(&self, config: &ConnectorConfig) -> Checkpointer {
        let checkpointer = match &self.cli.state {
            Some(path) => Checkpointer::new(FileStateSink::new(path)),
            None => {
                warn!("No state file given; progress will not survive this process");
                Checkpointer::new(MemoryStateSink::new())
            }
        };
        checkpointer.with_config(config)
    }

    /// Run one sync
    async fn sync(
        &self,
        data_dir: &Path,
        override_json: Option<&str>,
        override_file: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let catalog = config.catalog()?;
        let state_override = self.load_override(override_json, override_file)?;

        let extractor = JsonlExtractor::new(data_dir).with_batch_size(config.batch_size);
        let mut output = JsonLinesOutput::stdout().pretty(self.cli.format == OutputFormat::Pretty);

        let mut engine = SyncEngine::new(self.checkpointer(&config))
            .with_config(SyncConfig::from_connector(&config));

        let interrupt = InterruptListener::spawn(engine.cancel_signal());

        info!(connector = %config.name, data_dir = %data_dir.display(), "Starting sync");
        let result = engine
            .run(&catalog, &extractor, &mut output, state_override.as_ref())
            .await;
        interrupt.stop().await;

        let state_file = self
            .cli
            .state
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());

        match result {
            Ok(report) => {
                self.output_message(&json!({
                    "type": "SYNC_SUMMARY",
                    "summary": {
                        "status": "SUCCEEDED",
                        "connector": config.name,
                        "stats": report.stats,
                        "state_file": state_file,
                        "streams": report.streams
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "SYNC_SUMMARY",
                    "summary": {
                        "status": "FAILED",
                        "connector": config.name,
                        "phase": engine.phase().to_string(),
                        "error": e.to_string(),
                        "stats": engine.stats(),
                        "state_file": state_file
                    }
                }));
                Err(e)
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = config.catalog()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Connector '{}' is valid with {} streams ({} selected)",
                    config.name,
                    catalog.streams().len(),
                    catalog.selected().len()
                )
            }
        }));

        Ok(())
    }

    /// List selected streams in traversal order
    fn streams(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = config.catalog()?;

        let streams = catalog
            .selected()
            .into_iter()
            .map(|stream| {
                let replication = replication::replication_for(stream)?;
                Ok(json!({
                    "id": stream.id,
                    "replication_method": replication.method(),
                    "replication_key": replication.key(),
                    "automatic_fields": stream.automatic_fields()
                }))
            })
            .collect::<Result<Vec<Value>>>()?;

        self.output_message(&json!({
            "type": "STREAMS",
            "connector": config.name,
            "streams": streams
        }));

        Ok(())
    }

    /// Print the persisted state
    async fn state_show(&self) -> Result<()> {
        let path = self
            .cli
            .state
            .as_ref()
            .ok_or_else(|| Error::config("State file not specified (use -s flag)"))?;
        let state = Checkpointer::new(FileStateSink::new(path)).read().await?;

        self.output_message(&json!({
            "type": "STATE",
            "state": state
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
