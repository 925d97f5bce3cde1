//! Shared CLI helpers used across multiple commands.

use clap::Args;
use recirc_control::{EngineSettings, GraphDef};
use std::path::{Path, PathBuf};

/// Engine settings flags shared by commands that build an engine.
#[derive(Args)]
pub struct SettingsArgs {
    /// Settings file (TOML); defaults to the user config file if present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<f32>,

    /// Override the processing block size
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Override the channel ceiling
    #[arg(long)]
    pub max_channels: Option<usize>,
}

impl SettingsArgs {
    /// Loads settings and applies command-line overrides.
    pub fn load(&self) -> anyhow::Result<EngineSettings> {
        let mut settings = EngineSettings::load_or_default(self.config.as_deref())?;
        if let Some(rate) = self.sample_rate {
            settings.sample_rate = rate;
        }
        if let Some(block) = self.block_size {
            settings.block_size = block;
        }
        if let Some(channels) = self.max_channels {
            settings.max_channels = channels;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Reads a graph document from a JSON file.
pub fn load_graph(path: &Path) -> anyhow::Result<GraphDef> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    GraphDef::from_json(&json).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

/// Settings whose channel ceiling admits `graph`.
pub fn fit_channels(mut settings: EngineSettings, graph: &GraphDef) -> EngineSettings {
    settings.max_channels = settings.max_channels.max(graph.output_channels);
    settings
}
