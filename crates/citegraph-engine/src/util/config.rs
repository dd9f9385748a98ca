use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub node_fraction: f32,
    pub edge_fraction: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub size_power: f32,
    pub start_year: i32,
    pub end_year: i32,
    pub playback_step_delay_ms: u64,
    pub max_visible_nodes_warning_threshold: usize,
    pub edge_shuffle_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_fraction: 1.0,
            edge_fraction: 1.0,
            size_min: 0.6,
            size_max: 3.2,
            size_power: 1.5,
            start_year: 1950,
            end_year: 2025,
            playback_step_delay_ms: 120,
            max_visible_nodes_warning_threshold: 50_000,
            edge_shuffle_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn playback_step_delay(&self) -> Duration {
        Duration::from_millis(self.playback_step_delay_ms)
    }

    // Year span covered by the temporal index, normalized start <= end.
    pub fn year_span(&self) -> (i32, i32) {
        if self.start_year <= self.end_year {
            (self.start_year, self.end_year)
        } else {
            (self.end_year, self.start_year)
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "citegraph")?;
    Some(proj.config_dir().join("engine.toml"))
}

pub fn load_or_default() -> EngineConfig {
    let Some(path) = config_file_path() else {
        return EngineConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> EngineConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return EngineConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|_| EngineConfig::default())
}

pub fn save(cfg: &EngineConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

fn save_to_path(cfg: &EngineConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize engine config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write engine config {}", path.display()))?;
    Ok(())
}
