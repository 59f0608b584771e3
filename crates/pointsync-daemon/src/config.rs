//! Configuration loading and validation

use anyhow::Result;
use pointsync_core::{Color, ReconcilerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            scene: SceneConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the realtime database (for outbound writes)
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Base URL of the storage bucket serving image files
    #[serde(default = "default_storage_url")]
    pub storage_base_url: String,
    /// Database collection whose children are watched
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Database path the ml-state flag is written to
    #[serde(default = "default_ml_state_path")]
    pub ml_state_path: String,
    /// Timeout for outbound HTTP requests in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            storage_base_url: default_storage_url(),
            collection: default_collection(),
            ml_state_path: default_ml_state_path(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "https://vrml-c8ee5.firebaseio.com".to_string()
}

fn default_storage_url() -> String {
    "https://storage.googleapis.com/vrml-c8ee5.appspot.com".to_string()
}

fn default_collection() -> String {
    "images_similar_100".to_string()
}

fn default_ml_state_path() -> String {
    "ml-state".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Uniform scale of newly created objects
    #[serde(default = "default_scale")]
    pub default_scale: f32,
    /// Color of newly created objects
    #[serde(default = "default_color")]
    pub default_color: Color,
    /// Interaction tag of newly created objects
    #[serde(default = "default_tag")]
    pub object_tag: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_scale: default_scale(),
            default_color: default_color(),
            object_tag: default_tag(),
        }
    }
}

fn default_scale() -> f32 {
    0.01
}

fn default_color() -> Color {
    Color::BLUE
}

fn default_tag() -> String {
    "InteractionCube".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Process `Added` notifications (not just `Changed`)
    #[serde(default = "default_true")]
    pub handle_child_added: bool,
    /// Fetch each record's image and apply it as the object texture
    #[serde(default)]
    pub fetch_textures: bool,
    /// Derive object color from the record's distance field
    #[serde(default)]
    pub color_by_distance: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            handle_child_added: true,
            fetch_textures: false,
            color_by_distance: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Convert to the core reconciler configuration
    pub fn to_reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            handle_child_added: self.reconcile.handle_child_added,
            color_by_distance: self.reconcile.color_by_distance,
            default_scale: self.scene.default_scale,
            default_color: self.scene.default_color,
            object_tag: self.scene.object_tag.clone(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
