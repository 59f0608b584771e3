//! Reconciliation of remote records into the scene registry
//!
//! Upsert semantics: a record for an unseen key creates a default cube,
//! a record for a known key updates it in place. Removal is explicit and
//! driven by `Removed` notifications. Formerly dormant behaviors (color
//! by distance, handling `Added` events) sit behind explicit config
//! flags instead of commented-out branches.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scene::{SceneEvent, SceneRegistry};
use crate::types::{Color, ObjectKey, RemoteRecord, VisualObject};

/// Reconciler behavior flags and object defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Process `Added` notifications (not just `Changed`)
    #[serde(default = "default_true")]
    pub handle_child_added: bool,
    /// Derive object color from the record's distance field
    #[serde(default)]
    pub color_by_distance: bool,
    /// Uniform scale for newly created objects
    #[serde(default = "default_scale")]
    pub default_scale: f32,
    /// Color for newly created objects
    #[serde(default = "default_color")]
    pub default_color: Color,
    /// Interaction tag for newly created objects
    #[serde(default = "default_tag")]
    pub object_tag: String,
}

fn default_true() -> bool {
    true
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

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            handle_child_added: true,
            color_by_distance: false,
            default_scale: default_scale(),
            default_color: default_color(),
            object_tag: default_tag(),
        }
    }
}

/// Applies decoded remote records to a scene registry
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Upsert a record into the registry.
    ///
    /// Idempotent: applying the same record twice yields the same final
    /// state and never a duplicate object.
    pub fn apply(&self, scene: &mut SceneRegistry, record: &RemoteRecord) -> SceneEvent {
        let key = record.key();

        if let Some(object) = scene.get_mut(&key) {
            object.position = record.position;
            if self.config.color_by_distance {
                if let Some(distance) = record.distance {
                    object.color = Color::RED.scaled(distance);
                }
            }
            object.touch();
            debug!(key = %key, position = ?record.position, "Updated object");
            return SceneEvent::ObjectUpdated(object.clone());
        }

        let mut object = VisualObject::cube(
            key.clone(),
            record.position,
            self.config.default_scale,
            self.config.default_color,
            &self.config.object_tag,
        );
        if self.config.color_by_distance {
            if let Some(distance) = record.distance {
                object.color = Color::RED.scaled(distance);
            }
        }
        scene.insert(object.clone());
        debug!(key = %key, position = ?record.position, "Created object");
        SceneEvent::ObjectCreated(object)
    }

    /// Remove the object for a key, if present
    pub fn remove(&self, scene: &mut SceneRegistry, key: &ObjectKey) -> Option<SceneEvent> {
        scene.remove(key).map(|_| {
            debug!(key = %key, "Removed object");
            SceneEvent::ObjectRemoved(key.clone())
        })
    }
}
