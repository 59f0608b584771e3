//! Types for remote records and the visual objects mirrored from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique key of a visual object, derived from the record's image id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    /// Derive a key from a raw image id by stripping exactly one
    /// trailing `.png` occurrence.
    ///
    /// `"cat.png"` -> `"cat"`, `"cat.png.png"` -> `"cat.png"`, and ids
    /// without the suffix pass through unchanged.
    pub fn from_image_id(image_id: &str) -> Self {
        let base = image_id.strip_suffix(".png").unwrap_or(image_id);
        Self(base.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded snapshot of a remote record, immutable per notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Raw image id (filename, including extension)
    pub id: String,
    /// Position decoded from the coordinate payload
    pub position: [f32; 3],
    /// Similarity distance, used for the optional color mapping
    pub distance: Option<f32>,
}

impl RemoteRecord {
    /// Object key this record reconciles to
    pub fn key(&self) -> ObjectKey {
        ObjectKey::from_image_id(&self.id)
    }
}

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0 };

    /// Multiply all channels by a scalar (unclamped)
    pub fn scaled(self, f: f32) -> Color {
        Color {
            r: self.r * f,
            g: self.g * f,
            b: self.b * f,
        }
    }
}

/// Primitive shape of a visual object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Cube,
}

/// A scene entity mirrored from a remote record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualObject {
    /// Object key (unique within the registry)
    pub key: ObjectKey,
    /// Primitive shape
    pub shape: Shape,
    /// Local position
    pub position: [f32; 3],
    /// Uniform scale
    pub scale: f32,
    /// Surface color
    pub color: Color,
    /// Raw image bytes applied as the surface texture, if fetched
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub texture: Option<Vec<u8>>,
    /// Interaction tag for engine-side picking
    pub tag: String,
    /// Kinematic body: not physics-simulated, gravity disabled
    pub kinematic: bool,
    /// When the object was first created
    pub created_at: DateTime<Utc>,
    /// When the object was last updated
    pub updated_at: DateTime<Utc>,
}

impl VisualObject {
    /// Create a new kinematic cube at the given position
    pub fn cube(key: ObjectKey, position: [f32; 3], scale: f32, color: Color, tag: &str) -> Self {
        let now = Utc::now();
        Self {
            key,
            shape: Shape::Cube,
            position,
            scale,
            color,
            texture: None,
            tag: tag.to_string(),
            kinematic: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the last-modified timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
