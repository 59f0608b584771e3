//! Scene registry: the owned index from object keys to visual objects
//!
//! Replaces scene-wide lookup-by-name with an explicit map, so existence
//! checks are O(1) and at most one object per key holds structurally.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::{ObjectKey, VisualObject};

/// Change event emitted as the registry is reconciled, for engine
/// bindings mirroring the registry into an actual scene graph
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SceneEvent {
    #[serde(rename = "object_created")]
    ObjectCreated(VisualObject),
    #[serde(rename = "object_updated")]
    ObjectUpdated(VisualObject),
    #[serde(rename = "object_removed")]
    ObjectRemoved(ObjectKey),
    #[serde(rename = "texture_applied")]
    TextureApplied(ObjectKey),
}

/// Registry of live visual objects, keyed by object key
#[derive(Debug, Default)]
pub struct SceneRegistry {
    objects: HashMap<ObjectKey, VisualObject>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&VisualObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: &ObjectKey) -> Option<&mut VisualObject> {
        self.objects.get_mut(key)
    }

    /// Insert an object under its own key, returning the previous
    /// occupant if the key was taken
    pub fn insert(&mut self, object: VisualObject) -> Option<VisualObject> {
        self.objects.insert(object.key.clone(), object)
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<VisualObject> {
        self.objects.remove(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &VisualObject> {
        self.objects.values()
    }
}
