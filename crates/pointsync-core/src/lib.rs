//! Pointsync Core - Core types, record decoding, and scene reconciliation
//!
//! This crate provides the foundational types for the Pointsync system:
//! - Remote record and coordinate decoding (numeric-as-text payloads)
//! - Scene registry mapping object keys to visual objects
//! - Reconciler applying remote changes to the registry

pub mod decode;
pub mod error;
pub mod reconciler;
pub mod scene;
pub mod types;

pub use decode::{parse_position, RawCoordinates};
pub use error::DecodeError;
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use scene::{SceneEvent, SceneRegistry};
pub use types::{Color, ObjectKey, RemoteRecord, Shape, VisualObject};
