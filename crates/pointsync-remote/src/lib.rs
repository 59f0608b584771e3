//! Pointsync Remote - collaborator seams for the remote database and storage
//!
//! This crate provides:
//! - The change feed that database bridges publish notifications into
//! - The texture store client fetching images from remote storage
//! - The outbound state publisher (`ml-state` writes)
//!
//! The database wire protocol itself lives outside Pointsync; bridges
//! decode it and publish `ChangeNotification` values into a `ChangeFeed`.

pub mod feed;
pub mod publish;
pub mod storage;

pub use feed::{ChangeFeed, ChangeKind, ChangeNotification, DeliveryError, RecordSnapshot};
pub use publish::{HttpStatePublisher, MlState, PublishError, StatePublisher};
pub use storage::{HttpTextureStore, StorageError, TextureStore};
