//! Change feed: child-change notifications fanned out to consumers

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use pointsync_core::{parse_position, DecodeError, RawCoordinates, RemoteRecord};

/// Kind of child change observed under the watched collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Child appeared under the collection
    Added,
    /// Existing child's value changed
    Changed,
    /// Child was removed from the collection
    Removed,
}

/// Delivery failure reported by the remote database alongside an event
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct DeliveryError {
    /// Database-specific error code, when one was reported
    #[serde(default)]
    pub code: Option<i32>,
    pub message: String,
}

/// JSON shape of a database child snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// Image filename, extension included
    pub id: String,
    /// Coordinate payload; absent on `Removed` notifications
    #[serde(default)]
    pub coordinates: Option<RawCoordinates>,
    /// Similarity distance
    #[serde(default)]
    pub distance: Option<f32>,
}

impl RecordSnapshot {
    /// Decode into an immutable record, parsing the coordinate payload
    pub fn to_record(&self) -> Result<RemoteRecord, DecodeError> {
        let raw = self
            .coordinates
            .as_ref()
            .ok_or(DecodeError::MissingCoordinates)?;
        Ok(RemoteRecord {
            id: self.id.clone(),
            position: parse_position(raw)?,
            distance: self.distance,
        })
    }
}

/// A single child-change notification from the remote database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    /// Snapshot of the child, absent when delivery failed
    #[serde(default)]
    pub snapshot: Option<RecordSnapshot>,
    /// Delivery error; a notification carrying one is logged and dropped
    #[serde(default)]
    pub error: Option<DeliveryError>,
}

impl ChangeNotification {
    pub fn new(kind: ChangeKind, snapshot: RecordSnapshot) -> Self {
        Self {
            kind,
            snapshot: Some(snapshot),
            error: None,
        }
    }

    pub fn failed(kind: ChangeKind, error: DeliveryError) -> Self {
        Self {
            kind,
            snapshot: None,
            error: Some(error),
        }
    }
}

/// Broadcast fan-out of change notifications.
///
/// Database bridges publish into the feed; any number of consumers
/// subscribe. Slow consumers lag and skip rather than block publishers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeNotification>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a notification to all current subscribers
    pub fn publish(&self, notification: ChangeNotification) {
        // No subscribers is fine; the notification is simply dropped
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_from_json() {
        let json = r#"{
            "kind": "changed",
            "snapshot": {
                "id": "a.png",
                "coordinates": { "x": "1", "y": "2", "z": "3" },
                "distance": 0.5
            }
        }"#;
        let n: ChangeNotification = serde_json::from_str(json).unwrap();
        assert_eq!(n.kind, ChangeKind::Changed);
        assert!(n.error.is_none());

        let record = n.snapshot.unwrap().to_record().unwrap();
        assert_eq!(record.position, [1.0, 2.0, 3.0]);
        assert_eq!(record.distance, Some(0.5));
        assert_eq!(record.key().as_str(), "a");
    }

    #[test]
    fn test_error_notification_from_json() {
        let json = r#"{"kind":"changed","error":{"code":-3,"message":"permission denied"}}"#;
        let n: ChangeNotification = serde_json::from_str(json).unwrap();
        let error = n.error.unwrap();
        assert_eq!(error.code, Some(-3));
        assert_eq!(error.to_string(), "permission denied");
        assert!(n.snapshot.is_none());
    }

    #[test]
    fn test_removed_snapshot_without_coordinates() {
        let json = r#"{"kind":"removed","snapshot":{"id":"a.png"}}"#;
        let n: ChangeNotification = serde_json::from_str(json).unwrap();
        let snapshot = n.snapshot.unwrap();
        assert!(snapshot.coordinates.is_none());
        assert_eq!(
            snapshot.to_record().unwrap_err(),
            pointsync_core::DecodeError::MissingCoordinates
        );
    }

    #[tokio::test]
    async fn test_feed_roundtrip() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();

        feed.publish(ChangeNotification::new(
            ChangeKind::Added,
            RecordSnapshot {
                id: "a.png".to_string(),
                coordinates: None,
                distance: None,
            },
        ));

        let n = rx.recv().await.unwrap();
        assert_eq!(n.kind, ChangeKind::Added);
        assert_eq!(n.snapshot.unwrap().id, "a.png");
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let feed = ChangeFeed::default();
        feed.publish(ChangeNotification::failed(
            ChangeKind::Changed,
            DeliveryError {
                code: None,
                message: "disconnected".to_string(),
            },
        ));
    }
}
