//! Decode errors for remote record payloads

use thiserror::Error;

/// Failure decoding a remote record snapshot.
///
/// Fatal to the single event it occurred in: callers log the error and
/// drop the notification, no retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Non-numeric coordinate {axis}: {text:?}")]
    BadCoordinate { axis: char, text: String },
    #[error("Snapshot has no coordinate payload")]
    MissingCoordinates,
}
