use std::time::Duration;

use thiserror::Error;
use tonic::Status;

/// Errors surfaced by the store-backed components. "Room not found" is a
/// caller-visible condition; everything else is a backend or codec failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),
    #[error("store request failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store did not respond within {0:?}")]
    Unresponsive(Duration),
    #[error("bad record encoding: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::RoomNotFound(_) => Status::not_found(message),
            StoreError::Redis(_) | StoreError::Unresponsive(_) => {
                Status::failed_precondition(message)
            }
            StoreError::Codec(_) => Status::internal(message),
        }
    }
}
