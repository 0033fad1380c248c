use std::time::Duration;

use log::debug;
use redis::aio::ConnectionManager;

use crate::error::StoreError;

mod message_log;
mod room_directory;

#[cfg(test)]
pub mod memory;

pub use message_log::{MessageLog, RedisMessageLog};
pub use room_directory::{RedisRoomDirectory, RoomDirectory};

const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens the shared store connection and probes it for liveness. A store
/// that does not answer a `PING` within one second aborts startup.
pub async fn connect(url: &str) -> Result<ConnectionManager, StoreError> {
    let client = redis::Client::open(url)?;
    let mut manager = ConnectionManager::new(client).await?;

    let probe = redis::cmd("PING");
    let pong: String = tokio::time::timeout(PING_TIMEOUT, probe.query_async(&mut manager))
        .await
        .map_err(|_| StoreError::Unresponsive(PING_TIMEOUT))??;
    debug!("store liveness probe answered: {pong}");

    Ok(manager)
}

/// Key holding a room's encoded metadata.
pub(crate) fn room_key(room_id: &str) -> String {
    format!("rooms:{room_id}:data")
}

/// Key holding a room's score-ordered message set.
pub(crate) fn messages_key(room_id: &str) -> String {
    format!("{}:messages", room_key(room_id))
}

/// Key holding a room's last assigned message number.
pub(crate) fn counter_key(room_id: &str) -> String {
    format!("{}:last_message_number", room_key(room_id))
}
