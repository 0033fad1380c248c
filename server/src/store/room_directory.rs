use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Room;

use super::room_key;

/// Creation and retrieval of room metadata by identifier.
#[tonic::async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Mints a room with a fresh unique identifier and persists it.
    async fn create(&self, owner_id: &str, name: &str) -> Result<Room, StoreError>;

    /// Fetches a room; a missing key is `StoreError::RoomNotFound`.
    async fn get(&self, room_id: &str) -> Result<Room, StoreError>;
}

/// Room directory storing encoded rooms under `rooms:<uuid>:data`, with no
/// expiration.
pub struct RedisRoomDirectory {
    redis: ConnectionManager,
}

impl RedisRoomDirectory {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[tonic::async_trait]
impl RoomDirectory for RedisRoomDirectory {
    async fn create(&self, owner_id: &str, name: &str) -> Result<Room, StoreError> {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_owned(),
            name: name.to_owned(),
        };

        let encoded = room.encode()?;
        let mut conn = self.redis.clone();
        let _: () = conn.set(room_key(&room.id), encoded).await?;

        Ok(room)
    }

    async fn get(&self, room_id: &str) -> Result<Room, StoreError> {
        let mut conn = self.redis.clone();
        let raw: Option<Vec<u8>> = conn.get(room_key(room_id)).await?;

        match raw {
            Some(data) => Ok(Room::decode(&data)?),
            None => Err(StoreError::RoomNotFound(room_id.to_owned())),
        }
    }
}
