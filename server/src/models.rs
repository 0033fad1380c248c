use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named channel. Created once, never mutated; rooms have no expiration,
/// only their messages age out of the retention window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub owner_id: String,
    pub name: String,
}

/// A single post in a room. `number` is assigned by the room hub and is
/// strictly increasing per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub number: i64,
    pub room_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl Message {
    /// Storage representation. The encoding is stable across restarts: a
    /// freshly started server must be able to decode records written by a
    /// previous one.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
