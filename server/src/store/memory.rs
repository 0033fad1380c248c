//! In-memory store doubles for unit tests, so hub and registry tests run
//! without a live redis.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Message, Room};

use super::message_log::{retention_cutoff, score};
use super::{MessageLog, RoomDirectory};

fn injected_failure() -> StoreError {
    StoreError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "injected store failure",
    )))
}

#[derive(Default)]
struct RoomRecords {
    entries: Vec<(i64, Vec<u8>)>,
    last_number: i64,
}

/// Message log held in process memory, mirroring the redis layout: a
/// score-ordered record set and a counter per room.
#[derive(Default)]
pub struct InMemoryLog {
    records: Mutex<HashMap<String, RoomRecords>>,
    fail_appends: AtomicBool,
    fail_loads: AtomicBool,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Numbers of every record persisted for `room_id`, in append order.
    pub fn stored_numbers(&self, room_id: &str) -> Vec<i64> {
        let records = self.records.lock().unwrap();
        let Some(room) = records.get(room_id) else {
            return Vec::new();
        };
        room.entries
            .iter()
            .map(|(_, data)| Message::decode(data).unwrap().number)
            .collect()
    }
}

#[tonic::async_trait]
impl MessageLog for InMemoryLog {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let encoded = message.encode()?;
        let mut records = self.records.lock().unwrap();
        let room = records.entry(message.room_id.clone()).or_default();
        room.entries.push((score(&message.created_at), encoded));
        room.last_number = message.number;
        Ok(())
    }

    async fn load_recent(
        &self,
        room_id: &str,
        max_count: usize,
        retention: Duration,
    ) -> Result<(Vec<Message>, i64), StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let cutoff = retention_cutoff(retention);
        let records = self.records.lock().unwrap();
        let Some(room) = records.get(room_id) else {
            return Ok((Vec::new(), -1));
        };

        let mut messages: Vec<Message> = room
            .entries
            .iter()
            .filter(|(score, _)| *score >= cutoff)
            .filter_map(|(_, data)| Message::decode(data).ok())
            .collect();
        messages.sort_unstable_by_key(|m| m.number);
        if messages.len() > max_count {
            messages.drain(..messages.len() - max_count);
        }

        Ok((messages, room.last_number))
    }
}

/// Room directory held in process memory.
#[derive(Default)]
pub struct InMemoryDirectory {
    rooms: Mutex<HashMap<String, Room>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing room under its own id.
    pub fn insert(&self, room: Room) {
        self.rooms.lock().unwrap().insert(room.id.clone(), room);
    }
}

#[tonic::async_trait]
impl RoomDirectory for InMemoryDirectory {
    async fn create(&self, owner_id: &str, name: &str) -> Result<Room, StoreError> {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_owned(),
            name: name.to_owned(),
        };
        self.insert(room.clone());
        Ok(room)
    }

    async fn get(&self, room_id: &str) -> Result<Room, StoreError> {
        self.rooms
            .lock()
            .unwrap()
            .get(room_id)
            .cloned()
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_owned()))
    }
}
