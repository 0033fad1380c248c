use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{MessageLog, RoomDirectory};

use super::RoomHub;

/// Process-wide mapping from room id to its singleton hub. Hubs are built
/// lazily on the first connect for a room and live until the process exits.
pub struct HubRegistry {
    hubs: RwLock<HashMap<String, Arc<RoomHub>>>,
    rooms: Arc<dyn RoomDirectory>,
    log: Arc<dyn MessageLog>,
    max_messages: usize,
    retention: Duration,
}

impl HubRegistry {
    pub fn new(
        rooms: Arc<dyn RoomDirectory>,
        log: Arc<dyn MessageLog>,
        max_messages: usize,
        retention: Duration,
    ) -> Self {
        Self {
            hubs: RwLock::new(HashMap::new()),
            rooms,
            log,
            max_messages,
            retention,
        }
    }

    /// Double-checked lookup: a read-locked probe first, then a write-locked
    /// probe and construction on miss. A construction failure surfaces to
    /// the caller and leaves the map untouched, so the next caller retries.
    pub async fn get_or_create(&self, room_id: &str) -> Result<Arc<RoomHub>, StoreError> {
        let hubs = self.hubs.read().await;
        if let Some(hub) = hubs.get(room_id) {
            return Ok(Arc::clone(hub));
        }
        drop(hubs);

        let mut hubs = self.hubs.write().await;
        if let Some(hub) = hubs.get(room_id) {
            return Ok(Arc::clone(hub));
        }

        let room = self.rooms.get(room_id).await?;
        let hub = RoomHub::new(
            room,
            Arc::clone(&self.log),
            self.max_messages,
            self.retention,
        )
        .await?;
        let hub = Arc::new(hub);
        hubs.insert(room_id.to_owned(), Arc::clone(&hub));

        info!("hub for room {room_id} is live");
        Ok(hub)
    }
}
