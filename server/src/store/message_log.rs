use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::StoreError;
use crate::models::Message;

use super::{counter_key, messages_key};

/// Durable per-room record of messages plus the per-room sequence counter.
///
/// The hub is the only writer; it guarantees that appended numbers are
/// unique and strictly increasing per room.
#[tonic::async_trait]
pub trait MessageLog: Send + Sync {
    /// Persists `message` and advances the room's counter to its number.
    /// Both mutations land atomically: a failure leaves neither visible.
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Returns up to `max_count` of the most recent messages no older than
    /// `retention`, sorted by number ascending, together with the room's
    /// last assigned number (`-1` when the room has never seen a message).
    async fn load_recent(
        &self,
        room_id: &str,
        max_count: usize,
        retention: Duration,
    ) -> Result<(Vec<Message>, i64), StoreError>;
}

/// Message log backed by a redis sorted set per room, scored by the
/// message's creation time in nanoseconds, plus an integer counter cell.
/// Retention is enforced at read time; nothing is physically trimmed.
pub struct RedisMessageLog {
    redis: ConnectionManager,
}

impl RedisMessageLog {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[tonic::async_trait]
impl MessageLog for RedisMessageLog {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        let encoded = message.encode()?;
        let mut conn = self.redis.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(
                messages_key(&message.room_id),
                encoded,
                score(&message.created_at),
            )
            .ignore()
            .set(counter_key(&message.room_id), message.number)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    async fn load_recent(
        &self,
        room_id: &str,
        max_count: usize,
        retention: Duration,
    ) -> Result<(Vec<Message>, i64), StoreError> {
        let mut conn = self.redis.clone();
        let cutoff = retention_cutoff(retention);

        let raw: Vec<Vec<u8>> = conn
            .zrevrangebyscore_limit(messages_key(room_id), "+inf", cutoff, 0, max_count as isize)
            .await?;

        let mut messages = Vec::with_capacity(raw.len());
        for record in &raw {
            match Message::decode(record) {
                Ok(message) => messages.push(message),
                Err(err) => warn!("skipping undecodable message record in room {room_id}: {err}"),
            }
        }
        messages.sort_unstable_by_key(|m| m.number);

        let last_number: Option<i64> = conn.get(counter_key(room_id)).await?;
        Ok((messages, last_number.unwrap_or(-1)))
    }
}

/// Sorted-set score for a message: creation time in nanoseconds, enough
/// resolution to keep concurrent appends apart.
pub(crate) fn score(created_at: &DateTime<Utc>) -> i64 {
    created_at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

pub(crate) fn retention_cutoff(retention: Duration) -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    now.saturating_sub(retention.as_nanos().min(i64::MAX as u128) as i64)
}
