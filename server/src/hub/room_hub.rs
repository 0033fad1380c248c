use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::error::StoreError;
use crate::models::{Message, Room};
use crate::store::MessageLog;

/// Capacity of each subscriber outbox.
const OUTBOX_CAPACITY: usize = 4;

/// How long a broadcast waits on a full outbox before the slow subscriber
/// is dropped from the roster. Sends run concurrently; the append path
/// never waits longer than this regardless of subscriber count.
const ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

struct HubState {
    messages: Vec<Message>,
    last_number: i64,
}

/// Per-room fan-out engine: caches the recent message window, assigns
/// sequence numbers on the append path, and broadcasts every appended
/// message to the connected subscribers.
///
/// Lock order: `state`, then `delivery`, then `subscribers`, always. The
/// `state` write guard is held across the durable append (the
/// serialization point that keeps published numbers contiguous and
/// persisted) and released as soon as the message is committed. The
/// `delivery` mutex serializes broadcasts in commit order; `subscribers`
/// is only taken briefly, to snapshot the roster and to drop stalled
/// entries, so connects and disconnects never wait behind a stalled
/// broadcast.
pub struct RoomHub {
    room: Room,
    log: Arc<dyn MessageLog>,
    state: RwLock<HubState>,
    delivery: Mutex<()>,
    subscribers: RwLock<HashMap<u64, mpsc::Sender<Message>>>,
    next_subscription_id: AtomicU64,
}

impl std::fmt::Debug for RoomHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHub")
            .field("room", &self.room)
            .finish_non_exhaustive()
    }
}

impl RoomHub {
    /// Builds the hub for `room`, populating the in-memory window from the
    /// durable log. `last_number` comes from the room's counter, not from
    /// the loaded window, so numbering survives retention pruning.
    pub async fn new(
        room: Room,
        log: Arc<dyn MessageLog>,
        max_messages: usize,
        retention: Duration,
    ) -> Result<Self, StoreError> {
        let (messages, last_number) = log.load_recent(&room.id, max_messages, retention).await?;

        Ok(Self {
            room,
            log,
            state: RwLock::new(HubState {
                messages,
                last_number,
            }),
            delivery: Mutex::new(()),
            subscribers: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(0),
        })
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Registers a subscriber and hands it a snapshot of the messages it
    /// has not read yet. Snapshot and registration happen under the state
    /// read guard, so the first broadcast the new outbox sees carries a
    /// number strictly above the snapshot's highest.
    pub async fn connect(self: &Arc<Self>, user_id: &str, last_read_number: i64) -> Subscription {
        let state = self.state.read().await;
        let mut subscribers = self.subscribers.write().await;

        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (sender, outbox) = mpsc::channel(OUTBOX_CAPACITY);
        subscribers.insert(id, sender);

        debug!(
            "subscriber {id} joined room {} ({} connected)",
            self.room.id,
            subscribers.len()
        );

        Subscription {
            user_id: user_id.to_owned(),
            room_id: self.room.id.clone(),
            unread: unread_tail(&state.messages, last_read_number),
            outbox,
            guard: SubscriptionGuard {
                hub: Arc::clone(self),
                id,
            },
        }
    }

    /// Append path: assigns the next sequence number, commits the message
    /// to the durable log, then broadcasts it. A failed append leaves
    /// `last_number` and the window untouched and surfaces the error.
    pub async fn receive(&self, mut message: Message) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        message.number = state.last_number + 1;
        self.log.append(&message).await?;

        state.last_number = message.number;
        state.messages.push(message.clone());

        // Claim the delivery turn and snapshot the roster before releasing
        // the append lock: a subscriber registering concurrently either
        // finds this message in its snapshot or receives it here, never
        // both, and outboxes see broadcasts in commit order.
        let delivery = self.delivery.lock().await;
        let roster: Vec<(u64, mpsc::Sender<Message>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();
        drop(state);

        let sends = roster.iter().map(|(id, sender)| {
            let message = message.clone();
            async move {
                match tokio::time::timeout(ENQUEUE_TIMEOUT, sender.send(message)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(_)) | Err(_) => Some(*id),
                }
            }
        });
        let stalled: Vec<u64> = join_all(sends).await.into_iter().flatten().collect();

        if !stalled.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in stalled {
                warn!(
                    "subscriber {id} in room {} stopped draining its outbox, dropping it",
                    self.room.id
                );
                subscribers.remove(&id);
            }
        }
        drop(delivery);

        Ok(())
    }

    /// Deregisters a subscriber and closes its outbox. Idempotent, and
    /// safe to call after the hub has already dropped the subscriber.
    pub async fn disconnect(&self, id: u64) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            debug!(
                "subscriber {id} left room {} ({} remain)",
                self.room.id,
                subscribers.len()
            );
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

/// Contiguous tail of `messages` with numbers above `last_read_number`;
/// negative means the whole window.
fn unread_tail(messages: &[Message], last_read_number: i64) -> Vec<Message> {
    if last_read_number < 0 {
        return messages.to_vec();
    }

    let start = messages.partition_point(|m| m.number <= last_read_number);
    messages[start..].to_vec()
}

/// The handle a session holds on a hub: identity, history snapshot, live
/// outbox, and the deregistration guard.
pub struct Subscription {
    pub user_id: String,
    pub room_id: String,
    pub unread: Vec<Message>,
    pub outbox: mpsc::Receiver<Message>,
    pub guard: SubscriptionGuard,
}

impl Subscription {
    pub async fn disconnect(&self) {
        self.guard.disconnect().await;
    }
}

/// Deregisters its subscription from the hub. Calling it more than once,
/// or after the hub already dropped the subscriber, is a no-op.
pub struct SubscriptionGuard {
    hub: Arc<RoomHub>,
    id: u64,
}

impl SubscriptionGuard {
    pub async fn disconnect(&self) {
        self.hub.disconnect(self.id).await;
    }
}
