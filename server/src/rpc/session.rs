use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tonic::{Status, Streaming};

use proto::chat::{ConnectRequest, ConnectResponse, connect_request};

use crate::hub::{RoomHub, Subscription};
use crate::models::Message;

use super::logger::CallLogger;
use super::{convert, errlog};

/// Frames the session emits back to the transport.
pub type Outbound = mpsc::Sender<Result<ConnectResponse, Status>>;

/// Drives one connected client after a successful handshake: emits the
/// history snapshot, then relays hub broadcasts out and client sends in
/// until either side ends the stream. The subscription is deregistered on
/// every exit path, exactly once.
pub async fn run(
    logger: CallLogger,
    hub: Arc<RoomHub>,
    subscription: Subscription,
    mut inbound: Streaming<ConnectRequest>,
    outbound: Outbound,
) {
    let Subscription {
        user_id,
        room_id,
        unread,
        mut outbox,
        guard,
    } = subscription;

    let result = if outbound
        .send(Ok(convert::message_list_frame(&unread)))
        .await
        .is_err()
    {
        // The client went away before the snapshot; nothing to relay.
        Ok(())
    } else {
        tokio::select! {
            res = pump(&logger, &mut outbox, &outbound) => res,
            res = ingress(&hub, &user_id, &room_id, &mut inbound) => res,
        }
    };

    guard.disconnect().await;

    if let Err(status) = result {
        errlog::report(&logger, &status);
        let _ = outbound.send(Err(status)).await;
    }
}

/// Drains the subscription outbox into the transport, one frame per
/// message. Ends when the hub closes the outbox or a send fails.
async fn pump(
    logger: &CallLogger,
    outbox: &mut mpsc::Receiver<Message>,
    outbound: &Outbound,
) -> Result<(), Status> {
    while let Some(message) = outbox.recv().await {
        if outbound
            .send(Ok(convert::message_frame(&message)))
            .await
            .is_err()
        {
            logger.debug("client send failed, stopping outbox pump");
            break;
        }
    }

    Ok(())
}

/// Reads client frames and feeds them into the hub. A clean end-of-stream
/// terminates the session; any frame other than a send is a protocol
/// error.
async fn ingress(
    hub: &RoomHub,
    user_id: &str,
    room_id: &str,
    inbound: &mut Streaming<ConnectRequest>,
) -> Result<(), Status> {
    loop {
        let frame = match inbound.message().await? {
            Some(frame) => frame,
            None => return Ok(()),
        };

        match frame.payload {
            Some(connect_request::Payload::SendMessage(send)) => {
                let message = Message {
                    // The hub assigns the number on append.
                    number: -1,
                    room_id: room_id.to_owned(),
                    user_id: user_id.to_owned(),
                    text: send.text,
                    created_at: Utc::now(),
                };
                hub.receive(message).await.map_err(Status::from)?;
            }
            _ => {
                return Err(Status::invalid_argument(
                    "only send_message frames are valid after the handshake",
                ));
            }
        }
    }
}
