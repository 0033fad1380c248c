use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use proto::chat::chat_service_server::ChatService;
use proto::chat::{
    ConnectRequest, ConnectResponse, CreateRoomRequest, CreateRoomResponse, connect_request,
};

use crate::hub::HubRegistry;
use crate::store::RoomDirectory;

use super::logger::CallLogger;
use super::{errlog, session};

/// Buffer between the session task and the transport send loop.
const OUTBOUND_BUFFER: usize = 16;

pub struct ChatHandler {
    registry: Arc<HubRegistry>,
    rooms: Arc<dyn RoomDirectory>,
    local: bool,
}

impl ChatHandler {
    pub fn new(registry: Arc<HubRegistry>, rooms: Arc<dyn RoomDirectory>, local: bool) -> Self {
        Self {
            registry,
            rooms,
            local,
        }
    }
}

#[tonic::async_trait]
impl ChatService for ChatHandler {
    async fn create_room(
        &self,
        request: Request<CreateRoomRequest>,
    ) -> Result<Response<CreateRoomResponse>, Status> {
        let logger = CallLogger::new("CreateRoom");
        let req = request.into_inner();

        let room = self
            .rooms
            .create(&req.user_id, &req.name)
            .await
            .map_err(|err| {
                let status = Status::from(err);
                errlog::report(&logger, &status);
                status
            })?;

        if self.local {
            logger.info(format!("room {} created by {}", room.id, room.owner_id));
        }

        Ok(Response::new(CreateRoomResponse { room_id: room.id }))
    }

    type ConnectStream = ReceiverStream<Result<ConnectResponse, Status>>;

    async fn connect(
        &self,
        request: Request<Streaming<ConnectRequest>>,
    ) -> Result<Response<Self::ConnectStream>, Status> {
        let logger = CallLogger::new("Connect");
        let mut inbound = request.into_inner();

        let handshake = read_handshake(&mut inbound).await.map_err(|status| {
            errlog::report(&logger, &status);
            status
        })?;

        let hub = self
            .registry
            .get_or_create(&handshake.room_id)
            .await
            .map_err(|err| {
                let status = Status::from(err);
                errlog::report(&logger, &status);
                status
            })?;

        let subscription = hub
            .connect(&handshake.user_id, handshake.last_read_message_number)
            .await;

        if self.local {
            logger.info(format!(
                "user {} connected to room {} (last read {})",
                handshake.user_id, handshake.room_id, handshake.last_read_message_number
            ));
        }

        let (outbound, frames) = mpsc::channel(OUTBOUND_BUFFER);
        tokio::spawn(session::run(logger, hub, subscription, inbound, outbound));

        Ok(Response::new(ReceiverStream::new(frames)))
    }
}

/// The first frame of every stream must be the connect_room handshake.
async fn read_handshake(
    inbound: &mut Streaming<ConnectRequest>,
) -> Result<connect_request::ConnectRoom, Status> {
    let first = inbound.message().await?.ok_or_else(|| {
        Status::invalid_argument("stream closed before the connect_room handshake")
    })?;

    match first.payload {
        Some(connect_request::Payload::ConnectRoom(handshake)) => Ok(handshake),
        _ => Err(Status::invalid_argument(
            "first frame must be a connect_room handshake",
        )),
    }
}
