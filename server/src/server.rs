use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as TransportServer;

use proto::chat::FILE_DESCRIPTOR_SET;
use proto::chat::chat_service_server::ChatServiceServer;

use crate::config::AppConfig;
use crate::hub::HubRegistry;
use crate::rpc::ChatHandler;
use crate::store::{MessageLog, RedisMessageLog, RedisRoomDirectory, RoomDirectory};

/// How long in-flight calls get to finish after a stop is requested.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(10);

/// The assembled chat service: listener, hub registry and RPC surface.
pub struct Server {
    cfg: AppConfig,
    listener: TcpListener,
    handler: ChatHandler,
    shutdown: watch::Sender<bool>,
}

/// Requests a graceful stop of the server that handed it out.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Server {
    /// Binds the listener and wires the store-backed components together.
    /// With `PORT=0` the OS picks an ephemeral port, reported by `port()`.
    pub async fn bind(cfg: AppConfig, redis: ConnectionManager) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", cfg.port)).await?;

        let log: Arc<dyn MessageLog> = Arc::new(RedisMessageLog::new(redis.clone()));
        let rooms: Arc<dyn RoomDirectory> = Arc::new(RedisRoomDirectory::new(redis));
        let registry = Arc::new(HubRegistry::new(
            Arc::clone(&rooms),
            log,
            cfg.max_messages,
            cfg.max_retention,
        ));
        let handler = ChatHandler::new(registry, rooms, cfg.local);

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            cfg,
            listener,
            handler,
            shutdown,
        })
    }

    /// Port the listener is bound to.
    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Serves until the shutdown handle fires, then stops accepting new
    /// calls and gives in-flight ones `GRACEFUL_TIMEOUT` to finish before
    /// forcing the stop.
    pub async fn run(self) -> Result<()> {
        let port = self.port()?;

        let mut builder = TransportServer::builder();
        let mut router = builder.add_service(ChatServiceServer::new(self.handler));

        if self.cfg.local {
            let reflection = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()?;
            router = router.add_service(reflection);
        }

        let mut graceful = self.shutdown.subscribe();
        let mut forced = self.shutdown.subscribe();

        let serve = router.serve_with_incoming_shutdown(
            TcpListenerStream::new(self.listener),
            async move {
                let _ = graceful.wait_for(|stop| *stop).await;
            },
        );

        info!("server started on port {port}");

        tokio::pin!(serve);
        tokio::select! {
            res = &mut serve => res.map_err(anyhow::Error::from),
            _ = async {
                let _ = forced.wait_for(|stop| *stop).await;
                tokio::time::sleep(GRACEFUL_TIMEOUT).await;
            } => {
                warn!("graceful stop timed out after {GRACEFUL_TIMEOUT:?}, forcing shutdown");
                Ok(())
            }
        }
    }
}
