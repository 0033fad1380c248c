use std::fmt::Display;
use std::process;

use log::{error, info};

use server::config::AppConfig;
use server::server::Server;
use server::store;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            // The logger is not up yet.
            eprintln!("failed to load config: {err}");
            process::exit(1);
        }
    };

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(cfg.log_level.as_str()));

    let redis = match store::connect(&cfg.redis_connection_url()).await {
        Ok(conn) => conn,
        Err(err) => fail("failed to connect to the message store", err),
    };

    let srv = match Server::bind(cfg, redis).await {
        Ok(srv) => srv,
        Err(err) => fail("failed to start server", err),
    };

    let handle = srv.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            handle.shutdown();
        }
    });

    if let Err(err) = srv.run().await {
        fail("server error", err);
    }
}

fn fail(context: &str, err: impl Display) -> ! {
    error!("{context}: {err}");
    process::exit(1);
}
