//! AMQP 1.0 server endpoint: accepts connections and runs one session
//! driver per client.

use tokio::net::TcpListener;
use tracing::{debug, info};

mod config;
mod connection;

use crate::config::Config;
use crate::connection::Connection;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let listener = TcpListener::bind((config.host_ip.as_str(), config.port)).await?;
    info!(host = %config.host_ip, port = config.port, "server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "client connected");
        let config = config.clone();
        tokio::spawn(async move {
            let mut connection = Connection::new(stream, config);
            if let Err(error) = connection.run().await {
                debug!(%peer, %error, "closing client connection");
            }
        });
    }
}
