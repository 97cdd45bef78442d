//! Line-protocol TCP server for the group chat.

use chat_server::config::Config;
use chat_server::server;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "chat_server=info,chat_core=info,chat_store=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        durable_store = config.store_connection_string.is_some(),
        "starting chat-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    server::run(config).await
}
