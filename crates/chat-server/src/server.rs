//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Opens the identity backend chosen by the configuration.
//! - Builds one `ChatRouter` over that backend and the `ConnectionHub`.
//! - Accepts new TCP connections and assigns each a connection id.
//! - Spawns a per-client task to handle its I/O.
//! - On shutdown, stops accepting and releases every live identity.
//!
//! The per-client logic lives in the `client` module.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chat_core::ChatRouter;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::client;
use crate::config::Config;
use crate::hub::ConnectionHub;
use crate::types::{OutboundRx, OutboundTx};

/// How long clients get to say goodbye once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Connection ids must not repeat across restarts: a durable table may
/// still hold rows written by an earlier process.
fn next_connection_id() -> String {
    Uuid::new_v4().to_string()
}

/// Run the TCP server until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");

    serve_with_shutdown(listener, config, ctrl_c()).await
}

/// Accept connections on an already-bound listener until it fails.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    serve_with_shutdown(listener, config, std::future::pending()).await
}

/// Accept connections until `shutdown` resolves, then disconnect every
/// client so the names they hold are released.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    config: Config,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let instance_id = Uuid::new_v4().to_string();
    let registry = config
        .store_backend()
        .context("invalid CHAT_STORE_CONNECTION_STRING")?
        .open(&instance_id)
        .context("failed to open identity store")?;

    // Shared registry of connections -> outbound channels, plus groups.
    let hub = Arc::new(ConnectionHub::new());
    let router = Arc::new(ChatRouter::with_config(
        registry,
        hub.clone(),
        config.router_config(),
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut clients = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting connections");
                break;
            }
            // Reap finished client tasks.
            Some(_) = clients.join_next(), if !clients.is_empty() => {}
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;

                if hub.len() >= config.max_clients {
                    warn!(
                        %peer_addr,
                        max_clients = config.max_clients,
                        "rejecting connection: max_clients reached"
                    );
                    // Just drop the stream; client will see connection closed.
                    continue;
                }

                let connection_id = next_connection_id();
                info!(connection_id = %connection_id, %peer_addr, "accepted connection");

                // Create outbound channel for this connection.
                let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
                hub.register(&connection_id, out_tx);
                router.connect(&connection_id);

                let router = router.clone();
                let hub = hub.clone();
                let stop_rx = stop_rx.clone();

                clients.spawn(async move {
                    let id = connection_id.clone();
                    let result =
                        client::run_client(connection_id, stream, router, hub, out_rx, stop_rx).await;
                    match result {
                        Ok(()) => info!(connection_id = %id, "connection closed"),
                        Err(e) => warn!(connection_id = %id, error = %e, "connection closed with error"),
                    }
                });
            }
        }
    }

    drop(listener);
    let _ = stop_tx.send(true);

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while clients.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(remaining = clients.len(), "clients still running after grace period");
    }

    release_remaining(&router, &hub).await;
    info!(instance_id = %instance_id, "server stopped");
    Ok(())
}

/// Disconnect whatever is still registered in the hub.
async fn release_remaining(router: &Arc<ChatRouter>, hub: &Arc<ConnectionHub>) {
    let ids = hub.connection_ids();
    if ids.is_empty() {
        return;
    }
    warn!(count = ids.len(), "releasing identities of connections that did not finish");

    let router = router.clone();
    let hub = hub.clone();
    let released = tokio::task::spawn_blocking(move || {
        for id in ids {
            if let Err(err) = router.disconnect(&id) {
                error!(connection_id = %id, error = %err, "failed to release identity");
            }
            hub.unregister(&id);
        }
    })
    .await;

    if let Err(err) = released {
        error!(error = %err, "release task panicked");
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C"),
        Err(err) => {
            warn!(error = %err, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await
        }
    }
}
