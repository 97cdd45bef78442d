// crates/chat-server/src/client.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chat_core::{Broadcaster, ChatRouter, InboundEvent, OutboundEvent, RouterError};
use chat_protocol::line_codec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::hub::ConnectionHub;
use crate::types::{OutboundRx, MAX_LINE_BYTES};

/// How long queued output may take to drain once the reader is done.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the I/O loop for a single connection.
///
/// Returns once the peer leaves (`X`, EOF or a read error) or `shutdown`
/// changes. The connection's identity is released and the hub entry
/// removed whichever way it ends.
pub async fn run_client(
    connection_id: String,
    stream: TcpStream,
    router: Arc<ChatRouter>,
    hub: Arc<ConnectionHub>,
    out_rx: OutboundRx,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (read_stream, write_stream) = stream.into_split();

    // Writer task: consume OutboundEvents and write lines
    let writer_id = connection_id.clone();
    let writer = tokio::spawn(run_writer(writer_id, write_stream, out_rx));

    let read_result = run_reader(&connection_id, read_stream, &router, &hub, shutdown).await;

    let leave_result = dispatch(&router, &connection_id, DispatchKind::Leave).await;

    // Dropping the hub's sender lets the writer drain and finish.
    hub.unregister(&connection_id);
    if tokio::time::timeout(FLUSH_TIMEOUT, writer).await.is_err() {
        warn!(connection_id = %connection_id, "timed out flushing output");
    }

    if let Err(err) = leave_result.and_then(|r| r.map_err(anyhow::Error::from)) {
        error!(connection_id = %connection_id, error = %err, "failed to release identity");
    }

    read_result
}

async fn run_reader(
    connection_id: &str,
    mut read_stream: OwnedReadHalf,
    router: &Arc<ChatRouter>,
    hub: &Arc<ConnectionHub>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0u8; 1024];

    loop {
        let n = tokio::select! {
            read = read_stream.read(&mut temp_buf) => {
                read.with_context(|| format!("read error on {}", connection_id))?
            }
            _ = shutdown.changed() => {
                debug!(connection_id, "server shutting down");
                return Ok(());
            }
        };
        if n == 0 {
            // EOF - client disconnected
            return Ok(());
        }

        buffer.extend_from_slice(&temp_buf[..n]);

        // Process complete lines
        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
            let line = buffer.drain(..=newline_pos).collect::<Vec<u8>>();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(event) = line_codec::parse_input_line(line) else {
                warn!(connection_id, line, "invalid line");
                hub.send_to_caller(connection_id, OutboundEvent::rejected("Unrecognised command."));
                continue;
            };

            if event == InboundEvent::Disconnect {
                return Ok(());
            }

            debug!(connection_id, ?event, "inbound");
            if let Err(err) = dispatch(router, connection_id, DispatchKind::Event(event)).await? {
                if let RouterError::Registry(ref cause) = err {
                    error!(connection_id, error = %cause, "identity store failure");
                }
                hub.send_to_caller(connection_id, OutboundEvent::rejected(err.client_reason()));
            }
        }

        if buffer.len() > MAX_LINE_BYTES {
            bail!("{} sent a line longer than {} bytes", connection_id, MAX_LINE_BYTES);
        }
    }
}

async fn run_writer(connection_id: String, mut write_stream: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(event) = out_rx.recv().await {
        if let Err(e) = write_line(&mut write_stream, &event).await {
            warn!(connection_id = %connection_id, error = %e, "write error");
            break;
        }
    }
}

async fn write_line(stream: &mut OwnedWriteHalf, event: &OutboundEvent) -> std::io::Result<()> {
    let mut data = line_codec::format_output_line(event);
    data.push('\n');

    stream.write_all(data.as_bytes()).await?;
    stream.flush().await
}

enum DispatchKind {
    Event(InboundEvent),
    Leave,
}

/// Run a router call on a blocking thread; table-backed registries do
/// synchronous I/O.
async fn dispatch(
    router: &Arc<ChatRouter>,
    connection_id: &str,
    kind: DispatchKind,
) -> anyhow::Result<Result<(), RouterError>> {
    let router = router.clone();
    let connection_id = connection_id.to_string();

    tokio::task::spawn_blocking(move || match kind {
        DispatchKind::Event(event) => router.process_event(&connection_id, event),
        DispatchKind::Leave => router.disconnect(&connection_id).map(|_| ()),
    })
    .await
    .context("router task panicked")
}
