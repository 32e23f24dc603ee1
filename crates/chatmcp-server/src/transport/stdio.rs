//! Line-delimited JSON-RPC over the process's standard input/output. One
//! session for the whole process's lifetime; exits when stdin closes.

use crate::server::ServerCore;
use chatmcp_protocol::JsonRpcMessage;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Run the server over stdio until input closes. Spawns a writer task that
/// serializes outbound frames one per line; the read loop itself runs on
/// the calling task.
pub async fn serve_stdio(server: Arc<ServerCore>) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    let (inbound_tx, inbound_rx) = mpsc::channel::<std::io::Result<String>>(64);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<JsonRpcMessage>(64);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            match message.to_line() {
                Ok(line) => {
                    if stdout.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                    if stdout.write_all(b"\n").await.is_err() {
                        break;
                    }
                    if stdout.flush().await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "failed to serialize outbound frame"),
            }
        }
    });

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdin).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if inbound_tx.send(Ok(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    if inbound_tx.send(Err(err)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    server.run_stdio(inbound_rx, outbound_tx).await;
    let _ = reader.await;
    let _ = writer.await;
    Ok(())
}
