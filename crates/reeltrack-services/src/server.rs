use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Turns one decoded request into exactly one reply.
pub trait Responder: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn respond(&self, request: Value) -> Value;
}

pub fn error_reply(message: impl Into<String>) -> Value {
    json!({ "status": "error", "message": message.into() })
}

/// Accepts connections until the task is aborted. Each connection is served
/// strictly in request/reply order.
pub fn spawn<R: Responder>(listener: TcpListener, responder: Arc<R>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Ok(addr) = listener.local_addr() {
            info!(service = responder.name(), %addr, "listening");
        }
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(service = responder.name(), %peer, "client connected");
                    tokio::spawn(handle_connection(stream, responder.clone()));
                }
                Err(err) => {
                    warn!(service = responder.name(), error = %err, "accept failed");
                }
            }
        }
    })
}

async fn handle_connection<R: Responder>(stream: TcpStream, responder: Arc<R>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(service = responder.name(), error = %err, "read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Value>(&line) {
            Ok(request) => responder.respond(request),
            Err(_) => error_reply("malformed request"),
        };

        let mut payload = reply.to_string();
        payload.push('\n');
        if let Err(err) = write.write_all(payload.as_bytes()).await {
            warn!(service = responder.name(), error = %err, "write failed");
            break;
        }
    }
    debug!(service = responder.name(), "client disconnected");
}
