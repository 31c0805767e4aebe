//! Request/reply transport to a single fixed peer.
//!
//! A channel is strictly half-duplex: the channel lock is held from the moment
//! a request is written until its reply has been read, so concurrent callers
//! queue instead of interleaving. A channel that failed or timed out mid-call
//! is discarded, because a late reply would otherwise be read as the answer to
//! the next request; the next call dials again.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reeltrack_core::{ServiceEndpoint, ServiceRole};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};

/// Default time budget for one round trip.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Transport: Send + Sync {
    fn endpoint(&self) -> &ServiceEndpoint;

    /// Sends one request and waits for exactly one reply.
    async fn call(&self, request: Value) -> ServiceResult<Value>;
}

/// Whether a failed call may be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    /// Mutating calls: the peer may already have applied the request.
    Never,
    /// Idempotent reads get one more attempt after an unavailable peer.
    Once,
}

/// Serializes `request`, performs the round trip, and decodes the reply.
pub(crate) async fn exchange<Req, Rep>(
    transport: &dyn Transport,
    request: &Req,
    retry: Retry,
) -> ServiceResult<Rep>
where
    Req: Serialize + ?Sized,
    Rep: DeserializeOwned,
{
    let role = transport.endpoint().role;
    let payload = serde_json::to_value(request)
        .map_err(|err| ServiceError::protocol(role, format!("unencodable request: {err}")))?;

    let reply = match transport.call(payload.clone()).await {
        Err(err) if retry == Retry::Once && err.is_unavailable() => {
            warn!(role = %role, error = %err, "retrying idempotent call once");
            transport.call(payload).await?
        }
        other => other?,
    };

    serde_json::from_value(reply).map_err(|err| {
        counter!("reeltrack_service_calls_total", "role" => role.as_str(), "outcome" => "malformed")
            .increment(1);
        ServiceError::protocol(role, err.to_string())
    })
}

struct Channel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Channel {
    async fn round_trip(&mut self, line: &str) -> std::io::Result<String> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        let read = self.reader.read_line(&mut reply).await?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            ));
        }
        Ok(reply)
    }
}

/// Line-delimited JSON over TCP.
pub struct TcpTransport {
    endpoint: ServiceEndpoint,
    timeout: Duration,
    channel: Mutex<Option<Channel>>,
}

impl TcpTransport {
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            channel: Mutex::new(None),
        }
    }

    pub fn role(&self) -> ServiceRole {
        self.endpoint.role
    }

    /// Opens the channel eagerly if it is not already open.
    pub async fn connect(&self) -> ServiceResult<()> {
        let mut guard = self.channel.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        Ok(())
    }

    /// Drops the channel; a later call reconnects.
    pub async fn close(&self) {
        let mut guard = self.channel.lock().await;
        if let Some(mut channel) = guard.take() {
            let _ = channel.writer.shutdown().await;
            debug!(endpoint = %self.endpoint, "channel closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.channel.lock().await.is_some()
    }

    async fn open(&self) -> ServiceResult<Channel> {
        let role = self.endpoint.role;
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.endpoint.address))
            .await
            .map_err(|_| {
                ServiceError::unavailable(role, format!("connect to {} timed out", self.endpoint.address))
            })?
            .map_err(|err| {
                ServiceError::unavailable(role, format!("connect to {} failed: {err}", self.endpoint.address))
            })?;
        let _ = stream.set_nodelay(true);
        let (read, writer) = stream.into_split();
        debug!(endpoint = %self.endpoint, "channel opened");
        Ok(Channel {
            reader: BufReader::new(read),
            writer,
        })
    }

    fn record(&self, outcome: &'static str) {
        counter!(
            "reeltrack_service_calls_total",
            "role" => self.endpoint.role.as_str(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn call(&self, request: Value) -> ServiceResult<Value> {
        let role = self.endpoint.role;
        let mut line = serde_json::to_string(&request)
            .map_err(|err| ServiceError::protocol(role, format!("unencodable request: {err}")))?;
        line.push('\n');

        let mut guard = self.channel.lock().await;
        if guard.is_none() {
            match self.open().await {
                Ok(channel) => *guard = Some(channel),
                Err(err) => {
                    self.record("unavailable");
                    return Err(err);
                }
            }
        }
        let channel = guard
            .as_mut()
            .ok_or_else(|| ServiceError::unavailable(role, "channel not open"))?;

        let reply = match tokio::time::timeout(self.timeout, channel.round_trip(&line)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                *guard = None;
                self.record("unavailable");
                warn!(endpoint = %self.endpoint, error = %err, "round trip failed");
                return Err(ServiceError::unavailable(role, err.to_string()));
            }
            Err(_) => {
                *guard = None;
                self.record("timeout");
                warn!(endpoint = %self.endpoint, timeout_ms = self.timeout.as_millis() as u64, "no reply within time budget");
                return Err(ServiceError::unavailable(
                    role,
                    format!("no reply within {}ms", self.timeout.as_millis()),
                ));
            }
        };
        drop(guard);

        match serde_json::from_str(reply.trim_end()) {
            Ok(value) => {
                self.record("ok");
                Ok(value)
            }
            Err(err) => {
                self.record("malformed");
                Err(ServiceError::protocol(role, format!("reply is not JSON: {err}")))
            }
        }
    }
}
