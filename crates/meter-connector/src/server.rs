//! JSON-lines management console.
//!
//! The console stands in for the device-management service on a host build:
//! every request and response is one JSON object on its own line.
//!
//! ```text
//! client                                  ConsoleServer ──▶ Endpoint
//!   {"id":1,"op":"get","path":"312/0/1"}  ──▶
//!   ◀── {"id":1,"code":"2.05","path":"312/0/1","value":"FREE PARKING"}
//!   {"op":"observe","path":"100/0/1"}     ──▶
//!   ◀── {"code":"2.05","path":"100/0/1","value":"29"}
//!   ◀── {"code":"notify","path":"100/0/1","value":"28"}
//! ```
//!
//! Operations: `get`, `put` (`value`), `execute` (`args`), `list` and
//! `observe` (optional `path`; without it every notification is streamed).
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use meter_connector::{ConsoleServer, ConsoleServerConfig, Endpoint, OptionsBuilder};
//! use tokio::sync::watch;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = OptionsBuilder::new()
//!     .endpoint_nodename("meter-01")
//!     .domain("parking")
//!     .build()?;
//! let endpoint = Arc::new(Endpoint::new(options)?);
//!
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//! let server = ConsoleServer::bind(ConsoleServerConfig::default(), endpoint).await?;
//! server.run(shutdown_rx).await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use meter_core::ResourcePath;
use meter_core::constants::{DEFAULT_CONSOLE_BIND, DEFAULT_MAX_CONNECTIONS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, trace, warn};

use crate::endpoint::{Endpoint, Notification};
use crate::error::{ConnectorError, ResponseCode, Result};

/// Longest request line accepted.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Configuration for the console server
#[derive(Debug, Clone)]
pub struct ConsoleServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Maximum number of simultaneous connections
    pub max_connections: usize,
}

impl Default for ConsoleServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_CONSOLE_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 5683))),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// One console request line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub op: RequestOp,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RequestOp {
    Get {
        path: ResourcePath,
    },
    /// `value` may be a JSON string or any JSON value, which is passed on in
    /// its serialized form.
    Put {
        path: ResourcePath,
        value: Value,
    },
    Execute {
        path: ResourcePath,
        #[serde(default)]
        args: String,
    },
    List,
    Observe {
        #[serde(default)]
        path: Option<ResourcePath>,
    },
}

/// One console response or notification line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ResourcePath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn new(id: Option<u64>, code: ResponseCode) -> Self {
        Self {
            id,
            code,
            path: None,
            value: None,
            error: None,
        }
    }

    fn with_path(mut self, path: ResourcePath) -> Self {
        self.path = Some(path);
        self
    }

    fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    fn failure(id: Option<u64>, error: &ConnectorError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(id, error.code())
        }
    }

    fn notification(notification: Notification) -> Self {
        Self::new(None, ResponseCode::Notify)
            .with_path(notification.path)
            .with_value(Value::String(notification.value))
    }
}

/// Which notifications an observing connection receives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ObserveFilter {
    All,
    Path(ResourcePath),
}

impl ObserveFilter {
    fn accepts(&self, notification: &Notification) -> bool {
        match self {
            Self::All => true,
            Self::Path(path) => &notification.path == path,
        }
    }
}

/// Run one request against the endpoint.
///
/// Returns the response and, for `observe`, the filter to stream with.
fn dispatch(endpoint: &Endpoint, request: Request) -> (Response, Option<ObserveFilter>) {
    let id = request.id;
    let outcome = match request.op {
        RequestOp::Get { path } => endpoint.get(&path).map(|value| {
            Response::new(id, ResponseCode::Content)
                .with_path(path)
                .with_value(Value::String(value))
        }),
        RequestOp::Put { path, value } => {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            endpoint
                .put(&path, &text)
                .map(|()| Response::new(id, ResponseCode::Changed).with_path(path))
        }
        RequestOp::Execute { path, args } => endpoint
            .execute(&path, &args)
            .map(|()| Response::new(id, ResponseCode::Changed).with_path(path)),
        RequestOp::List => serde_json::to_value(endpoint.resources())
            .map(|listing| Response::new(id, ResponseCode::Content).with_value(listing))
            .map_err(|e| ConnectorError::Codec(e.to_string())),
        RequestOp::Observe { path: None } => {
            return (
                Response::new(id, ResponseCode::Content),
                Some(ObserveFilter::All),
            );
        }
        RequestOp::Observe { path: Some(path) } => {
            return match endpoint.get(&path) {
                Ok(value) => (
                    Response::new(id, ResponseCode::Content)
                        .with_path(path.clone())
                        .with_value(Value::String(value)),
                    Some(ObserveFilter::Path(path)),
                ),
                Err(e) => (Response::failure(id, &e), None),
            };
        }
    };

    let response = outcome.unwrap_or_else(|e| {
        debug!(error = %e, "Request failed");
        Response::failure(id, &e)
    });
    (response, None)
}

/// Parse and run one request line.
fn handle_line(endpoint: &Endpoint, line: &str) -> (Response, Option<ObserveFilter>) {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(endpoint, request),
        Err(e) => {
            let error = ConnectorError::bad_request(e.to_string());
            (Response::failure(None, &error), None)
        }
    }
}

/// Console server bound to a TCP listener.
///
/// Each connection runs in its own task; all of them stop when the shutdown
/// channel flips to `true`.
pub struct ConsoleServer {
    listener: TcpListener,
    endpoint: Arc<Endpoint>,
    config: ConsoleServerConfig,
}

impl ConsoleServer {
    /// Bind the server to the configured address.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the address cannot be bound.
    pub async fn bind(config: ConsoleServerConfig, endpoint: Arc<Endpoint>) -> Result<Self> {
        info!("Binding console to {}", config.bind_addr);

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|_| ConnectorError::BindFailed(config.bind_addr))?;

        info!(
            "Console listening on {} (max {} connections)",
            listener.local_addr().unwrap_or(config.bind_addr),
            config.max_connections
        );

        Ok(Self {
            listener,
            endpoint,
            config,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` becomes `true` (or its sender is
    /// dropped), then wait for every connection task to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let active = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    debug!("Accepted new connection from {}", addr);

                    if active.load(Ordering::SeqCst) >= self.config.max_connections {
                        error!(
                            addr = %addr,
                            max_connections = self.config.max_connections,
                            "Connection rejected: maximum connections reached"
                        );
                        tasks.spawn(reject(stream));
                        continue;
                    }

                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let total = active.fetch_add(1, Ordering::SeqCst) + 1;
                    info!("Console client {} connected (total: {})", addr, total);

                    let guard = ActiveGuard(Arc::clone(&active));
                    let endpoint = Arc::clone(&self.endpoint);
                    let shutdown = shutdown.clone();
                    tasks.spawn(async move {
                        let _guard = guard;
                        serve_connection(stream, addr, endpoint, shutdown).await;
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Console connection task failed: {}", e);
                    }
                }
            }
        }

        info!("Console shutting down ({} tasks pending)", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Console connection task failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Decrements the active connection count when a connection task ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn reject(stream: TcpStream) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    let error = Response {
        error: Some("maximum connections reached".into()),
        ..Response::new(None, ResponseCode::ServiceUnavailable)
    };
    if let Ok(line) = serde_json::to_string(&error) {
        let _ = framed.send(line).await;
    }
}

enum Event {
    Shutdown,
    Line(Option<std::result::Result<String, LinesCodecError>>),
    Notification(std::result::Result<Notification, broadcast::error::RecvError>),
}

/// Next notification of an observing connection; never resolves when the
/// connection is not observing.
async fn next_notification(
    observer: &mut Option<(ObserveFilter, broadcast::Receiver<Notification>)>,
) -> std::result::Result<Notification, broadcast::error::RecvError> {
    match observer {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send(
    framed: &mut Framed<TcpStream, LinesCodec>,
    response: &Response,
) -> Result<()> {
    let line = serde_json::to_string(response).map_err(|e| ConnectorError::Codec(e.to_string()))?;
    trace!(%line, "Sending");
    framed
        .send(line)
        .await
        .map_err(|e| ConnectorError::Codec(e.to_string()))
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    endpoint: Arc<Endpoint>,
    mut shutdown: watch::Receiver<bool>,
) {
    let connected_at = Utc::now();
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut observer: Option<(ObserveFilter, broadcast::Receiver<Notification>)> = None;

    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => Event::Shutdown,
            line = framed.next() => Event::Line(line),
            notification = next_notification(&mut observer) => Event::Notification(notification),
        };

        let outcome = match event {
            Event::Shutdown => break,
            Event::Line(None) => {
                info!("Console client {} disconnected gracefully", addr);
                break;
            }
            Event::Line(Some(Ok(line))) => {
                if line.trim().is_empty() {
                    continue;
                }
                trace!(addr = %addr, %line, "Received");
                let (response, filter) = handle_line(&endpoint, &line);
                if let Some(filter) = filter {
                    debug!(addr = %addr, ?filter, "Client observing");
                    observer = Some((filter, endpoint.subscribe()));
                }
                send(&mut framed, &response).await
            }
            Event::Line(Some(Err(LinesCodecError::MaxLineLengthExceeded))) => {
                warn!(addr = %addr, "Request line too long");
                let error = ConnectorError::bad_request("request line too long");
                send(&mut framed, &Response::failure(None, &error)).await
            }
            Event::Line(Some(Err(e))) => {
                error!(addr = %addr, error = %e, "I/O error from console client (connection closed)");
                break;
            }
            Event::Notification(Ok(notification)) => {
                let accepted = observer
                    .as_ref()
                    .is_some_and(|(filter, _)| filter.accepts(&notification));
                if !accepted {
                    continue;
                }
                send(&mut framed, &Response::notification(notification)).await
            }
            Event::Notification(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(addr = %addr, skipped, "Observer lagging, notifications dropped");
                continue;
            }
            Event::Notification(Err(broadcast::error::RecvError::Closed)) => {
                observer = None;
                continue;
            }
        };

        if let Err(e) = outcome {
            warn!(addr = %addr, error = %e, "Failed to write to console client");
            break;
        }
    }

    debug!(
        addr = %addr,
        session_secs = (Utc::now() - connected_at).num_seconds(),
        "Console session ended"
    );
}
