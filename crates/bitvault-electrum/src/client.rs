//! The Electrum client: a single I/O task owns the TLS socket; requests
//! are dispatched by correlation id; subscription notifications are
//! routed by scripthash (spec §4.6, §5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::{rustls, TlsConnector};

use crate::error::{ConnectionFault, ElectrumError};
use crate::protocol::{IncomingLine, JsonRpcRequest};
use crate::state::ConnectionState;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const HISTORY_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(45);
const MIN_PROTOCOL_VERSION: &str = "1.4";
const PING_INTERVAL: Duration = Duration::from_secs(60);
const MAX_CONSECUTIVE_PING_MISSES: u32 = 3;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, ElectrumError>>>>>;
type SubscriptionMap = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>>;

struct OutboundLine(String);

/// Handle to a connected Electrum server. Cloning shares the same
/// underlying I/O task and state.
#[derive(Clone)]
pub struct ElectrumClient {
    host: String,
    port: u16,
    next_id: Arc<AtomicU64>,
    pending: PendingMap,
    subscriptions: SubscriptionMap,
    outbound: mpsc::UnboundedSender<OutboundLine>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ElectrumClient {
    /// Connect and perform the `server.version` handshake. Transitions
    /// `disconnected -> connecting -> handshaking -> ready`.
    pub async fn connect(host: &str, port: u16, client_name: &str) -> Result<Self, ElectrumError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let _ = state_tx.send(ConnectionState::Connecting);

        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| ElectrumError::ServerUnreachable(e.to_string()))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ElectrumError::HandshakeFailed(e.to_string()))?;

        let _ = state_tx.send(ConnectionState::Handshaking);
        let tls_stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ElectrumError::HandshakeFailed(e.to_string()))?;

        let (read_half, mut write_half) = tokio::io::split(tls_stream);
        let mut reader = BufReader::new(read_half);

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscriptions: SubscriptionMap = Arc::new(Mutex::new(HashMap::new()));
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundLine>();

        // Writer task: serializes all outgoing lines through one socket half.
        tokio::spawn(async move {
            while let Some(OutboundLine(line)) = outbound_rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        // Reader task: dispatches responses to pending requests, notifications
        // to subscription channels.
        let reader_pending = pending.clone();
        let reader_subs = subscriptions.clone();
        let reader_state_tx = state_tx.clone();
        let reader_host = host.to_string();
        let reader_port = port;
        tokio::spawn(async move {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => {
                        let _ = reader_state_tx.send(ConnectionState::Error(ConnectionFault {
                            host: reader_host.clone(),
                            port: reader_port,
                            code: "TRANSPORT_CLOSED".to_string(),
                            message: "connection closed or read error".to_string(),
                            timestamp_epoch_ms: 0,
                        }));
                        break;
                    }
                    Ok(_) => {
                        let Ok(parsed) = serde_json::from_str::<IncomingLine>(&line) else {
                            continue;
                        };
                        if parsed.is_notification() {
                            if let (Some(method), Some(params)) = (&parsed.method, &parsed.params) {
                                if method == "blockchain.scripthash.subscribe" {
                                    if let Some(scripthash) = params.get(0).and_then(|v| v.as_str()) {
                                        let subs = reader_subs.lock().await;
                                        if let Some(tx) = subs.get(scripthash) {
                                            let _ = tx.send(params.clone());
                                        }
                                    }
                                }
                            }
                            continue;
                        }
                        if let Some(id) = parsed.id {
                            let mut pending = reader_pending.lock().await;
                            if let Some(sender) = pending.remove(&id) {
                                let result = match (parsed.result, parsed.error) {
                                    (Some(value), None) => Ok(value),
                                    (_, Some(err)) => Err(ElectrumError::RpcError {
                                        code: err.code,
                                        message: err.message,
                                    }),
                                    (None, None) => Err(ElectrumError::ProtocolViolation(
                                        "response has neither result nor error".to_string(),
                                    )),
                                };
                                let _ = sender.send(result);
                            }
                            // Late/unsolicited response (caller cancelled): discarded.
                        }
                    }
                }
            }
        });

        let client = Self {
            host: host.to_string(),
            port,
            next_id: Arc::new(AtomicU64::new(1)),
            pending,
            subscriptions,
            outbound: outbound_tx,
            state_tx,
            state_rx,
        };

        let version = client
            .request_with_timeout(
                "server.version",
                serde_json::json!([client_name, MIN_PROTOCOL_VERSION]),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .await?;
        let negotiated = version
            .get(1)
            .and_then(|v| v.as_str())
            .unwrap_or("0.0")
            .to_string();
        if compare_protocol_versions(&negotiated, MIN_PROTOCOL_VERSION) < 0 {
            let fault = ConnectionFault {
                host: client.host.clone(),
                port: client.port,
                code: "PROTOCOL_TOO_OLD".to_string(),
                message: format!("server negotiated {negotiated}"),
                timestamp_epoch_ms: 0,
            };
            let _ = client.state_tx.send(ConnectionState::Error(fault));
            return Err(ElectrumError::UnsupportedProtocolVersion {
                negotiated,
                required: MIN_PROTOCOL_VERSION.to_string(),
            });
        }

        let _ = client.state_tx.send(ConnectionState::Ready);
        client.spawn_health_check();
        Ok(client)
    }

    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn spawn_health_check(&self) {
        let client = self.clone();
        tokio::spawn(async move {
            let mut misses = 0u32;
            let mut interval = tokio::time::interval(PING_INTERVAL);
            loop {
                interval.tick().await;
                if !client.state().is_ready() {
                    break;
                }
                match client
                    .request_with_timeout("server.ping", serde_json::json!([]), DEFAULT_REQUEST_TIMEOUT)
                    .await
                {
                    Ok(_) => misses = 0,
                    Err(_) => {
                        misses += 1;
                        if misses >= MAX_CONSECUTIVE_PING_MISSES {
                            let _ = client.state_tx.send(ConnectionState::Error(ConnectionFault {
                                host: client.host.clone(),
                                port: client.port,
                                code: "PING_TIMEOUT".to_string(),
                                message: format!("{misses} consecutive ping misses"),
                                timestamp_epoch_ms: 0,
                            }));
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Issue a raw JSON-RPC request and await its response, or
    /// [`ElectrumError::RequestTimeout`] after `timeout`. Cancellation
    /// (dropping the returned future) discards the pending slot; a late
    /// response is dropped silently by the reader task.
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, ElectrumError> {
        if matches!(self.state(), ConnectionState::Draining) && method != "server.ping" {
            return Err(ElectrumError::Draining);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = JsonRpcRequest::new(id, method, params);
        if self.outbound.send(OutboundLine(request.to_line())).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(ElectrumError::ServerUnreachable("write channel closed".to_string()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ElectrumError::Cancelled),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ElectrumError::RequestTimeout(timeout))
            }
        }
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ElectrumError> {
        self.request_with_timeout(method, params, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Subscribe to a scripthash; returns a channel that yields each
    /// status-hash update the server pushes.
    pub async fn subscribe_scripthash(
        &self,
        scripthash: &str,
    ) -> Result<mpsc::UnboundedReceiver<Value>, ElectrumError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions.lock().await.insert(scripthash.to_string(), tx);
        self.request(
            "blockchain.scripthash.subscribe",
            serde_json::json!([scripthash]),
        )
        .await?;
        Ok(rx)
    }

    pub async fn get_history(&self, scripthash: &str) -> Result<Value, ElectrumError> {
        self.request_with_timeout(
            "blockchain.scripthash.get_history",
            serde_json::json!([scripthash]),
            HISTORY_FETCH_TIMEOUT,
        )
        .await
    }

    pub async fn list_unspent(&self, scripthash: &str) -> Result<Value, ElectrumError> {
        self.request("blockchain.scripthash.listunspent", serde_json::json!([scripthash]))
            .await
    }

    pub async fn get_transaction(&self, txid: &str, verbose: bool) -> Result<Value, ElectrumError> {
        self.request_with_timeout(
            "blockchain.transaction.get",
            serde_json::json!([txid, verbose]),
            HISTORY_FETCH_TIMEOUT,
        )
        .await
    }

    pub async fn broadcast(&self, raw_hex: &str) -> Result<Value, ElectrumError> {
        self.request_with_timeout(
            "blockchain.transaction.broadcast",
            serde_json::json!([raw_hex]),
            BROADCAST_TIMEOUT,
        )
        .await
    }

    pub async fn estimate_fee(&self, n: u32) -> Result<Value, ElectrumError> {
        self.request("blockchain.estimatefee", serde_json::json!([n])).await
    }

    pub async fn fee_histogram(&self) -> Result<Value, ElectrumError> {
        self.request("mempool.get_fee_histogram", serde_json::json!([])).await
    }

    /// Enter `draining`: no new requests are accepted (except the health
    /// check's own ping), in-flight requests are left to complete.
    pub fn begin_drain(&self) {
        let _ = self.state_tx.send(ConnectionState::Draining);
    }
}

/// Compares two `major.minor` protocol version strings. Returns <0 if `a`
/// < `b`, 0 if equal, >0 if `a` > `b`.
fn compare_protocol_versions(a: &str, b: &str) -> i32 {
    let parse = |s: &str| -> (u32, u32) {
        let mut parts = s.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    };
    let (amaj, amin) = parse(a);
    let (bmaj, bmin) = parse(b);
    if amaj != bmaj {
        amaj as i32 - bmaj as i32
    } else {
        amin as i32 - bmin as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comparison_orders_correctly() {
        assert!(compare_protocol_versions("1.4", "1.4") == 0);
        assert!(compare_protocol_versions("1.3", "1.4") < 0);
        assert!(compare_protocol_versions("1.5", "1.4") > 0);
        assert!(compare_protocol_versions("2.0", "1.4") > 0);
    }
}
