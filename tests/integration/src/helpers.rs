//! Test helpers for integration tests
//!
//! Provides a gateway server bound to an ephemeral port and a WebSocket client that
//! speaks the frame protocol.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures_util::{SinkExt, StreamExt};
use lobby_common::AppConfig;
use lobby_core::{User, UserId};
use lobby_gateway::{create_app, create_gateway_state, run_server};
use lobby_service::ServiceContext;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a client waits for the next frame before failing the test
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    ctx: ServiceContext,
    shutdown: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the default heartbeat interval
    pub async fn start() -> Result<Self> {
        Self::start_with_heartbeat(Duration::from_secs(45)).await
    }

    /// Start a server that announces `interval` in HELLO
    pub async fn start_with_heartbeat(interval: Duration) -> Result<Self> {
        let state = create_gateway_state(test_config()?)
            .await?
            .with_heartbeat_interval(interval);
        let ctx = state.service_context().clone();
        let app = create_app(state)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = run_server(app, listener, shutdown).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            ctx,
            shutdown: Some(shutdown_tx),
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Open a socket and consume HELLO
    pub async fn connect(&self) -> Result<TestClient> {
        let mut client = TestClient::connect(&self.gateway_url()).await?;
        let hello = client.recv().await?;
        if hello["op"] != 10 {
            bail!("expected HELLO, got {hello}");
        }
        client.hello = hello;
        Ok(client)
    }

    /// Read an account straight from the store
    pub async fn user(&self, id: &str) -> Result<User> {
        let id = UserId::parse(id)?;
        self.ctx
            .store()
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("user {id} not found"))
    }

    /// Poll the store until `check` holds for the account, or give up
    pub async fn wait_for_user<F>(&self, id: &str, check: F) -> Result<User>
    where
        F: Fn(&User) -> bool,
    {
        for _ in 0..50 {
            let user = self.user(id).await?;
            if check(&user) {
                return Ok(user);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        bail!("user {id} never reached the expected state")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Build a configuration without touching the process environment
pub fn test_config() -> Result<AppConfig> {
    AppConfig::from_lookup(|key| match key {
        "GATEWAY_HOST" => Some("127.0.0.1".to_string()),
        "GATEWAY_PORT" => Some("0".to_string()),
        "SESSION_SECRET" => Some("integration-test-secret".to_string()),
        "APP_ENV" => Some("development".to_string()),
        _ => None,
    })
    .map_err(|e| anyhow!("Config error: {e}"))
}

/// One WebSocket connection to the gateway
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// The HELLO frame received on connect
    pub hello: Value,
}

impl TestClient {
    async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self {
            stream,
            hello: Value::Null,
        })
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send a JSON frame
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.send_text(frame.to_string()).await
    }

    /// Next text frame as JSON, skipping control frames
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            match self.next_message().await? {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => bail!("connection closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Wait for the server to close the socket and return its close code
    pub async fn recv_close(&mut self) -> Result<Option<u16>> {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.stream.next()).await {
                Err(_) => bail!("timed out waiting for close"),
                Ok(None) => return Ok(None),
                Ok(Some(Err(e))) => bail!("socket error before close: {e}"),
                Ok(Some(Ok(Message::Close(frame)))) => {
                    return Ok(frame.map(|f| u16::from(f.code)));
                }
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    async fn next_message(&mut self) -> Result<Message> {
        match tokio::time::timeout(RECV_TIMEOUT, self.stream.next()).await {
            Err(_) => bail!("timed out waiting for a frame"),
            Ok(None) => bail!("stream ended"),
            Ok(Some(message)) => Ok(message?),
        }
    }

    /// Call a method and return the RESULT frame's `d`
    pub async fn call(&mut self, call_id: &str, method: &str, params: Value) -> Result<Value> {
        self.send(json!({"op": 2, "id": call_id, "t": method, "d": params}))
            .await?;
        let reply = self.recv_until(|f| f["op"] == 3 && f["id"] == call_id).await?;
        Ok(reply["d"].clone())
    }

    /// Open a subscription; returns the frames up to and including READY or NOSUB
    pub async fn subscribe(&mut self, sub_id: &str, publication: &str, params: Value) -> Result<Vec<Value>> {
        self.send(json!({"op": 4, "id": sub_id, "t": publication, "d": params}))
            .await?;

        let mut frames = Vec::new();
        loop {
            let frame = self.recv().await?;
            if frame["id"] != sub_id {
                continue;
            }
            let op = frame["op"].as_u64();
            frames.push(frame);
            if matches!(op, Some(6 | 7)) {
                return Ok(frames);
            }
        }
    }

    /// Skip frames until one matches
    pub async fn recv_until<F>(&mut self, pred: F) -> Result<Value>
    where
        F: Fn(&Value) -> bool,
    {
        loop {
            let frame = self.recv().await?;
            if pred(&frame) {
                return Ok(frame);
            }
        }
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
