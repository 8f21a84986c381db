//! Integration tests for the JSON-lines console
//!
//! These tests run a real ConsoleServer on an ephemeral port and talk to it
//! over TCP, covering dispatch, device management, observation, the
//! connection limit and graceful shutdown.

use futures::{SinkExt, StreamExt};
use meter_connector::{
    ConsoleServer, ConsoleServerConfig, ConnectorError, DeviceManagementResponder, DeviceManager,
    DynamicResource, Endpoint, Operations, OptionsBuilder, PassphraseAuthenticator, Response,
    ResponseCode, Result, StaticResource,
};
use meter_core::{DeviceIdentity, Passphrase, ResourcePath};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

const PASS: &str = "arm1234";

/// Writable text resource
struct Text {
    path: ResourcePath,
    value: Mutex<String>,
}

impl DynamicResource for Text {
    fn path(&self) -> &ResourcePath {
        &self.path
    }

    fn resource_type(&self) -> &str {
        "Text"
    }

    fn operations(&self) -> Operations {
        Operations::GET_PUT
    }

    fn get(&self) -> Result<String> {
        Ok(self.value.lock().unwrap().clone())
    }

    fn put(&self, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConnectorError::bad_request("empty"));
        }
        *self.value.lock().unwrap() = value.to_string();
        Ok(())
    }
}

struct Harness {
    addr: SocketAddr,
    endpoint: Arc<Endpoint>,
    reboots: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

async fn start(max_connections: usize) -> Harness {
    let text = Arc::new(Text {
        path: "312/0/1".parse().unwrap(),
        value: Mutex::new("FREE PARKING".into()),
    });
    let options = OptionsBuilder::new()
        .endpoint_nodename("meter-01")
        .domain("parking")
        .add_resource(Arc::new(StaticResource::new(
            "300/0/1".parse().unwrap(),
            "Label",
            "bay 7",
        )))
        .add_resource_with_observation(text, true)
        .build()
        .unwrap();

    let reboots = Arc::new(AtomicUsize::new(0));
    let mut responder =
        DeviceManagementResponder::new(PassphraseAuthenticator::new(Passphrase::new(PASS)));
    let counter = Arc::clone(&reboots);
    responder.set_reboot_responder_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let manager = Arc::new(DeviceManager::new(DeviceIdentity::default(), responder));

    let endpoint = Arc::new(
        Endpoint::new(options)
            .unwrap()
            .with_device_manager(manager)
            .unwrap(),
    );
    endpoint.register();

    let config = ConsoleServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        max_connections,
    };
    let server = ConsoleServer::bind(config, Arc::clone(&endpoint))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(server.run(rx));

    Harness {
        addr,
        endpoint,
        reboots,
        shutdown,
        task,
    }
}

async fn connect(addr: SocketAddr) -> Framed<TcpStream, LinesCodec> {
    let stream = TcpStream::connect(addr).await.unwrap();
    Framed::new(stream, LinesCodec::new())
}

async fn read(client: &mut Framed<TcpStream, LinesCodec>) -> Response {
    let line = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a line")
        .expect("connection closed")
        .unwrap();
    serde_json::from_str(&line).unwrap()
}

async fn request(client: &mut Framed<TcpStream, LinesCodec>, body: Value) -> Response {
    client.send(body.to_string()).await.unwrap();
    read(client).await
}

#[tokio::test]
async fn test_get_put_roundtrip() {
    let harness = start(4).await;
    let mut client = connect(harness.addr).await;

    let response = request(&mut client, json!({"id": 1, "op": "get", "path": "312/0/1"})).await;
    assert_eq!(response.id, Some(1));
    assert_eq!(response.code, ResponseCode::Content);
    assert_eq!(response.value, Some(json!("FREE PARKING")));

    let response = request(
        &mut client,
        json!({"id": 2, "op": "put", "path": "312/0/1", "value": "PAID-FOR PARKING"}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::Changed);

    let response = request(&mut client, json!({"op": "get", "path": "312/0/1"})).await;
    assert_eq!(response.value, Some(json!("PAID-FOR PARKING")));
}

#[tokio::test]
async fn test_error_codes() {
    let harness = start(4).await;
    let mut client = connect(harness.addr).await;

    let response = request(&mut client, json!({"op": "get", "path": "999/0/1"})).await;
    assert_eq!(response.code, ResponseCode::NotFound);
    assert!(response.error.is_some());

    let response = request(
        &mut client,
        json!({"op": "put", "path": "300/0/1", "value": "bay 8"}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::MethodNotAllowed);

    let response = request(
        &mut client,
        json!({"op": "put", "path": "312/0/1", "value": ""}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::BadRequest);

    client.send("{ not json".to_string()).await.unwrap();
    assert_eq!(read(&mut client).await.code, ResponseCode::BadRequest);

    // Connection survives bad requests
    let response = request(&mut client, json!({"op": "get", "path": "300/0/1"})).await;
    assert_eq!(response.value, Some(json!("bay 7")));
}

#[tokio::test]
async fn test_list_includes_device_objects() {
    let harness = start(4).await;
    let mut client = connect(harness.addr).await;

    let response = request(&mut client, json!({"op": "list"})).await;
    let listing = response.value.unwrap();
    let paths: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["path"].as_str().unwrap())
        .collect();

    assert!(paths.contains(&"312/0/1"));
    assert!(paths.contains(&"3/0/4"));
    assert!(paths.contains(&"5/0/2"));
    assert_eq!(paths.len(), 16);
}

#[tokio::test]
async fn test_reboot_requires_passphrase() {
    let harness = start(4).await;
    let mut client = connect(harness.addr).await;

    let response = request(
        &mut client,
        json!({"op": "execute", "path": "3/0/4", "args": "guess"}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::Unauthorized);
    assert_eq!(harness.reboots.load(Ordering::SeqCst), 0);

    let response = request(
        &mut client,
        json!({"op": "execute", "path": "3/0/4", "args": PASS}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::Changed);
    assert_eq!(harness.reboots.load(Ordering::SeqCst), 1);

    // No reset handler installed
    let response = request(
        &mut client,
        json!({"op": "execute", "path": "3/0/5", "args": PASS}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::NotImplemented);
}

#[tokio::test]
async fn test_observe_streams_notifications() {
    let harness = start(4).await;
    let mut observer = connect(harness.addr).await;
    let mut writer = connect(harness.addr).await;

    let response = request(&mut observer, json!({"op": "observe", "path": "312/0/1"})).await;
    assert_eq!(response.code, ResponseCode::Content);
    assert_eq!(response.value, Some(json!("FREE PARKING")));

    let response = request(
        &mut writer,
        json!({"op": "put", "path": "312/0/1", "value": "BEACON-OFF"}),
    )
    .await;
    assert_eq!(response.code, ResponseCode::Changed);

    let notification = read(&mut observer).await;
    assert_eq!(notification.code, ResponseCode::Notify);
    assert_eq!(notification.path, Some("312/0/1".parse().unwrap()));
    assert_eq!(notification.value, Some(json!("BEACON-OFF")));

    // Changes pushed by the application are seen too
    harness.endpoint.put(&"312/0/1".parse().unwrap(), "FREE PARKING").unwrap();
    assert_eq!(read(&mut observer).await.value, Some(json!("FREE PARKING")));
}

#[tokio::test]
async fn test_connection_limit() {
    let harness = start(1).await;

    let mut first = connect(harness.addr).await;
    let response = request(&mut first, json!({"op": "get", "path": "300/0/1"})).await;
    assert_eq!(response.code, ResponseCode::Content);

    let mut second = connect(harness.addr).await;
    let rejection = read(&mut second).await;
    assert_eq!(rejection.code, ResponseCode::ServiceUnavailable);

    // The slot frees up once the first client leaves
    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut third = connect(harness.addr).await;
    let response = request(&mut third, json!({"op": "get", "path": "300/0/1"})).await;
    assert_eq!(response.code, ResponseCode::Content);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let harness = start(4).await;
    let mut client = connect(harness.addr).await;
    request(&mut client, json!({"op": "list"})).await;

    harness.shutdown.send(true).unwrap();
    timeout(Duration::from_secs(2), harness.task)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    // Open connections are closed by the server
    let next = timeout(Duration::from_secs(2), client.next()).await.unwrap();
    assert!(next.is_none() || next.unwrap().is_err());
}
