//! Integration tests for the TCP server.
//!
//! These tests verify the BrokerServer works correctly as a complete
//! system: connection handling, request dispatch, error replies, version
//! checking, and binder registration.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy
//! applies to production code only.

use std::net::SocketAddr;
use std::time::Duration;

use parley_protocol::{codes, BinderRequest, BrokerOp, BrokerReply, BrokerRequest, ProtocolVersion};
use parleyd::announce::{announce, MESSENGER_SERVICE};
use parleyd::broker::{spawn_broker, BrokerConfig};
use parleyd::server::BrokerServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Grace period for server shutdown
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Sweep interval long enough that the background sweeper never fires.
const QUIET_SWEEP: Duration = Duration::from_secs(3600);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle.
struct TestServer {
    addr: SocketAddr,
    cancel_token: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on an ephemeral port.
    async fn spawn() -> Self {
        let broker = spawn_broker(BrokerConfig {
            sweep_interval: QUIET_SWEEP,
            idle_threshold: Duration::from_secs(300),
        });
        let cancel_token = CancellationToken::new();

        let server = BrokerServer::bind("127.0.0.1:0", broker, cancel_token.clone())
            .await
            .expect("bind test server");
        let addr = server.local_addr().expect("local addr");

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer { addr, cancel_token }
    }

    /// Creates a client connection to the server.
    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr)
            .await
            .expect("connect to server");
        TestClient::new(stream)
    }

    /// Shuts down the server gracefully.
    async fn shutdown(self) {
        self.cancel_token.cancel();
        sleep(SHUTDOWN_GRACE_PERIOD).await;
    }
}

/// Test client connection with protocol helpers.
struct TestClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Sends a request to the server.
    async fn send(&mut self, request: BrokerRequest) {
        let json = serde_json::to_string(&request).unwrap();
        self.send_raw(&json).await;
    }

    /// Sends a raw line to the server.
    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Receives a reply from the server.
    async fn recv(&mut self) -> BrokerReply {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    /// Sends a request and asserts a flag reply with the given value.
    async fn expect_flag(&mut self, request: BrokerRequest, expected: bool) {
        self.send(request).await;
        match self.recv().await {
            BrokerReply::Flag { value } => assert_eq!(value, expected),
            other => panic!("Expected Flag, got {other:?}"),
        }
    }
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_server_accepts_connection() {
    let server = TestServer::spawn().await;

    let _client = server.connect().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_ping_pong() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.send(BrokerRequest::ping(42)).await;

    match client.recv().await {
        BrokerReply::Pong { seq } => assert_eq!(seq, 42),
        other => panic!("Expected Pong, got {other:?}"),
    }

    server.shutdown().await;
}

// ============================================================================
// Operation Flow Tests
// ============================================================================

#[tokio::test]
async fn test_full_chat_flow_over_wire() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.expect_flag(BrokerRequest::register_user("alice"), true).await;
    bob.expect_flag(BrokerRequest::register_user("bob"), true).await;

    // Registration lands both users in the default room
    alice.send(BrokerRequest::list_users("default")).await;
    match alice.recv().await {
        BrokerReply::Users { users } => assert_eq!(users, vec!["everyone", "alice", "bob"]),
        other => panic!("Expected Users, got {other:?}"),
    }

    alice.expect_flag(BrokerRequest::create_room("lobby"), true).await;
    alice.expect_flag(BrokerRequest::join_room("alice", "lobby"), true).await;
    bob.expect_flag(BrokerRequest::join_room("bob", "lobby"), true).await;

    alice
        .expect_flag(
            BrokerRequest::send_message("alice", "lobby", "hello bob", None),
            true,
        )
        .await;

    bob.send(BrokerRequest::receive_messages("bob", "lobby")).await;
    match bob.recv().await {
        BrokerReply::Messages { messages } => {
            assert_eq!(messages.len(), 3);
            assert!(messages[2].ends_with("]alice: hello bob"));
        }
        other => panic!("Expected Messages, got {other:?}"),
    }

    bob.send(BrokerRequest::list_users("lobby")).await;
    match bob.recv().await {
        BrokerReply::Users { users } => assert_eq!(users, vec!["alice", "bob"]),
        other => panic!("Expected Users, got {other:?}"),
    }

    alice.send(BrokerRequest::list_rooms()).await;
    match alice.recv().await {
        BrokerReply::Rooms { rooms } => assert_eq!(rooms, vec!["default", "lobby"]),
        other => panic!("Expected Rooms, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_unicast_isolation_over_wire() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.expect_flag(BrokerRequest::create_room("lobby"), true).await;
    for user in ["alice", "bob", "carol"] {
        client.expect_flag(BrokerRequest::join_room(user, "lobby"), true).await;
    }

    client
        .expect_flag(
            BrokerRequest::send_message("alice", "lobby", "psst", Some("bob")),
            true,
        )
        .await;

    client.send(BrokerRequest::receive_messages("bob", "lobby")).await;
    match client.recv().await {
        BrokerReply::Messages { messages } => {
            assert!(messages.iter().any(|m| m.ends_with("]alice for you: psst")));
        }
        other => panic!("Expected Messages, got {other:?}"),
    }

    client.send(BrokerRequest::receive_messages("carol", "lobby")).await;
    match client.recv().await {
        BrokerReply::Messages { messages } => {
            assert!(!messages.iter().any(|m| m.contains("psst")));
        }
        other => panic!("Expected Messages, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_frees_name_over_wire() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.expect_flag(BrokerRequest::register_user("alice"), true).await;
    client.expect_flag(BrokerRequest::register_user("alice"), false).await;

    client.expect_flag(BrokerRequest::create_room("lobby"), true).await;
    client.expect_flag(BrokerRequest::join_room("alice", "lobby"), true).await;
    client.expect_flag(BrokerRequest::disconnect("alice", "lobby"), true).await;

    // Name is free again
    client.expect_flag(BrokerRequest::register_user("alice"), true).await;

    server.shutdown().await;
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_room_fault() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.send(BrokerRequest::join_room("alice", "nowhere")).await;

    match client.recv().await {
        BrokerReply::Error { message, code } => {
            assert!(message.contains("nowhere"));
            assert_eq!(code.as_deref(), Some(codes::NOT_FOUND));
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_not_member_fault() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.expect_flag(BrokerRequest::create_room("lobby"), true).await;
    client.send(BrokerRequest::leave_room("alice", "lobby")).await;

    match client.recv().await {
        BrokerReply::Error { code, .. } => {
            assert_eq!(code.as_deref(), Some(codes::NOT_MEMBER));
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_version_mismatch_then_valid_request() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    // Incompatible major version gets a bad_request reply
    let request = BrokerRequest {
        protocol_version: ProtocolVersion::new(99, 0),
        op: BrokerOp::ListRooms,
    };
    client.send(request).await;

    match client.recv().await {
        BrokerReply::Error { message, code } => {
            assert!(message.contains("not compatible"));
            assert_eq!(code.as_deref(), Some(codes::BAD_REQUEST));
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    // The connection stays open and serves a valid request
    client.send(BrokerRequest::list_rooms()).await;
    match client.recv().await {
        BrokerReply::Rooms { rooms } => assert_eq!(rooms, vec!["default"]),
        other => panic!("Expected Rooms, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_request_then_valid_request() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.send_raw("this is not json").await;

    match client.recv().await {
        BrokerReply::Error { code, .. } => {
            assert_eq!(code.as_deref(), Some(codes::BAD_REQUEST));
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    client.send(BrokerRequest::ping(7)).await;
    match client.recv().await {
        BrokerReply::Pong { seq } => assert_eq!(seq, 7),
        other => panic!("Expected Pong, got {other:?}"),
    }

    server.shutdown().await;
}

// ============================================================================
// Concurrent Clients Tests
// ============================================================================

#[tokio::test]
async fn test_multiple_clients_concurrent() {
    let server = TestServer::spawn().await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let addr = server.addr;
        handles.push(tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut client = TestClient::new(stream);

            client
                .expect_flag(BrokerRequest::register_user(format!("user-{i}")), true)
                .await;

            client.send(BrokerRequest::ping(i as u64)).await;
            match client.recv().await {
                BrokerReply::Pong { seq } => assert_eq!(seq, i as u64),
                other => panic!("Expected Pong, got {other:?}"),
            }
        }));
    }

    for handle in handles {
        handle.await.expect("concurrent client task should succeed");
    }

    server.shutdown().await;
}

// ============================================================================
// Binder Registration Tests
// ============================================================================

#[tokio::test]
async fn test_announce_registers_with_binder() {
    use parley_binder::{BinderServer, Directory};

    let directory = Directory::new();
    let cancel_token = CancellationToken::new();
    let binder = BinderServer::bind("127.0.0.1:0", directory.clone(), cancel_token.clone())
        .await
        .expect("bind test binder");
    let binder_addr = binder.local_addr().expect("binder addr");

    tokio::spawn(async move {
        let _ = binder.run().await;
    });

    announce(
        &binder_addr.to_string(),
        MESSENGER_SERVICE,
        "127.0.0.1",
        65432,
    )
    .await
    .expect("announce should succeed");

    let resolved = directory.lookup(MESSENGER_SERVICE).await.unwrap();
    assert_eq!(resolved, "127.0.0.1:65432");

    cancel_token.cancel();
}

#[tokio::test]
async fn test_announce_failure_is_reported() {
    // Nothing listens on this address
    let result = announce("127.0.0.1:1", MESSENGER_SERVICE, "127.0.0.1", 65432).await;
    assert!(result.is_err());
}

// ============================================================================
// Name Resolution Flow Tests
// ============================================================================

#[tokio::test]
async fn test_client_resolves_messenger_via_binder() {
    use parley_binder::{BinderServer, Directory};

    // Binder up first
    let directory = Directory::new();
    let cancel_token = CancellationToken::new();
    let binder = BinderServer::bind("127.0.0.1:0", directory, cancel_token.clone())
        .await
        .expect("bind test binder");
    let binder_addr = binder.local_addr().expect("binder addr");
    tokio::spawn(async move {
        let _ = binder.run().await;
    });

    // Messenger up second, announcing its real endpoint
    let server = TestServer::spawn().await;
    announce(
        &binder_addr.to_string(),
        MESSENGER_SERVICE,
        &server.addr.ip().to_string(),
        server.addr.port(),
    )
    .await
    .expect("announce should succeed");

    // A client resolves the name through the binder, then chats
    let stream = TcpStream::connect(binder_addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let lookup = serde_json::to_string(&BinderRequest::lookup(MESSENGER_SERVICE)).unwrap();
    writer.write_all(lookup.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let reply: parley_protocol::BinderReply = serde_json::from_str(&line).unwrap();

    let address = match reply {
        parley_protocol::BinderReply::Endpoint { address } => address,
        other => panic!("Expected Endpoint, got {other:?}"),
    };

    let stream = TcpStream::connect(&address).await.unwrap();
    let mut client = TestClient::new(stream);
    client.expect_flag(BrokerRequest::register_user("alice"), true).await;

    cancel_token.cancel();
    server.shutdown().await;
}
