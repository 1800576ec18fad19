//! End-to-end tests: a real server on an ephemeral port driven by the
//! client library, plus raw-socket checks of the literal wire bytes.

use fillbus_client::{Client, ClientConfig, ClientError};
use fillbus_protocol::Status;
use fillbus_registry::{Access, Tag, TagRegistry, TagValue};
use fillbus_server::{Server, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn line_tags() -> Vec<Tag> {
    vec![
        Tag::new(1001, "line_speed", TagValue::Integer(42), Access::ReadWrite),
        Tag::new(1002, "fill_temp", TagValue::Float(0.0), Access::ReadWrite),
        Tag::new(1003, "recipe", TagValue::String("Hi".into()), Access::ReadWrite),
        Tag::new(1004, "batch_total", TagValue::Unsigned(7), Access::ReadOnly),
        Tag::new(1005, "setpoint", TagValue::Integer(0), Access::WriteOnly),
    ]
}

async fn spawn_server(tags: Vec<Tag>) -> (Arc<Server>, u16) {
    let registry = Arc::new(TagRegistry::new());
    for tag in tags {
        registry.insert(tag);
    }
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
    let server = Arc::new(Server::bind(config, registry).unwrap());
    let port = server.local_addr().port();

    let runner = server.clone();
    tokio::spawn(async move {
        let _ = runner.run().await;
    });
    (server, port)
}

async fn connected_client(port: u16) -> Client {
    let config = ClientConfig::new("127.0.0.1")
        .with_port(port)
        .with_timeout(Duration::from_millis(1000))
        .with_heartbeat(false);
    let client = Client::new(config);
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn s1_noop() {
    let (_server, port) = spawn_server(vec![]).await;
    let client = connected_client(port).await;
    client.noop().await.unwrap();
}

#[tokio::test]
async fn s2_read_integer() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    assert_eq!(client.read_integer(1001).await.unwrap(), 42);
}

#[tokio::test]
async fn s3_write_then_read_float() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    client.write_float(1002, 3.14).await.unwrap();
    let value = client.read_float(1002).await.unwrap();
    assert!((value - 3.14).abs() < 1e-3);
}

#[tokio::test]
async fn s4_read_string() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    assert_eq!(client.read_string(1003).await.unwrap(), "Hi");
}

#[tokio::test]
async fn s5_write_empty_string_then_read() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    client.write_string(1003, "").await.unwrap();
    assert_eq!(client.read_string(1003).await.unwrap(), "");
}

#[tokio::test]
async fn s6_read_of_write_only_tag() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    assert!(matches!(
        client.read_integer(1005).await,
        Err(ClientError::Rejected(Status::UnauthorizedAccess))
    ));
}

#[tokio::test]
async fn write_to_read_only_tag_is_refused() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    assert!(matches!(
        client.write_unsigned(1004, 9).await,
        Err(ClientError::Rejected(Status::UnauthorizedAccess))
    ));
    // The stored value is untouched.
    assert_eq!(client.read_unsigned(1004).await.unwrap(), 7);
}

#[tokio::test]
async fn unknown_tag_is_implausible() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    for result in [
        client.read_integer(9999).await.err(),
        client.write_integer(9999, 1).await.err(),
        client.read_string(9999).await.err(),
        client.write_string(9999, "x").await.err(),
    ] {
        assert!(matches!(
            result,
            Some(ClientError::Rejected(Status::ImplausibleArgument))
        ));
    }
}

#[tokio::test]
async fn type_gating_over_the_wire() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    assert!(matches!(
        client.read_integer(1003).await,
        Err(ClientError::Rejected(Status::ImplausibleArgument))
    ));
    assert!(matches!(
        client.write_integer(1003, 1).await,
        Err(ClientError::Rejected(Status::ImplausibleArgument))
    ));
    assert!(matches!(
        client.read_string(1001).await,
        Err(ClientError::Rejected(Status::ImplausibleArgument))
    ));
    assert!(matches!(
        client.write_string(1001, "x").await,
        Err(ClientError::Rejected(Status::ImplausibleArgument))
    ));
}

#[tokio::test]
async fn string_spanning_multiple_frames() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    // 21 ASCII chars = 42 UTF-16 bytes = 6 body frames, last one padded.
    let recipe = "Weizen 0.5l unfiltered";
    client.write_string(1003, recipe).await.unwrap();
    assert_eq!(client.read_string(1003).await.unwrap(), recipe);

    // Non-ASCII survives the UTF-16 round trip.
    client.write_string(1003, "Märzen 🍺").await.unwrap();
    assert_eq!(client.read_string(1003).await.unwrap(), "Märzen 🍺");
}

#[tokio::test]
async fn failed_write_string_keeps_stream_aligned() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;

    // The server must consume the announced body frames even though the tag
    // does not exist, so the connection stays usable afterwards.
    assert!(matches!(
        client.write_string(9999, "orphaned body").await,
        Err(ClientError::Rejected(Status::ImplausibleArgument))
    ));
    client.noop().await.unwrap();
    assert_eq!(client.read_integer(1001).await.unwrap(), 42);
}

#[tokio::test]
async fn sequential_exchanges_on_one_connection() {
    let (_server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    for i in 0..50 {
        client.write_integer(1001, i).await.unwrap();
        assert_eq!(client.read_integer(1001).await.unwrap(), i);
    }
}

#[tokio::test]
async fn concurrent_clients_share_one_registry() {
    let (_server, port) = spawn_server(line_tags()).await;

    let mut handles = Vec::new();
    for worker in 0i32..4 {
        handles.push(tokio::spawn(async move {
            let client = connected_client(port).await;
            for i in 0..25 {
                client.write_integer(1001, worker * 100 + i).await.unwrap();
                let seen = client.read_integer(1001).await.unwrap();
                // Another client may have written in between, but the value
                // is always one that some client fully wrote.
                assert!((0..400).contains(&seen));
            }
            client.disconnect().await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn client_count_tracks_connections() {
    let (server, port) = spawn_server(vec![]).await;
    assert_eq!(server.client_count(), 0);

    let client = connected_client(port).await;
    client.noop().await.unwrap();
    assert_eq!(server.client_count(), 1);

    client.disconnect().await;
    // The per-connection task notices the close shortly after.
    for _ in 0..50 {
        if server.client_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn shutdown_disconnects_clients() {
    let (server, port) = spawn_server(line_tags()).await;
    let client = connected_client(port).await;
    client.noop().await.unwrap();

    server.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The server side closed; the next exchange fails and the client
    // transitions to disconnected.
    assert!(client.noop().await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn heartbeat_closes_after_server_loss() {
    let (server, port) = spawn_server(vec![]).await;
    let config = ClientConfig::new("127.0.0.1")
        .with_port(port)
        .with_timeout(Duration::from_millis(300))
        .with_heartbeat_interval(Duration::from_millis(100));
    let client = Client::new(config);
    client.connect().await.unwrap();
    assert!(client.is_connected());

    // Heartbeats keep flowing while the server is up.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(client.is_connected());

    server.shutdown();
    // The next heartbeat fails and closes the connection.
    for _ in 0..50 {
        if !client.is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn server_replies_with_exact_wire_bytes() {
    let (_server, port) = spawn_server(line_tags()).await;
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // S2: read integer 42 at tag 1001.
    stream
        .write_all(&[0x02, 0x00, 0xE9, 0x03, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    let mut reply = [0u8; 8];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x00, 0x00, 0xE9, 0x03, 0x2A, 0x00, 0x00, 0x00]);

    // S1: NoOp.
    stream
        .write_all(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    // S4: read string "Hi" at tag 1003 (header + one body frame).
    stream
        .write_all(&[0x08, 0x00, 0xEB, 0x03, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x00, 0x00, 0xEB, 0x03, 0x02, 0x00, 0x00, 0x00]);
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x48, 0x00, 0x69, 0x00, 0x00, 0x00, 0x00, 0x00]);

    // S6: read of the write-only tag 1005.
    stream
        .write_all(&[0x02, 0x00, 0xED, 0x03, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xBB, 0xBB, 0xED, 0x03, 0x00, 0x00, 0x00, 0x00]);
}

#[tokio::test]
async fn unknown_command_keeps_connection_open() {
    let (_server, port) = spawn_server(line_tags()).await;
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // Command id 7 is outside the taxonomy.
    stream
        .write_all(&[0x07, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    let mut reply = [0u8; 8];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xAA, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    // Reserved command 4 (ReadList) is answered the same way.
    stream
        .write_all(&[0x04, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xAA, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    // The connection is still serviceable.
    stream
        .write_all(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[tokio::test]
async fn s5_write_string_header_wire_bytes() {
    let (server, port) = spawn_server(line_tags()).await;
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // Empty string write: header only, zero body frames.
    stream
        .write_all(&[0x09, 0x00, 0xEB, 0x03, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    let mut reply = [0u8; 8];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x00, 0x00, 0xEB, 0x03, 0x00, 0x00, 0x00, 0x00]);

    assert_eq!(
        server.tag(1003).unwrap().value,
        TagValue::String(String::new())
    );
}
