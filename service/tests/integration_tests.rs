//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for the vidgate-service crate
//!
//! These drive the full path a deployment exercises: a device dials the
//! acceptor, reports over the wire protocol, and request handlers operate
//! through the gateway facade.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use vidgate_service::{
    DeviceRegistry, DeviceServer, Gateway, GatewayConfig, GatewayError, STATUS_ACTIVE,
    STATUS_INACTIVE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn local_config() -> GatewayConfig {
    GatewayConfig::new("127.0.0.1:0".parse().unwrap())
        .with_idle_timeout(Duration::from_secs(60))
        .with_device("127.0.0.1", "test")
}

async fn start_server(config: GatewayConfig) -> (DeviceServer, Gateway, Arc<DeviceRegistry>) {
    let registry = Arc::new(DeviceRegistry::new(&config));
    let gateway = Gateway::new(registry.clone());
    let server = DeviceServer::new(config, registry.clone()).await.unwrap();
    server.start().await.unwrap();
    (server, gateway, registry)
}

#[tokio::test]
async fn test_report_then_send_full_flow() {
    init_tracing();
    let (server, gateway, _registry) = start_server(local_config()).await;

    // The device dials in and reports.
    let mut device = TcpStream::connect(server.bind_address()).await.unwrap();
    device
        .write_all(b"active\r\nfile1.mov\r\nfile2.mov\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The request side sees the reported state.
    let statuses = gateway.get_status(["127.0.0.1"]);
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, STATUS_ACTIVE);
    assert_eq!(statuses[0].files, vec!["file1.mov", "file2.mov"]);

    // A command goes out as exactly one frame on the device socket.
    gateway
        .send("START", "127.0.0.1", "file1.mov", "10.0.0.2", 9000)
        .await
        .unwrap();

    let mut buffer = vec![0u8; 128];
    let len = device.read(&mut buffer).await.unwrap();
    assert_eq!(&buffer[..len], b"START 10.0.0.2 9000 file1.mov\r\n\r\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_send_before_device_connects() {
    init_tracing();
    let (server, gateway, _registry) = start_server(local_config()).await;

    let err = gateway
        .send("START", "127.0.0.1", "file1.mov", "10.0.0.2", 9000)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotBound(_)));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_send_before_first_report() {
    init_tracing();
    let (server, gateway, _registry) = start_server(local_config()).await;

    let _device = TcpStream::connect(server.bind_address()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = gateway
        .send("START", "127.0.0.1", "file1.mov", "10.0.0.2", 9000)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotActive(_)));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_get_status() {
    init_tracing();
    let (server, gateway, _registry) = start_server(local_config()).await;

    let mut device = TcpStream::connect(server.bind_address()).await.unwrap();
    device.write_all(b"active\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // 100 concurrent queries, each over one known host and 99 unknown ones.
    let mut queries = Vec::new();
    for task in 0..100 {
        let gateway = gateway.clone();
        queries.push(tokio::spawn(async move {
            let mut hosts = vec!["127.0.0.1".to_string()];
            for n in 0..99 {
                hosts.push(format!("10.255.{task}.{n}"));
            }
            gateway.get_status(hosts)
        }));
    }

    for query in queries {
        let statuses = query.await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].host, "127.0.0.1");
        assert_eq!(statuses[0].status, STATUS_ACTIVE);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_idle_timeout_end_to_end() {
    init_tracing();
    let config = GatewayConfig::new("127.0.0.1:0".parse().unwrap())
        .with_idle_timeout(Duration::from_millis(200))
        .with_device("127.0.0.1", "test");
    let (server, gateway, registry) = start_server(config).await;

    let mut device = TcpStream::connect(server.bind_address()).await.unwrap();
    device.write_all(b"active\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gateway.get_status(["127.0.0.1"])[0].status, STATUS_ACTIVE);

    // Silence past the idle timeout force-closes the session.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(gateway.get_status(["127.0.0.1"])[0].status, STATUS_INACTIVE);
    assert!(!registry.lookup("127.0.0.1").unwrap().is_bound());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_evicts_old_session() {
    init_tracing();
    let (server, gateway, _registry) = start_server(local_config()).await;

    let mut first = TcpStream::connect(server.bind_address()).await.unwrap();
    first.write_all(b"active\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Same address dials again; default policy evicts the old session.
    let mut second = TcpStream::connect(server.bind_address()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut buffer = [0u8; 16];
    assert_eq!(first.read(&mut buffer).await.unwrap(), 0);

    // The new session starts unreported, then takes over.
    assert_eq!(gateway.get_status(["127.0.0.1"])[0].status, STATUS_INACTIVE);
    second.write_all(b"active\r\nnew.mov\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let statuses = gateway.get_status(["127.0.0.1"]);
    assert_eq!(statuses[0].status, STATUS_ACTIVE);
    assert_eq!(statuses[0].files, vec!["new.mov"]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_config_snapshot_before_any_connection() {
    init_tracing();
    let config = local_config();
    let registry = Arc::new(DeviceRegistry::new(&config));
    let gateway = Gateway::new(registry);

    // Configured devices answer status queries before ever connecting.
    let statuses = gateway.get_status(["127.0.0.1"]);
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, STATUS_INACTIVE);
    assert!(statuses[0].files.is_empty());
}
