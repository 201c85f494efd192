//! HTTP surface tests against the real web server

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use lan_screen_streamer::capture::create_shared_hub;
use lan_screen_streamer::config::{AppSettings, SettingsStore, SharedSettings};
use lan_screen_streamer::engine::{Event, EngineHandle, EngineInbox};
use lan_screen_streamer::network::NetInterface;
use lan_screen_streamer::ui::{stats_channel, StreamServer, WebServer};

fn localhost_interface() -> NetInterface {
    NetInterface {
        name: "lo".into(),
        address: IpAddr::V4(Ipv4Addr::LOCALHOST),
    }
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    listener.local_addr().expect("probe addr").port()
}

struct ServerRig {
    server: WebServer,
    settings: SharedSettings,
    hub: lan_screen_streamer::capture::SharedFrameHub,
    inbox: EngineInbox,
    port: u16,
}

async fn launch_server(mutate: impl FnOnce(&mut AppSettings)) -> ServerRig {
    let port = free_port();
    let mut initial = AppSettings::default();
    initial.network.http_port = port;
    mutate(&mut initial);
    let settings = SettingsStore::new(initial, None);

    let (handle, inbox) = EngineHandle::new();
    let (stats_tx, _stats_rx) = stats_channel();
    let hub = create_shared_hub();

    let mut server = WebServer::new(settings.clone(), hub.clone(), handle, stats_tx);
    server
        .start(&[localhost_interface()])
        .await
        .expect("server start");

    ServerRig {
        server,
        settings,
        hub,
        inbox,
        port,
    }
}

/// Minimal HTTP/1.1 request over a raw socket; returns everything read.
async fn http_get(port: u16, target: &str, method: &str, max_bytes: usize) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect");
    let request =
        format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.expect("write");

    let mut buf = vec![0u8; max_bytes];
    let mut read = 0;
    let deadline = Duration::from_secs(2);
    while read < max_bytes {
        match timeout(deadline, stream.read(&mut buf[read..])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => read += n,
            // Endless bodies (the MJPEG stream) stop here
            _ => break,
        }
    }
    String::from_utf8_lossy(&buf[..read]).into_owned()
}

#[tokio::test]
async fn test_page_and_state_endpoints() {
    let mut rig = launch_server(|_| {}).await;

    let page = http_get(rig.port, "/", "GET", 64 * 1024).await;
    assert!(page.starts_with("HTTP/1.1 200"));
    assert!(page.contains("Screen Stream"));

    let state = http_get(rig.port, "/api/state", "GET", 64 * 1024).await;
    assert!(state.starts_with("HTTP/1.1 200"));
    assert!(state.contains("\"success\":true"));
    assert!(state.contains("\"streaming\":false"));

    rig.server.stop().await;
}

#[tokio::test]
async fn test_toggle_submits_event() {
    let mut rig = launch_server(|_| {}).await;

    let response = http_get(rig.port, "/api/toggle", "POST", 64 * 1024).await;
    assert!(response.starts_with("HTTP/1.1 200"));

    let event = timeout(Duration::from_secs(5), rig.inbox.recv())
        .await
        .expect("no event")
        .expect("queue closed");
    assert!(matches!(event, Event::ToggleFromWebPage));

    rig.server.stop().await;
}

#[tokio::test]
async fn test_stream_serves_frames() {
    let mut rig = launch_server(|_| {}).await;
    rig.hub
        .publish(Bytes::from_static(&[0xFF, 0xD8, 0x00, 0x01, 0xFF, 0xD9]), 2, 2);

    let response = http_get(rig.port, "/stream.mjpeg", "GET", 2048).await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("multipart/x-mixed-replace"));
    assert!(response.contains("--streamframe"));
    assert!(response.contains("Content-Type: image/jpeg"));

    rig.server.stop().await;
}

#[tokio::test]
async fn test_stream_requires_pin_when_enabled() {
    let mut rig = launch_server(|settings| {
        settings.security.enable_pin = true;
        settings.security.pin = "123456".into();
    })
    .await;
    rig.hub
        .publish(Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]), 2, 2);

    let denied = http_get(rig.port, "/stream.mjpeg", "GET", 2048).await;
    assert!(denied.starts_with("HTTP/1.1 403"));

    let wrong = http_get(rig.port, "/stream.mjpeg?pin=000000", "GET", 2048).await;
    assert!(wrong.starts_with("HTTP/1.1 403"));

    let allowed = http_get(rig.port, "/stream.mjpeg?pin=123456", "GET", 2048).await;
    assert!(allowed.starts_with("HTTP/1.1 200"));

    rig.server.stop().await;
}

#[tokio::test]
async fn test_restart_rebinds_the_same_port() {
    let mut rig = launch_server(|_| {}).await;
    assert!(rig.server.is_running());

    // Start again without an explicit stop: the server must rebind cleanly
    rig.server
        .start(&[localhost_interface()])
        .await
        .expect("second start");
    let state = http_get(rig.port, "/api/state", "GET", 64 * 1024).await;
    assert!(state.starts_with("HTTP/1.1 200"));

    rig.server.stop().await;
    assert!(!rig.server.is_running());
    assert!(TcpStream::connect(("127.0.0.1", rig.port)).await.is_err());

    // Settings still live for future starts
    drop(rig.settings);
}
