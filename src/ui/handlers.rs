//! HTTP API handlers

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream;
use tower_http::trace::TraceLayer;

use crate::capture::VideoFrame;
use crate::ui::server::AppState;

const MJPEG_BOUNDARY: &str = "streamframe";

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stream.mjpeg", get(stream_mjpeg))
        .route("/api/state", get(get_state))
        .route("/api/toggle", post(toggle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Engine state as served to the page
#[derive(serde::Serialize)]
pub struct StateDto {
    pub streaming: bool,
    pub busy: bool,
    pub waiting_for_permission: bool,
    pub clients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let pin_enabled = state.settings.get().security.enable_pin;
    Html(render_page(pin_enabled))
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StateDto>> {
    let snapshot = state.events.published();
    Json(ApiResponse::ok(StateDto {
        streaming: snapshot.is_streaming,
        busy: snapshot.is_busy,
        waiting_for_permission: snapshot.waiting_for_cast_permission,
        clients: snapshot.connected_clients,
        error: snapshot.error.map(|e| e.to_string()),
    }))
}

async fn toggle(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse<()>>) {
    state.events.toggle();
    (StatusCode::OK, Json(ApiResponse::ok(())))
}

#[derive(serde::Deserialize)]
struct StreamQuery {
    pin: Option<String>,
}

async fn stream_mjpeg(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let security = state.settings.get().security;
    if security.enable_pin && query.pin.as_deref() != Some(security.pin.as_str()) {
        tracing::warn!(%addr, "stream request rejected: bad pin");
        return (StatusCode::FORBIDDEN, "invalid pin").into_response();
    }

    let client = state.clients.register(addr);
    let mut frames = state.feed.subscribe();
    let shutdown = state.shutdown.subscribe();
    // Serve whatever frame is already current before waiting for the next
    frames.mark_changed();

    let body = Body::from_stream(stream::unfold(
        (frames, client, shutdown),
        |(mut frames, client, mut shutdown)| async move {
            loop {
                let chunk = tokio::select! {
                    changed = frames.changed() => {
                        if changed.is_err() {
                            // Feed dropped; end the stream
                            return None;
                        }
                        let frame = frames.borrow_and_update().clone();
                        let Some(frame) = frame else { continue };
                        multipart_chunk(&frame)
                    }
                    // Server stopping: end the stream so shutdown can finish
                    _ = shutdown.wait_for(|stop| *stop) => return None,
                };
                client.add_bytes(chunk.len() as u64);
                return Some((Ok::<_, Infallible>(chunk), (frames, client, shutdown)));
            }
        },
    ));

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}"),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// One part of the multipart stream: boundary, part headers, JPEG payload.
pub(crate) fn multipart_chunk(frame: &VideoFrame) -> Bytes {
    let mut chunk = BytesMut::with_capacity(frame.jpeg.len() + 128);
    chunk.put_slice(format!("--{MJPEG_BOUNDARY}\r\n").as_bytes());
    chunk.put_slice(b"Content-Type: image/jpeg\r\n");
    chunk.put_slice(format!("Content-Length: {}\r\n\r\n", frame.jpeg.len()).as_bytes());
    chunk.put_slice(&frame.jpeg);
    chunk.put_slice(b"\r\n");
    chunk.freeze()
}

fn render_page(pin_enabled: bool) -> String {
    let stream_src = if pin_enabled {
        "''" // set after the pin prompt
    } else {
        "'/stream.mjpeg'"
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Screen Stream</title>
<style>
  body {{ margin: 0; background: #181a1e; color: #ddd; font-family: sans-serif; text-align: center; }}
  img {{ max-width: 100%; margin-top: 1em; background: #000; }}
  button {{ margin: 1em; padding: 0.5em 2em; font-size: 1em; }}
  #status {{ color: #888; }}
</style>
</head>
<body>
<img id="screen" src={stream_src} alt="screen stream">
<div>
  <button onclick="fetch('/api/toggle', {{method: 'POST'}})">Start / Stop</button>
  <span id="status"></span>
</div>
<script>
  const pinRequired = {pin_enabled};
  if (pinRequired) {{
    const pin = window.prompt('Stream PIN:') || '';
    document.getElementById('screen').src = '/stream.mjpeg?pin=' + encodeURIComponent(pin);
  }}
  setInterval(async () => {{
    try {{
      const body = await (await fetch('/api/state')).json();
      const s = body.data;
      document.getElementById('status').textContent =
        s.error ? s.error :
        s.streaming ? 'streaming to ' + s.clients + ' client(s)' :
        s.waiting_for_permission ? 'waiting for permission' :
        s.busy ? 'starting...' : 'idle';
    }} catch (e) {{ /* server restarting */ }}
  }}, 1000);
</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_chunk_format() {
        let frame = VideoFrame {
            jpeg: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
            width: 2,
            height: 2,
            sequence: 7,
        };
        let chunk = multipart_chunk(&frame);
        let text = String::from_utf8_lossy(&chunk);
        assert!(text.starts_with("--streamframe\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("Content-Length: 4\r\n\r\n"));
        assert!(chunk.ends_with(b"\r\n"));
    }

    #[test]
    fn test_page_embeds_pin_prompt_only_when_enabled() {
        assert!(render_page(true).contains("pinRequired = true"));
        assert!(render_page(false).contains("pinRequired = false"));
    }
}
