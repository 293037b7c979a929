//! HTTP presentation surface: a JSON snapshot endpoint and an MJPEG stream
//! of the mirrored camera feed.

use crate::camera::CameraHub;
use crate::state::StableState;
use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

const STREAM_FRAME_INTERVAL: Duration = Duration::from_millis(66);
const MJPEG_BOUNDARY: &str = "frame";

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct ServerState {
    pub mood: watch::Receiver<StableState>,
    pub camera: CameraHub,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/mood", get(get_mood))
        .route("/video", get(get_video))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "serving");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn get_mood(State(state): State<ServerState>) -> Json<StableState> {
    Json(state.mood.borrow().clone())
}

/// Long-lived multipart/x-mixed-replace response. Each part carries one JPEG
/// of the latest frame; ticks with no frame yet, or a frame that fails to
/// encode, are skipped rather than ending the stream.
async fn get_video(State(state): State<ServerState>) -> Response {
    let stream = futures::stream::unfold(state.camera, |camera| async move {
        loop {
            tokio::time::sleep(STREAM_FRAME_INTERVAL).await;
            let Some(frame) = camera.latest_frame() else {
                continue;
            };
            let Ok(jpeg) = frame.to_jpeg() else {
                continue;
            };
            return Some((Ok::<Bytes, std::convert::Infallible>(mjpeg_part(&jpeg)), camera));
        }
    });

    Response::builder()
        .header(
            "Content-Type",
            format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}"),
        )
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| ().into_response())
}

fn mjpeg_part(jpeg: &Bytes) -> Bytes {
    let mut part = Vec::with_capacity(jpeg.len() + 64);
    part.extend_from_slice(format!("--{MJPEG_BOUNDARY}\r\n").as_bytes());
    part.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mjpeg_part_frames_the_payload() {
        let jpeg = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let part = mjpeg_part(&jpeg);
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(&[0xFF, 0xD8, 0xFF, 0xD9, b'\r', b'\n']));
    }
}
