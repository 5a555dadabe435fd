use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::store::FrameStore;

/// Viewer page. Static: the pseudo-live-stream effect comes from the
/// client-side timer re-requesting the image with a timestamp cache-buster.
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Camera Live Stream</title>
    <style>
        body { text-align: center; }
        img { max-width: 100%; height: auto; }
    </style>
    <script>
        function updateImage() {
            var img = document.getElementById("cam_image");
            img.src = "/latest_image?" + new Date().getTime();
        }
        setInterval(updateImage, 100);
    </script>
</head>
<body>
    <h1>Camera Live Stream</h1>
    <img id="cam_image" src="/latest_image" alt="Camera feed">
</body>
</html>
"#;

struct AppState {
    store: FrameStore,
}

pub fn router(store: FrameStore) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/", get(index))
        .route("/latest_image", get(latest_image))
        .with_state(state)
}

/// GET / — the fixed viewer page.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /latest_image — current frame bytes, or an empty body before the
/// first frame arrives. Always 200 with image/jpeg, even when empty: the
/// page's <img> shows a placeholder until the camera publishes. Query
/// string (the cache-buster) is ignored.
async fn latest_image(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = match state.store.latest() {
        Some(frame) => {
            let age_ms = chrono::Utc::now().timestamp_millis() - frame.received_at_ms;
            debug!(bytes = frame.len(), seq = frame.seq, age_ms, "serving latest frame");
            frame.data
        }
        None => Bytes::new(),
    };
    (
        [
            (CONTENT_TYPE, "image/jpeg"),
            (CACHE_CONTROL, "no-store, must-revalidate"),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    async fn fetch(app: Router, uri: &str) -> axum::http::Response<axum::body::Body> {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn index_serves_static_page() {
        let response = fetch(router(FrameStore::new()), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains("latest_image"));
        assert!(page.contains("setInterval"));
    }

    #[tokio::test]
    async fn empty_store_yields_ok_with_empty_jpeg_body() {
        let response = fetch(router(FrameStore::new()), "/latest_image").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/jpeg");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn serves_current_frame_bytes() {
        let store = FrameStore::new();
        store.set(Bytes::from_static(b"\xFF\xD8stub\xFF\xD9"));
        let response = fetch(router(store), "/latest_image").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/jpeg");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"\xFF\xD8stub\xFF\xD9");
    }

    #[tokio::test]
    async fn cache_buster_query_is_ignored() {
        let store = FrameStore::new();
        store.set(Bytes::from_static(b"frame"));
        let response = fetch(router(store), "/latest_image?1708300000000").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"frame");
    }
}
