//! HTTP endpoints for note bootstrap.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use notewell_collab::protocol::NoteInfo;

use crate::AppState;

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers
}

/// `GET /api/note/{id}`: current hash and content, creating the room on
/// first access
pub async fn get_note(State(app): State<AppState>, Path(note_id): Path<String>) -> Response {
    let snapshot = app.rooms.get_or_create(&note_id).snapshot();
    tracing::debug!(note = %note_id, "note info requested");

    let body = NoteInfo {
        status: "success".to_string(),
        latest_hash: snapshot.latest_hash,
        latest_content: snapshot.latest_content,
    };
    (cors_headers(), Json(body)).into_response()
}

/// CORS preflight: 204 with permissive headers
pub async fn preflight() -> Response {
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}

/// Anything unrouted: preflights still succeed, the rest is 404
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight().await;
    }
    StatusCode::NOT_FOUND.into_response()
}
