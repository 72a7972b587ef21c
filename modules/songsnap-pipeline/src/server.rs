//! HTTP push endpoints. Each route receives one push-subscription envelope.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use songsnap_common::{PushEnvelope, SongSnapError};
use tracing::{error, warn};

use crate::router::{PipelineRouter, Stage};

pub struct AppState {
    pub pipeline: Arc<PipelineRouter>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/push/intake", post(push_intake))
        .route("/push/song-info", post(push_song_info))
        .route("/push/send-sms", post(push_send_sms))
        .route("/push/result", post(push_result))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "push_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn push_intake(State(state): State<Arc<AppState>>, Json(envelope): Json<PushEnvelope>) -> Response {
    deliver(&state, Stage::Intake, &envelope).await
}

async fn push_song_info(State(state): State<Arc<AppState>>, Json(envelope): Json<PushEnvelope>) -> Response {
    deliver(&state, Stage::Resolver, &envelope).await
}

async fn push_send_sms(State(state): State<Arc<AppState>>, Json(envelope): Json<PushEnvelope>) -> Response {
    deliver(&state, Stage::Notifier, &envelope).await
}

async fn push_result(State(state): State<Arc<AppState>>, Json(envelope): Json<PushEnvelope>) -> Response {
    deliver(&state, Stage::Persister, &envelope).await
}

/// 204 on success. Payload problems are 400 so the subscription stops
/// redelivering; collaborator failures are 500 so it retries.
async fn deliver(state: &AppState, stage: Stage, envelope: &PushEnvelope) -> Response {
    match state.pipeline.deliver(stage, envelope).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(stage, &envelope.message.message_id, e),
    }
}

fn error_response(stage: Stage, message_id: &str, err: SongSnapError) -> Response {
    let status = if err.is_client_error() {
        warn!(%stage, message_id, error = %err, "Rejected message");
        StatusCode::BAD_REQUEST
    } else {
        error!(%stage, message_id, error = %err, "Stage failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
