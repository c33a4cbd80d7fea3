use super::{process, CloudEvent, CloudEventResponse, IngressMode};
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// Accepts either `application/json` or the CloudEvents-specific
/// `application/cloudevents+json` media type (spec §6), unlike axum's
/// built-in `Json` extractor, which only accepts the former.
struct CloudEventJson(CloudEvent);

impl<S> FromRequest<S> for CloudEventJson
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json_like = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("application/cloudevents+json"));
        if !is_json_like {
            return Err((StatusCode::BAD_REQUEST, "expected application/cloudevents+json").into_response());
        }
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let ce: CloudEvent = serde_json::from_slice(&bytes)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}")).into_response())?;
        Ok(CloudEventJson(ce))
    }
}

/// Shared state for the two endpoints of spec §6.
pub struct CloudEventsState {
    pub mode: IngressMode,
}

/// `POST /api/cloudevents` + `GET /api/cloudevents/schemas` (spec §6).
pub fn router(state: Arc<CloudEventsState>) -> Router {
    Router::new()
        .route("/api/cloudevents", post(post_cloud_event))
        .route("/api/cloudevents/schemas", get(get_schemas))
        .with_state(state)
}

async fn post_cloud_event(
    State(state): State<Arc<CloudEventsState>>,
    CloudEventJson(ce): CloudEventJson,
) -> impl IntoResponse {
    let (response, status) = process(&ce, &state.mode).await;
    (status, Json(response))
}

#[derive(Serialize)]
struct SchemasResponse {
    schemas: Vec<String>,
    count: usize,
}

async fn get_schemas(State(state): State<Arc<CloudEventsState>>) -> impl IntoResponse {
    match &state.mode {
        IngressMode::Direct(bus) => {
            let schemas = bus.known_schemas();
            Json(SchemasResponse {
                count: schemas.len(),
                schemas,
            })
            .into_response()
        }
        IngressMode::Queued(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
