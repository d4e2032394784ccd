use super::SigningEndpoint;
use crate::models::SignatureRequest;
use crate::{Error, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<SigningEndpoint>,
}

impl AppState {
    pub fn new(endpoint: SigningEndpoint) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/healthcheck",
            get(|| async move { (StatusCode::OK, "Ok").into_response() }),
        )
        .route("/signature", post(signature_handler))
        .with_state(state)
}

pub async fn run(bind_addr: &str, endpoint: SigningEndpoint) -> Result<()> {
    if !endpoint.is_configured() {
        warn!("Signing secret is not configured; /signature will refuse requests");
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Signing endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(endpoint))).await?;

    Ok(())
}

async fn signature_handler(State(state): State<AppState>, body: Bytes) -> Response {
    // A missing body is an empty intent.
    let request: SignatureRequest = if body.is_empty() {
        SignatureRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return Error::Serialization(e).into_response(),
        }
    };

    match state
        .endpoint
        .sign_intent(request.kind, &request.data_to_sign)
    {
        Ok(signed) => (StatusCode::OK, Json(signed)).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Configuration(_) => {
                error!("Refusing to sign: {}", self);
                (StatusCode::SERVICE_UNAVAILABLE, "Signing unavailable").into_response()
            }
            Error::InvalidIntent(message) => {
                warn!("Rejected signing intent: {}", message);
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            Error::Serialization(e) => {
                warn!("Malformed signing request: {}", e);
                (StatusCode::BAD_REQUEST, format!("Malformed request: {}", e)).into_response()
            }
            other => {
                error!("Signing endpoint error: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
