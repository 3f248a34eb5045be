//! HTTP surface: `GET /` health check and `POST /generate-fal`.

use crate::app::FortuneApp;
use crate::models::{GenerateFalRequest, GenerateFalResponse};
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub fn router(app: Arc<FortuneApp>) -> Router {
    // axum caps bodies at 2 MB by default; base64 camera photos are larger.
    let body_limit = app.max_body_bytes();

    Router::new()
        .route("/", get(health))
        .route("/generate-fal", post(generate_fal))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app)
}

/// Serve until the process is stopped.
pub async fn serve(listener: TcpListener, app: Arc<FortuneApp>) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(app)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Always answers 200; failures are reported in the body's `success`/`error`.
async fn generate_fal(
    State(app): State<Arc<FortuneApp>>,
    payload: std::result::Result<Json<GenerateFalRequest>, JsonRejection>,
) -> Json<GenerateFalResponse> {
    match payload {
        Ok(Json(request)) => Json(app.generate(request).await),
        Err(rejection) => {
            warn!("Rejected generate-fal body: {}", rejection.body_text());
            Json(GenerateFalResponse::failure(format!(
                "Invalid request body: {}",
                rejection.body_text()
            )))
        }
    }
}
