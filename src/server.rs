use crate::{
    config::Config,
    errors::{AppError, AppResult},
    files::{read::read_contained, samples::write_samples},
    security::PathGuard,
};
use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub guard: Arc<PathGuard>,
}

pub async fn serve(cfg: Config, guard: PathGuard) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let shared = AppState { cfg: Arc::new(cfg), guard: Arc::new(guard) };
    serve_on(listener, shared, shutdown_signal()).await
}

pub async fn serve_on(
    listener: tokio::net::TcpListener,
    shared: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(shared);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("ctrl+c received, shutting down");
    }
}

pub fn build_router(shared: AppState) -> Router {
    let limit_bytes = shared.cfg.limits.max_request_kb * 1024;
    Router::new()
        .route("/healthz", get(health))
        .route("/read", post(read))
        .route("/setup-sample", post(setup_sample))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(limit_bytes)),
        )
        .with_state(shared)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

/// Request body accepted as JSON or as an urlencoded form.
pub struct JsonOrForm(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonOrForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            let object = fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            Ok(Self(Value::Object(object)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            Ok(Self(value))
        }
    }
}

fn body_error(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::RequestTooLarge
    } else {
        AppError::InvalidInput(text)
    }
}

/// Extract and trim the `filename` field.
pub fn filename_field(body: &Value) -> AppResult<String> {
    let value = match body.get("filename") {
        None | Some(Value::Null) => return Err(AppError::InvalidInput("filename required".into())),
        Some(v) => v,
    };
    let Some(raw) = value.as_str() else {
        return Err(AppError::InvalidInput("filename must be a string".into()));
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("filename must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

async fn read(State(state): State<AppState>, body: Result<JsonOrForm, AppError>) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    let filename = match body.and_then(|JsonOrForm(v)| filename_field(&v)) {
        Ok(f) => f,
        Err(e) => {
            audit_end(&request_id, "read", "deny", e.code(), started.elapsed().as_millis() as u64, 0);
            return e.into_response();
        }
    };

    match read_contained(&state.guard, &filename).await {
        Ok(file) => {
            if let Some(anomaly) = file.anomaly {
                tracing::warn!(request_id = %request_id, anomaly = %anomaly, "percent-decoding failed; using raw filename");
            }
            let payload = json!({"path": file.path.display().to_string(), "content": file.content, "encoding": file.encoding});
            let bytes_out = serde_json::to_vec(&payload).map(|v| v.len()).unwrap_or(0) as u64;
            audit_end(&request_id, "read", "allow", "OK", started.elapsed().as_millis() as u64, bytes_out);
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => {
            let decision = if e.status().is_server_error() { "error" } else { "deny" };
            audit_end(&request_id, "read", decision, e.code(), started.elapsed().as_millis() as u64, 0);
            e.into_response()
        }
    }
}

async fn setup_sample(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    match write_samples(&state.guard).await {
        Ok(written) => {
            audit_end(&request_id, "setup-sample", "allow", "OK", started.elapsed().as_millis() as u64, 0);
            let written: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
            let body = json!({"ok": true, "base": state.guard.base().display().to_string(), "written": written});
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            audit_end(&request_id, "setup-sample", "error", e.code(), started.elapsed().as_millis() as u64, 0);
            e.into_response()
        }
    }
}

fn audit_end(request_id: &str, route: &str, decision: &str, code: &str, duration_ms: u64, bytes_out: u64) {
    tracing::info!(
        request_id = request_id,
        route = route,
        decision = decision,
        code = code,
        duration_ms = duration_ms,
        bytes_out = bytes_out,
        "audit"
    );
}
