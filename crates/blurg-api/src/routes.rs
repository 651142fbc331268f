use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use blurg_core::diary::{validate_author, validate_remote_name};
use blurg_core::models::{now_minute, parse_entry_date, EntryId};
use blurg_core::protocol::{
    InitForm, InitResponse, ListReply, LogForm, StatusResponse, WireEntry, INIT_PATH, LIST_PATH,
    LOG_PATH, MAX_REQUEST_BYTES, VERIFY_PATH, WIPE_PATH,
};
use blurg_core::EntryStore;
use chrono::Utc;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::auth::{extract_basic_key, DiaryClaims, KeySigner};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::DiaryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    signer: Arc<KeySigner>,
    store: DiaryStore,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            signer: Arc::new(KeySigner::new(&config.secret_key)),
            store: DiaryStore::new(config.storage_root.clone()),
            config,
        }
    }

    /// Resolve the request's key to its claims and the key itself.
    fn authorize(&self, headers: &HeaderMap) -> Result<(String, DiaryClaims), AppError> {
        let key = extract_basic_key(headers)?;
        let claims = self.signer.verify(&key)?;
        Ok((key, claims))
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(INIT_PATH, post(init_diary))
        .route(VERIFY_PATH, get(verify_key))
        .route(WIPE_PATH, delete(wipe_diary))
        .route(LOG_PATH, post(log_entry))
        .route("/rm/{id}", delete(remove_entry))
        .route(LIST_PATH, get(list_entries))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn init_diary(
    State(state): State<AppState>,
    form: Result<Form<InitForm>, FormRejection>,
) -> Result<Json<InitResponse>, AppError> {
    let Form(form) = form.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let diaryname = form.diaryname.trim();
    let username = form.username.trim();
    if diaryname.is_empty() || username.is_empty() {
        return Err(AppError::bad_request("diaryname and username are required"));
    }
    validate_remote_name(diaryname).map_err(|error| AppError::BadName(error.to_string()))?;
    validate_author(username)?;

    let key = state.signer.issue(diaryname, username)?;
    let created = state.store.init(&key).await?;
    tracing::info!(
        endpoint = "init",
        diary = diaryname,
        key = key_fingerprint(&key),
        created,
        "Initialized diary"
    );
    Ok(Json(InitResponse { key, created }))
}

async fn verify_key(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    let Ok((key, claims)) = state.authorize(&headers) else {
        return Json(StatusResponse::failed());
    };
    match state.store.exists(&key).await {
        Ok(true) => Json(StatusResponse {
            diaryname: Some(claims.diaryname),
            ..StatusResponse::ok()
        }),
        Ok(false) => Json(StatusResponse::failed()),
        Err(error) => {
            tracing::warn!(endpoint = "verify", %error, "Key check failed");
            Json(StatusResponse::failed())
        }
    }
}

async fn wipe_diary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    let (key, claims) = state.authorize(&headers)?;
    state.store.wipe(&key).await?;
    tracing::info!(
        endpoint = "wipe",
        diary = %claims.diaryname,
        key = key_fingerprint(&key),
        "Wiped diary"
    );
    Ok(Json(StatusResponse::ok()))
}

async fn log_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<LogForm>, FormRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let (key, claims) = state.authorize(&headers)?;
    let Form(form) = form.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let timestamp = match form.date.as_deref().map(str::trim).filter(|date| !date.is_empty()) {
        Some(date) => parse_entry_date(date)
            .map_err(|error| AppError::bad_request(format!("bad date {date:?}: {error}")))?,
        None => now_minute(),
    };
    let author = if form.username.trim().is_empty() {
        claims.username
    } else {
        form.username
    };
    let text = form.text;

    let entry = state
        .store
        .with_diary(&key, move |diary| diary.add_entry(&text, timestamp, &author))
        .await?;
    tracing::info!(
        endpoint = "log",
        key = key_fingerprint(&key),
        id = %entry.id,
        "Logged entry"
    );
    Ok(Json(StatusResponse {
        id: Some(entry.id.get()),
        ..StatusResponse::ok()
    }))
}

async fn remove_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let (key, _claims) = state.authorize(&headers)?;
    let id = raw_id
        .parse::<EntryId>()
        .map_err(|error| AppError::BadId(error.to_string()))?;

    state
        .store
        .with_diary(&key, move |diary| diary.remove(id))
        .await?;
    tracing::info!(
        endpoint = "rm",
        key = key_fingerprint(&key),
        id = %id,
        "Removed entry"
    );
    Ok(Json(StatusResponse::ok()))
}

async fn list_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListReply>, AppError> {
    let (key, _claims) = state.authorize(&headers)?;
    let entries = state
        .store
        .with_diary(&key, |diary| diary.list(None))
        .await?;
    tracing::debug!(
        endpoint = "list",
        key = key_fingerprint(&key),
        entries = entries.len(),
        "Listed entries"
    );
    Ok(Json(ListReply::Entries {
        result: entries.iter().map(WireEntry::from_entry).collect(),
    }))
}

fn key_fingerprint(key: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
