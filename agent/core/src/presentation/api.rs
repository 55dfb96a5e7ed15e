// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent HTTP API
//!
//! JSON endpoints called by the orchestrator. Successful calls answer 200
//! with the bare JSON value (a mount description, a list, `true`, an encoded
//! payload string). Failures answer 500 with
//! `{"Code":"ERROR","Message":...,"Details":null}`.
//!
//! Everything except `/api/hostname` and the status endpoint requires the
//! process token.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, RawQuery, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::error;

use super::auth::{basic_auth, require_token, BasicAuth, TokenGuard};
use crate::application::{BinlogAssembler, HeartbeatStatus, SeedTransferCoordinator};
use crate::domain::agent_config::AgentConfig;
use crate::domain::binlog::{position_bound, select_files_from_name, BinlogCoordinates};
use crate::domain::error::AgentError;
use crate::domain::token::ProcessToken;
use crate::domain::volume::{LogicalVolume, MountInfo};
use crate::infrastructure::{CommandRunner, HostOperations, ProcessRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseCode {
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "OK")]
    Ok,
}

/// Envelope for errors and custom command output.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    #[serde(rename = "Code")]
    pub code: ResponseCode,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Details")]
    pub details: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Ok,
            message: message.into(),
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Error,
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = match self.code {
            ResponseCode::Ok => StatusCode::OK,
            ResponseCode::Error => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{}", self.0);
        ApiResponse::error(self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub host: HostOperations,
    pub binlogs: BinlogAssembler,
    pub seeds: SeedTransferCoordinator,
    pub heartbeat: HeartbeatStatus,
    pub token: ProcessToken,
}

impl AppState {
    pub fn new(config: Arc<AgentConfig>, token: ProcessToken, heartbeat: HeartbeatStatus) -> Self {
        let runner = CommandRunner::new(config.exec_with_sudo);
        let host = HostOperations::new(runner, config);
        Self::with_host(host, token, heartbeat)
    }

    /// Build around an existing [`HostOperations`] (e.g. with another mount table).
    pub fn with_host(host: HostOperations, token: ProcessToken, heartbeat: HeartbeatStatus) -> Self {
        let config = host.config().clone();
        let binlogs = BinlogAssembler::from_config(host.runner().clone(), &config);
        let seeds = SeedTransferCoordinator::new(host.clone(), ProcessRegistry::new());
        Self {
            config,
            host,
            binlogs,
            seeds,
            heartbeat,
            token,
        }
    }
}

/// Build the agent router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let guard = TokenGuard::new(state.token.clone(), &state.config.token_http_header);

    let protected = Router::new()
        .route("/api/lvs", get(list_logical_volumes))
        .route("/api/lvs/{pattern}", get(list_logical_volumes))
        .route("/api/lvs-snapshots", get(list_snapshot_logical_volumes))
        .route("/api/lv", get(logical_volume))
        .route("/api/lv/{lv}", get(logical_volume))
        .route("/api/mount", get(get_mount))
        .route("/api/mountlv", get(mount_lv))
        .route("/api/removelv", get(remove_lv))
        .route("/api/umount", get(unmount))
        .route("/api/du", get(disk_usage))
        .route("/api/mysql-du", get(mysql_disk_usage))
        .route("/api/create-snapshot", get(create_snapshot))
        .route("/api/available-snapshots-local", get(available_local_snapshots))
        .route("/api/available-snapshots", get(available_snapshots))
        .route("/api/mysql-error-log-tail", get(mysql_error_log_tail))
        .route("/api/mysql-port", get(mysql_port))
        .route("/api/mysql-status", get(mysql_running))
        .route("/api/mysql-stop", get(mysql_stop))
        .route("/api/mysql-start", get(mysql_start))
        .route("/api/delete-mysql-datadir", get(delete_mysql_datadir))
        .route(
            "/api/mysql-datadir-available-space",
            get(mysql_datadir_available_space),
        )
        .route("/api/post-copy", get(post_copy))
        .route("/api/receive-mysql-seed-data/{seed_id}", get(receive_seed))
        .route(
            "/api/send-mysql-seed-data/{target_host}/{seed_id}",
            get(send_seed),
        )
        .route("/api/abort-seed/{seed_id}", get(abort_seed))
        .route("/api/seed-command-completed/{seed_id}", get(seed_completed))
        .route("/api/seed-command-succeeded/{seed_id}", get(seed_succeeded))
        .route("/api/mysql-relay-log-index-file", get(relay_log_index_file))
        .route("/api/mysql-relay-log-files", get(relay_log_files))
        .route(
            "/api/mysql-relay-log-end-coordinates",
            get(relay_log_end_coordinates),
        )
        .route("/api/mysql-binlog-contents", get(binlog_contents))
        .route("/api/mysql-binlog-binary-contents", get(binlog_binary_contents))
        .route(
            "/api/mysql-relaylog-contents-tail/{relaylog}/{start}",
            get(relaylog_contents_tail),
        )
        // relay log payloads routinely exceed the default 2 MiB body limit
        .route(
            "/api/apply-relaylog-contents",
            post(apply_relaylog_contents).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/custom-commands/{cmd}", get(run_custom_command))
        .layer(middleware::from_fn_with_state(guard, require_token));

    let mut router = Router::new()
        .route("/api/hostname", get(hostname))
        .route(&state.config.status_endpoint, get(status))
        .merge(protected)
        .with_state(state.clone());

    if !state.config.http_auth_user.is_empty() {
        let auth = BasicAuth::new(
            state.config.http_auth_user.clone(),
            state.config.http_auth_password.clone(),
        );
        router = router.layer(middleware::from_fn_with_state(auth, basic_auth));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn parse_position(name: &str, raw: Option<&str>) -> Result<Option<u64>, ApiError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(position_bound)
            .map_err(|e| AgentError::Parse(format!("Cannot parse {}: {}", name, e)).into()),
    }
}

/// `binlog=` (repeatable), `start=`, `stop=` query parameters.
fn binlog_query(raw: Option<String>) -> Result<(Vec<String>, Option<u64>, Option<u64>), ApiError> {
    let raw = raw.unwrap_or_default();
    let mut files = Vec::new();
    let mut start = None;
    let mut stop = None;
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "binlog" => files.push(value.into_owned()),
            "start" => start = parse_position("start", Some(value.as_ref()))?,
            "stop" => stop = parse_position("stop", Some(value.as_ref()))?,
            _ => {}
        }
    }
    Ok((files, start, stop))
}

fn lv_param(path: Option<Path<String>>, query: &HashMap<String, String>) -> String {
    path.map(|Path(lv)| lv)
        .filter(|lv| !lv.is_empty())
        .or_else(|| query.get("lv").cloned())
        .unwrap_or_default()
}

async fn hostname(State(state): State<AppState>) -> ApiResult<String> {
    Ok(Json(state.host.hostname()?))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    if state.heartbeat.is_healthy(state.config.status_threshold()) {
        (StatusCode::OK, Json("OK"))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json("BAD"))
    }
}

async fn list_logical_volumes(
    State(state): State<AppState>,
    pattern: Option<Path<String>>,
) -> ApiResult<Vec<LogicalVolume>> {
    let pattern = pattern.map(|Path(p)| p).unwrap_or_default();
    Ok(Json(state.host.logical_volumes("", &pattern).await?))
}

async fn list_snapshot_logical_volumes(State(state): State<AppState>) -> ApiResult<Vec<LogicalVolume>> {
    let filter = &state.config.snapshot_volumes_filter;
    Ok(Json(state.host.logical_volumes("", filter).await?))
}

async fn logical_volume(
    State(state): State<AppState>,
    lv: Option<Path<String>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Vec<LogicalVolume>> {
    let lv = lv_param(lv, &query);
    Ok(Json(state.host.logical_volumes(&lv, "").await?))
}

async fn get_mount(State(state): State<AppState>) -> ApiResult<MountInfo> {
    Ok(Json(state.host.get_mount(&state.config.snapshot_mount_point).await?))
}

async fn mount_lv(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<MountInfo> {
    let lv = lv_param(None, &query);
    let mount = state
        .host
        .mount_lv(&state.config.snapshot_mount_point, &lv)
        .await?;
    Ok(Json(mount))
}

async fn remove_lv(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<bool> {
    state.host.remove_lv(&lv_param(None, &query)).await?;
    Ok(Json(true))
}

async fn unmount(State(state): State<AppState>) -> ApiResult<MountInfo> {
    Ok(Json(state.host.unmount(&state.config.snapshot_mount_point).await?))
}

async fn disk_usage(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<u64> {
    let path = query.get("path").cloned().unwrap_or_default();
    Ok(Json(state.host.disk_usage(&path).await?))
}

async fn mysql_disk_usage(State(state): State<AppState>) -> ApiResult<u64> {
    let datadir = state.host.mysql_datadir().await?;
    Ok(Json(state.host.disk_usage(&datadir).await?))
}

async fn create_snapshot(State(state): State<AppState>) -> ApiResult<bool> {
    state.host.create_snapshot().await?;
    Ok(Json(true))
}

async fn available_local_snapshots(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.host.available_snapshots(true).await?))
}

async fn available_snapshots(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.host.available_snapshots(false).await?))
}

async fn mysql_error_log_tail(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.host.mysql_error_log_tail().await?))
}

async fn mysql_port(State(state): State<AppState>) -> ApiResult<u64> {
    Ok(Json(state.host.mysql_port().await?))
}

async fn mysql_running(State(state): State<AppState>) -> ApiResult<bool> {
    Ok(Json(state.host.mysql_running().await))
}

async fn mysql_stop(State(state): State<AppState>) -> ApiResult<bool> {
    state.host.mysql_stop().await?;
    Ok(Json(true))
}

async fn mysql_start(State(state): State<AppState>) -> ApiResult<bool> {
    state.host.mysql_start().await?;
    Ok(Json(true))
}

async fn delete_mysql_datadir(State(state): State<AppState>) -> ApiResult<bool> {
    state.host.delete_mysql_datadir().await?;
    Ok(Json(true))
}

async fn mysql_datadir_available_space(State(state): State<AppState>) -> ApiResult<u64> {
    Ok(Json(state.host.mysql_datadir_available_space().await?))
}

async fn post_copy(State(state): State<AppState>) -> ApiResult<bool> {
    state.host.post_copy().await?;
    Ok(Json(true))
}

async fn receive_seed(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
) -> ApiResult<bool> {
    state.seeds.receive(&seed_id).await?;
    Ok(Json(true))
}

async fn send_seed(
    State(state): State<AppState>,
    Path((target_host, seed_id)): Path<(String, String)>,
) -> ApiResult<bool> {
    let mount = state
        .host
        .get_mount(&state.config.snapshot_mount_point)
        .await?;
    state
        .seeds
        .send(&target_host, &mount.mysql_data_path, &seed_id)
        .await?;
    Ok(Json(true))
}

async fn abort_seed(State(state): State<AppState>, Path(seed_id): Path<String>) -> ApiResult<bool> {
    state.seeds.abort(&seed_id)?;
    Ok(Json(true))
}

async fn seed_completed(State(state): State<AppState>, Path(seed_id): Path<String>) -> Json<bool> {
    Json(state.seeds.is_completed(&seed_id))
}

async fn seed_succeeded(State(state): State<AppState>, Path(seed_id): Path<String>) -> Json<bool> {
    Json(state.seeds.is_successful(&seed_id))
}

async fn relay_log_index_file(State(state): State<AppState>) -> ApiResult<String> {
    Ok(Json(state.host.relay_log_index_file().await?))
}

async fn relay_log_files(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.host.relay_log_file_names().await?))
}

async fn relay_log_end_coordinates(State(state): State<AppState>) -> ApiResult<BinlogCoordinates> {
    Ok(Json(state.host.relay_log_end_coordinates().await?))
}

async fn binlog_contents(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<String> {
    let (files, start, stop) = binlog_query(raw)?;
    Ok(Json(state.binlogs.render_text(&files, start, stop).await?))
}

async fn binlog_binary_contents(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<String> {
    let (files, start, stop) = binlog_query(raw)?;
    Ok(Json(state.binlogs.render_binary(&files, start, stop).await?))
}

/// Relay log bytes from `start` in `relaylog` through the end of the last
/// relay log. An unknown relay log yields an empty payload.
async fn relaylog_contents_tail(
    State(state): State<AppState>,
    Path((relaylog, start)): Path<(String, String)>,
) -> ApiResult<String> {
    let start = parse_position("startPosition", Some(start.as_str()))?;
    let existing = state.host.relay_log_file_names().await?;
    let files = select_files_from_name(&existing, &relaylog);
    if files.is_empty() {
        return Ok(Json(String::new()));
    }
    Ok(Json(state.binlogs.render_binary(&files, start, None).await?))
}

async fn apply_relaylog_contents(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    state.binlogs.apply(&body).await?;
    Ok(Json("OK"))
}

async fn run_custom_command(
    State(state): State<AppState>,
    Path(cmd): Path<String>,
) -> Result<ApiResponse, ApiError> {
    if !state.config.custom_commands.contains_key(&cmd) {
        return Err(AgentError::NotFound(format!("{} : Command not found", cmd)).into());
    }
    let output = state.host.run_custom_command(&cmd).await?;
    Ok(ApiResponse::ok(String::from_utf8_lossy(&output)))
}
