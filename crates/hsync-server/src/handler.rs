use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hsync_directory::DirectoryError;
use hsync_sync::RequestInfo;
use serde::de::DeserializeOwned;

use crate::api::{
    non_empty_str, AssignRequest, AssignResponse, ErrorBody, HandleRequest, LookupResponse,
    LIVENESS_TEXT,
};
use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

const HANDLE_USAGE: &str = "Please provide a valid string in the iid field";
const ASSIGN_USAGE: &str = "Please provide a string iid and a valid document handle";

/// `GET /`: liveness check, or the sync socket when the request upgrades.
pub async fn root_handler(
    State(state): State<AppState>,
    ws: Option<WebSocketUpgrade>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match ws {
        Some(ws) => bridge(&state, ws, connect_info, method, uri, headers),
        None => LIVENESS_TEXT.into_response(),
    }
}

/// Any other path: upgrades are bridged, everything else is 404.
pub async fn fallback_handler(
    State(state): State<AppState>,
    ws: Option<WebSocketUpgrade>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match ws {
        Some(ws) => bridge(&state, ws, connect_info, method, uri, headers),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no route for {method} {}", uri.path()),
            }),
        )
            .into_response(),
    }
}

fn bridge(
    state: &AppState,
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = RequestInfo::new(method, uri, headers, connect_info.map(|ConnectInfo(a)| a));
    state.bridge.upgrade(ws, request).into_response()
}

/// `POST /api/handle`: `{iid}` -> `{result: handle | false}`.
pub async fn handle_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<LookupResponse>> {
    let request: HandleRequest = parse_body(&body, HANDLE_USAGE)?;
    let iid = non_empty_str(&request.iid)
        .ok_or_else(|| ServerError::InvalidArgument(HANDLE_USAGE.into()))?;

    let handle = state.directory.lookup(iid).await?;
    Ok(Json(LookupResponse {
        result: handle.into(),
    }))
}

/// `POST /api/assign`: `{iid, handle}` -> `{result: true}`.
pub async fn assign_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<AssignResponse>> {
    let request: AssignRequest = parse_body(&body, ASSIGN_USAGE)?;
    let (Some(iid), Some(handle)) = (non_empty_str(&request.iid), non_empty_str(&request.handle))
    else {
        return Err(ServerError::InvalidArgument(ASSIGN_USAGE.into()));
    };

    state.directory.assign(iid, handle).await.map_err(|e| match e {
        DirectoryError::InvalidArgument(reason) => {
            ServerError::InvalidArgument(format!("{ASSIGN_USAGE}: {reason}"))
        }
        other => other.into(),
    })?;
    Ok(Json(AssignResponse { result: true }))
}

fn parse_body<T: DeserializeOwned + Default>(body: &[u8], usage: &str) -> ServerResult<T> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ServerError::InvalidArgument(usage.into()))
}
