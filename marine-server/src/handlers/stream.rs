//! Live detection stream handler

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamQuery {
    /// Dashboard user whose detections are streamed
    pub user_email: Option<String>,
}

/// Relay the detection event stream for a user
///
/// Responds with `text/event-stream` and forwards upstream bytes verbatim.
#[utoipa::path(
    get,
    path = "/sse",
    tag = "Dashboard",
    params(StreamQuery),
    responses(
        (status = 200, description = "text/event-stream relayed from the detection service"),
        (status = 400, description = "Missing user_email"),
        (status = 502, description = "Detection stream unavailable")
    )
)]
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let user_email = query
        .user_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing user_email query parameter"))?;

    Ok(state.relay.open(user_email).await?)
}
