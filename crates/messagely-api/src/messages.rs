use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use messagely_types::api::{Claims, CreateMessageRequest, MessageEnvelope};

use crate::access::MessageAccessControl;
use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};

/// `GET /messages/{id}`: the message with both participants' profiles.
/// Visible to the sender and the recipient only.
pub async fn get_message(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_blocking(move || {
        Ok(MessageAccessControl::new(&state.db).get_message(&claims.sub, message_id)?)
    })
    .await?;

    Ok(Json(MessageEnvelope { message }))
}

/// `POST /messages`: send a message from the caller.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_blocking(move || {
        Ok(MessageAccessControl::new(&state.db).create_message(
            &claims.sub,
            &req.to_username,
            &req.body,
        )?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(MessageEnvelope { message })))
}

/// `POST /messages/{id}/read`: recipient-only. Returns `{id, read_at}`.
pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = run_blocking(move || {
        Ok(MessageAccessControl::new(&state.db).mark_read(&claims.sub, message_id)?)
    })
    .await?;

    Ok(Json(MessageEnvelope { message: receipt }))
}
