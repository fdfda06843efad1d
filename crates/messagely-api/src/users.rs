use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use axum_extra::extract::WithRejection;

use messagely_types::api::{Claims, MessageListResponse, UserListResponse, UserResponse};

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};
use crate::store::{message_detail_from_row, profile_from_user, user_detail_from_row};

fn ensure_correct_user(claims: &Claims, username: &str) -> Result<(), ApiError> {
    if claims.sub != username {
        return Err(ApiError::Forbidden(format!("Only {} may view this.", username)));
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_blocking(move || {
        Ok(state.db.list_users()?.into_iter().map(profile_from_user).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(UserListResponse { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(username), _): WithRejection<Path<String>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let user = run_blocking(move || {
        let row = state
            .db
            .get_user(&username)?
            .ok_or_else(|| ApiError::NotFound(format!("No such user: {}", username)))?;
        Ok(user_detail_from_row(row)?)
    })
    .await?;

    Ok(Json(UserResponse { user }))
}

/// Messages received by the caller.
pub async fn messages_to(
    State(state): State<AppState>,
    WithRejection(Path(username), _): WithRejection<Path<String>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let messages = run_blocking(move || {
        let rows = state.db.messages_to(&username)?;
        Ok(rows.into_iter().map(message_detail_from_row).collect::<anyhow::Result<Vec<_>>>()?)
    })
    .await?;

    Ok(Json(MessageListResponse { messages }))
}

/// Messages sent by the caller.
pub async fn messages_from(
    State(state): State<AppState>,
    WithRejection(Path(username), _): WithRejection<Path<String>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let messages = run_blocking(move || {
        let rows = state.db.messages_from(&username)?;
        Ok(rows.into_iter().map(message_detail_from_row).collect::<anyhow::Result<Vec<_>>>()?)
    })
    .await?;

    Ok(Json(MessageListResponse { messages }))
}
