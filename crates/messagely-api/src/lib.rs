pub mod access;
pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod store;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All application routes. `/auth/*` is public, everything else requires a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/messages", post(messages::create_message))
        .route("/messages/{message_id}", get(messages::get_message))
        .route("/messages/{message_id}/read", post(messages::mark_read))
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/to", get(users::messages_to))
        .route("/users/{username}/from", get(users::messages_from))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
