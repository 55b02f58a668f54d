//! Bearer-key protected management API, served on its own listener.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use crate::http::server::AppState;
use self::auth::admin_auth_middleware;
use self::handlers::*;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/forms", get(list_forms).post(create_form))
        .route("/admin/forms/{id}", put(update_form).delete(delete_form))
        .route("/admin/forms/{id}/submissions", get(list_submissions))
        .route("/admin/forms/{id}/export.csv", get(export_csv))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
