use crate::app::handlers::{self, auth, manage, search, upload};
use crate::app::session::SESSION_TTL_SECS;
use crate::app::state::AppState;
use crate::utils::error::{AppError, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub fn build_router(state: AppState) -> Result<Router> {
    let key = Key::try_from(state.config.session_secret.as_bytes()).map_err(|e| {
        AppError::ConfigError {
            message: format!("session_secret cannot be used as a signing key: {}", e),
        }
    })?;

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name("cp_gestao.sid")
        .with_http_only(true)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(SESSION_TTL_SECS)))
        .with_signed(key);

    let body_limit = state.config.max_upload_bytes;

    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/search", get(search::search))
        .route("/upload", get(upload::upload_form).post(upload::upload_submit))
        .route("/gestao/codigos", get(manage::list).post(manage::save))
        .layer(sessions)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
