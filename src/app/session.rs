//! Admin session gate.
//!
//! A browser session is either anonymous or carries an [`AdminSession`]
//! written on a successful login. The admin session expires one hour after
//! creation regardless of activity; an expired session is cleared and the
//! visitor treated as anonymous.

use crate::config::ServerConfig;
use crate::utils::error::{AppError, Result};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

pub const ADMIN_SESSION_KEY: &str = "admin";
pub const SESSION_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_AFTER_LOGIN: &str = "/gestao/codigos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub created_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { created_at: now }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(SESSION_TTL_SECS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(AdminSession),
}

impl AuthState {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Reads the auth state, clearing an expired admin session.
pub async fn current_auth(session: &Session, now: DateTime<Utc>) -> Result<AuthState> {
    match session.get::<AdminSession>(ADMIN_SESSION_KEY).await? {
        Some(admin) if admin.is_expired(now) => {
            tracing::info!(created_at = %admin.created_at, "Admin session expired");
            session.flush().await?;
            Ok(AuthState::Anonymous)
        }
        Some(admin) => Ok(AuthState::Authenticated(admin)),
        None => Ok(AuthState::Anonymous),
    }
}

/// Both fields are trimmed and compared in constant time; the failure does not
/// say which one was wrong.
pub fn check_credentials(config: &ServerConfig, username: &str, password: &str) -> Result<()> {
    let user_ok = username.trim().as_bytes().ct_eq(config.admin_user.as_bytes());
    let pass_ok = password.trim().as_bytes().ct_eq(config.admin_password.as_bytes());

    if bool::from(user_ok & pass_ok) {
        Ok(())
    } else {
        Err(AppError::InvalidCredentials)
    }
}

/// Anonymous -> Authenticated. The session id is rotated on login.
pub async fn login(
    session: &Session,
    config: &ServerConfig,
    username: &str,
    password: &str,
) -> Result<AdminSession> {
    if let Err(e) = check_credentials(config, username, password) {
        tracing::warn!("Failed admin login attempt");
        return Err(e);
    }

    let admin = AdminSession::new(Utc::now());
    session.cycle_id().await?;
    session.insert(ADMIN_SESSION_KEY, &admin).await?;
    tracing::info!("Admin logged in");

    Ok(admin)
}

/// Authenticated -> Anonymous.
pub async fn logout(session: &Session) -> Result<()> {
    session.flush().await?;
    Ok(())
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => DEFAULT_AFTER_LOGIN.to_string(),
    }
}

pub fn login_redirect_target(destination: &str) -> String {
    format!("/login?next={}", urlencoding::encode(destination))
}

fn session_failure(e: AppError) -> Response {
    e.log();
    (StatusCode::INTERNAL_SERVER_ERROR, e.user_friendly_message()).into_response()
}

/// The visitor's session and auth state, available to every page.
pub struct Viewer {
    pub session: Session,
    pub auth: AuthState,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.auth.is_admin()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let auth = current_auth(&session, Utc::now())
            .await
            .map_err(session_failure)?;

        Ok(Self { session, auth })
    }
}

/// Gate for admin routes: anonymous visitors are redirected to the login page
/// carrying the path they asked for.
pub struct RequireAdmin(pub AdminSession);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let viewer = Viewer::from_request_parts(parts, state).await?;

        match viewer.auth {
            AuthState::Authenticated(admin) => Ok(Self(admin)),
            AuthState::Anonymous => {
                let destination = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or(DEFAULT_AFTER_LOGIN);
                Err(Redirect::to(&login_redirect_target(destination)).into_response())
            }
        }
    }
}
