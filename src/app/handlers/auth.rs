use super::page;
use crate::app::session::{self, safe_next, Viewer, DEFAULT_AFTER_LOGIN};
use crate::app::state::AppState;
use crate::app::views;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// An admin already signed in goes straight to the management page.
pub async fn login_form(viewer: Viewer, Query(params): Query<NextParam>) -> Response {
    if viewer.is_admin() {
        return Redirect::to(DEFAULT_AFTER_LOGIN).into_response();
    }
    let next = safe_next(params.next.as_deref());
    page(StatusCode::OK, views::login_page(None, &next))
}

pub async fn login_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    match session::login(&viewer.session, &state.config, &form.username, &form.password).await {
        Ok(_) => Redirect::to(&next).into_response(),
        Err(e) => {
            e.log();
            page(
                e.status_code(),
                views::login_page(Some(&e.user_friendly_message()), &next),
            )
        }
    }
}

pub async fn logout(viewer: Viewer) -> Response {
    if let Err(e) = session::logout(&viewer.session).await {
        e.log();
    }
    Redirect::to("/login").into_response()
}
