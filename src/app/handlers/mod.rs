pub mod auth;
pub mod manage;
pub mod search;
pub mod upload;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

pub async fn index() -> Redirect {
    Redirect::to("/search")
}

pub async fn health() -> &'static str {
    "ok"
}

pub(crate) fn page(status: StatusCode, html: String) -> Response {
    (status, Html(html)).into_response()
}
