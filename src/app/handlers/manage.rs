use super::page;
use crate::app::session::RequireAdmin;
use crate::app::state::AppState;
use crate::app::views;
use crate::core::query::ListParams;
use crate::core::records::RecordForm;
use crate::core::service::ManageOutcome;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Form;

pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<ListParams>,
) -> Response {
    match state.service.manage(&params).await {
        Ok(outcome) => page(StatusCode::OK, views::manage_page(&outcome, None)),
        Err(e) => {
            e.log();
            let outcome = ManageOutcome {
                postal_code: params.postal_code.trim().to_string(),
                ..Default::default()
            };
            page(
                e.status_code(),
                views::manage_page(&outcome, Some(&e.user_friendly_message())),
            )
        }
    }
}

pub async fn save(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Form(form): Form<RecordForm>,
) -> Response {
    let outcome = state.service.save(&form).await;

    match &outcome.failure {
        Some(e) => page(
            e.status_code(),
            views::manage_page(&outcome, Some(&e.user_friendly_message())),
        ),
        None => page(StatusCode::OK, views::manage_page(&outcome, None)),
    }
}
