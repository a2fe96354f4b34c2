use super::page;
use crate::app::session::Viewer;
use crate::app::state::AppState;
use crate::app::views;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
    pub cp: Option<String>,
}

impl SearchParams {
    fn code(&self) -> &str {
        self.postal_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.cp.as_deref())
            .unwrap_or("")
    }
}

pub async fn search(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(params): Query<SearchParams>,
) -> Response {
    let outcome = state.service.search(params.code()).await;

    match &outcome.store_error {
        Some(e) => page(
            e.status_code(),
            views::search_page(viewer.is_admin(), &outcome, Some(&e.user_friendly_message())),
        ),
        None => page(StatusCode::OK, views::search_page(viewer.is_admin(), &outcome, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_param_wins_over_cp() {
        let params = SearchParams {
            postal_code: Some("1000-001".to_string()),
            cp: Some("2000-002".to_string()),
        };
        assert_eq!(params.code(), "1000-001");

        let params = SearchParams {
            postal_code: Some(" ".to_string()),
            cp: Some("2000-002".to_string()),
        };
        assert_eq!(params.code(), "2000-002");
        assert_eq!(SearchParams::default().code(), "");
    }
}
