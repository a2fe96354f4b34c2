use super::page;
use crate::app::session::Viewer;
use crate::app::state::AppState;
use crate::app::views;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::validate_file_extension;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const UPLOAD_FIELD: &str = "csvFile";
pub const MISSING_FILE_MESSAGE: &str = "Nenhum ficheiro enviado. Selecione um ficheiro CSV.";
pub const INVALID_EXTENSION_MESSAGE: &str = "O ficheiro deve ter a extensão .csv.";
pub const INSERT_FAILED_MESSAGE: &str =
    "Falha ao inserir os registos na base de dados. Verifique os logs do servidor.";

pub async fn upload_form(viewer: Viewer) -> Response {
    page(StatusCode::OK, views::upload_page(viewer.is_admin(), None, None))
}

pub async fn upload_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Response {
    let is_admin = viewer.is_admin();

    let path = match receive_upload(multipart, &state.config.uploads_dir).await {
        Ok(path) => path,
        Err(e) => {
            e.log();
            return page(
                e.status_code(),
                views::upload_page(is_admin, None, Some(&e.user_friendly_message())),
            );
        }
    };

    match state.importer.import_upload(&path).await {
        Ok(inserted) => {
            let message = format!("Foram inseridos {} registos na base de dados.", inserted);
            page(StatusCode::OK, views::upload_page(is_admin, Some(&message), None))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Import failed, upload kept");
            let text = match &e {
                AppError::DatabaseError(_) | AppError::StoreError { .. } => {
                    INSERT_FAILED_MESSAGE.to_string()
                }
                other => other.user_friendly_message(),
            };
            page(e.status_code(), views::upload_page(is_admin, None, Some(&text)))
        }
    }
}

/// Streams the `csvFile` part to disk and returns where it landed.
async fn receive_upload(mut multipart: Multipart, uploads_dir: &Path) -> Result<PathBuf> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(AppError::validation(MISSING_FILE_MESSAGE)),
        };
        validate_file_extension(UPLOAD_FIELD, &file_name, &["csv"])
            .map_err(|_| AppError::validation(INVALID_EXTENSION_MESSAGE))?;

        let path = uploads_dir.join(stored_file_name(&file_name, Utc::now().timestamp_millis()));
        write_field(field, &path).await?;
        tracing::debug!(file = %file_name, path = %path.display(), "Stored upload");

        return Ok(path);
    }

    Err(AppError::validation(MISSING_FILE_MESSAGE))
}

async fn write_field(mut field: Field<'_>, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let written = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<_, AppError>(())
    }
    .await;

    if written.is_err() {
        let _ = tokio::fs::remove_file(path).await;
    }
    written
}

/// `<stem with whitespace replaced by _>_<millis>.<ext>`; directory parts of
/// the client-supplied name are dropped.
pub fn stored_file_name(original: &str, millis: i64) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");

    let stem: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    format!("{}_{}.{}", stem, millis, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_name_replaces_whitespace() {
        assert_eq!(
            stored_file_name("codigos postais.csv", 1700000000000),
            "codigos_postais_1700000000000.csv"
        );
    }

    #[test]
    fn test_stored_file_name_drops_directories() {
        assert_eq!(stored_file_name("../../etc/lista.CSV", 5), "lista_5.CSV");
        assert_eq!(stored_file_name(r"C:\dados\lista.csv", 5), "lista_5.csv");
    }
}
