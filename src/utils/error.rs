use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("CSV file contains no data rows")]
    EmptyImport,

    #[error("CSV file has more than {limit} data rows")]
    ImportTooLarge { limit: usize },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record store error: {message}")]
    StoreError { message: String },

    #[error("Invalid admin credentials")]
    InvalidCredentials,

    #[error("Session error: {0}")]
    SessionError(#[from] tower_sessions::session::Error),

    #[error("Multipart error: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. } | Self::EmptyImport => StatusCode::BAD_REQUEST,
            Self::ImportTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MultipartError(e) => e.status(),
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValidationError { .. }
            | Self::EmptyImport
            | Self::ImportTooLarge { .. }
            | Self::InvalidCredentials => ErrorSeverity::Low,
            Self::MultipartError(_) | Self::CsvError(_) => ErrorSeverity::Medium,
            Self::IoError(_)
            | Self::SerializationError(_)
            | Self::DatabaseError(_)
            | Self::StoreError { .. }
            | Self::SessionError(_) => ErrorSeverity::High,
            Self::MigrationError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Message shown to the person using the page. Internal details stay in the logs.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::EmptyImport => "O ficheiro CSV está vazio.".to_string(),
            Self::ImportTooLarge { limit } => {
                format!("O ficheiro CSV excede o limite de {} registos.", limit)
            }
            Self::CsvError(_) | Self::MultipartError(_) => {
                "Não foi possível ler o ficheiro CSV. Tente novamente.".to_string()
            }
            Self::InvalidCredentials => "Credenciais inválidas. Tente novamente.".to_string(),
            Self::DatabaseError(_) | Self::StoreError { .. } => {
                "Ocorreu um problema ao aceder à base de dados. Tente novamente.".to_string()
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => self.to_string(),
            _ => "Ocorreu um erro inesperado. Verifique os logs do servidor.".to_string(),
        }
    }

    pub fn log(&self) {
        match self.severity() {
            ErrorSeverity::Low => tracing::debug!(error = %self, "request rejected"),
            ErrorSeverity::Medium => tracing::warn!(error = %self, "request failed"),
            ErrorSeverity::High | ErrorSeverity::Critical => {
                tracing::error!(error = %self, "request failed")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome of a call to the external postal-code service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("O código postal deve estar no formato XXXX-XXX para consultar a API externa.")]
    InvalidFormat,

    #[error("A API devolveu um estado inesperado ({0}).")]
    UnexpectedStatus(u16),

    #[error("Não existem dados adicionais para este código postal.")]
    NoData,

    #[error("Não foi possível obter dados adicionais da API.")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(AppError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::EmptyImport.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::store("down").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_hide_details_from_users() {
        let err = AppError::store("connection refused on 10.0.0.3");
        assert!(!err.user_friendly_message().contains("10.0.0.3"));
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_lookup_status_message_carries_code() {
        assert_eq!(
            LookupError::UnexpectedStatus(404).to_string(),
            "A API devolveu um estado inesperado (404)."
        );
    }
}
