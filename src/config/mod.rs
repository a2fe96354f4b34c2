pub mod toml_config;

use crate::utils::error::{AppError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_min_length, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toml_config::TomlConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/cp_gestao";
pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://www.cttcodigopostal.pt";
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "1234";
pub const DEFAULT_SESSION_SECRET: &str =
    "cp-gestao-development-session-secret-change-me-before-deploying-0123456789";
pub const DEFAULT_UPLOADS_DIR: &str = "./uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_IMPORT_MAX_ROWS: usize = 50_000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const MIN_SESSION_SECRET_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordStoreKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for RecordStoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::InvalidConfigValueError {
                field: "database.store".to_string(),
                value: other.to_string(),
                reason: "Expected postgres or memory".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the web server (default)
    Serve,
    /// Import a semicolon-separated CSV file into the record store
    Import {
        /// Path to the CSV file
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Parser)]
#[command(name = "cp-gestao")]
#[command(about = "Administration of Portuguese postal-code records")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, env = "CP_GESTAO_CONFIG", global = true, help = "Optional TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "RECORD_STORE", global = true, value_enum)]
    pub record_store: Option<RecordStoreKind>,

    #[arg(long, env = "POSTAL_API_KEY", global = true, hide_env_values = true)]
    pub postal_api_key: Option<String>,

    #[arg(long, env = "POSTAL_API_BASE_URL", global = true)]
    pub postal_api_base_url: Option<String>,

    #[arg(long, env = "ADMIN_USER", global = true)]
    pub admin_user: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", global = true, hide_env_values = true)]
    pub admin_password: Option<String>,

    #[arg(long, env = "SESSION_SECRET", global = true, hide_env_values = true)]
    pub session_secret: Option<String>,

    #[arg(long, env = "PAGE_SIZE", global = true)]
    pub page_size: Option<u64>,

    #[arg(long, env = "UPLOADS_DIR", global = true)]
    pub uploads_dir: Option<String>,

    #[arg(long, env = "MAX_UPLOAD_BYTES", global = true)]
    pub max_upload_bytes: Option<usize>,

    #[arg(long, env = "IMPORT_MAX_ROWS", global = true)]
    pub import_max_rows: Option<usize>,

    #[arg(long, env = "LOOKUP_AFTER_SAVE", global = true)]
    pub lookup_after_save: Option<bool>,

    #[arg(long, env = "LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Resolved configuration, built once at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub record_store: RecordStoreKind,
    pub db_max_connections: u32,
    pub postal_api_key: String,
    pub postal_api_base_url: String,
    pub admin_user: String,
    pub admin_password: String,
    pub session_secret: String,
    pub page_size: u64,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub import_max_rows: usize,
    pub lookup_after_save: bool,
    pub log_format: LogFormat,
    pub verbose: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("record_store", &self.record_store)
            .field("db_max_connections", &self.db_max_connections)
            .field("postal_api_base_url", &self.postal_api_base_url)
            .field("admin_user", &self.admin_user)
            .field("page_size", &self.page_size)
            .field("uploads_dir", &self.uploads_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("import_max_rows", &self.import_max_rows)
            .field("lookup_after_save", &self.lookup_after_save)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl CliConfig {
    /// No flags, no environment: every value falls through to file/defaults.
    pub fn empty() -> Self {
        Self {
            command: None,
            config: None,
            port: None,
            database_url: None,
            record_store: None,
            postal_api_key: None,
            postal_api_base_url: None,
            admin_user: None,
            admin_password: None,
            session_secret: None,
            page_size: None,
            uploads_dir: None,
            max_upload_bytes: None,
            import_max_rows: None,
            lookup_after_save: None,
            log_format: None,
            verbose: false,
        }
    }
}

impl ServerConfig {
    /// Loads the optional file named by `--config` and resolves against it.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Flags/environment win over the file, the file wins over defaults.
    pub fn resolve(cli: &CliConfig, file: TomlConfig) -> Result<Self> {
        let TomlConfig {
            server,
            database,
            lookup,
            admin,
        } = file;

        let record_store = match (cli.record_store, database.store) {
            (Some(kind), _) => kind,
            (None, Some(raw)) => raw.parse::<RecordStoreKind>()?,
            (None, None) => RecordStoreKind::Postgres,
        };

        let log_format = match (cli.log_format, server.log_format) {
            (Some(format), _) => format,
            (None, Some(raw)) => {
                raw.parse::<LogFormat>()
                    .map_err(|reason| AppError::InvalidConfigValueError {
                        field: "server.log_format".to_string(),
                        value: raw.clone(),
                        reason,
                    })?
            }
            (None, None) => LogFormat::default(),
        };

        Ok(Self {
            port: cli.port.or(server.port).unwrap_or(DEFAULT_PORT),
            database_url: pick(&cli.database_url, database.url, DEFAULT_DATABASE_URL),
            record_store,
            db_max_connections: database.max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            postal_api_key: pick(&cli.postal_api_key, lookup.api_key, ""),
            postal_api_base_url: pick(&cli.postal_api_base_url, lookup.base_url, DEFAULT_LOOKUP_BASE_URL),
            admin_user: pick(&cli.admin_user, admin.user, DEFAULT_ADMIN_USER),
            admin_password: pick(&cli.admin_password, admin.password, DEFAULT_ADMIN_PASSWORD),
            session_secret: pick(&cli.session_secret, admin.session_secret, DEFAULT_SESSION_SECRET),
            page_size: cli.page_size.or(server.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
            uploads_dir: PathBuf::from(pick(&cli.uploads_dir, server.uploads_dir, DEFAULT_UPLOADS_DIR)),
            max_upload_bytes: cli
                .max_upload_bytes
                .or(server.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            import_max_rows: cli
                .import_max_rows
                .or(server.import_max_rows)
                .unwrap_or(DEFAULT_IMPORT_MAX_ROWS),
            lookup_after_save: cli.lookup_after_save.or(server.lookup_after_save).unwrap_or(true),
            log_format,
            verbose: cli.verbose,
        })
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD || self.session_secret == DEFAULT_SESSION_SECRET
    }
}

fn pick(cli: &Option<String>, file: Option<String>, default: &str) -> String {
    cli.clone().or(file).unwrap_or_else(|| default.to_string())
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("port", self.port as usize, 1)?;
        validate_range("page_size", self.page_size, 1, 500)?;
        validate_url("postal_api_base_url", &self.postal_api_base_url)?;
        validate_path("uploads_dir", &self.uploads_dir.to_string_lossy())?;
        validate_positive_number("max_upload_bytes", self.max_upload_bytes, 1)?;
        validate_positive_number("import_max_rows", self.import_max_rows, 1)?;
        validate_non_empty_string("admin_user", &self.admin_user)?;
        validate_non_empty_string("admin_password", &self.admin_password)?;
        validate_min_length("session_secret", &self.session_secret, MIN_SESSION_SECRET_BYTES)?;

        if self.record_store == RecordStoreKind::Postgres {
            validate_non_empty_string("database_url", &self.database_url)?;
            validate_positive_number("db_max_connections", self.db_max_connections as usize, 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_and_validate() {
        let config = ServerConfig::resolve(&CliConfig::empty(), TomlConfig::default()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.admin_user, "admin");
        assert_eq!(config.record_store, RecordStoreKind::Postgres);
        assert!(config.lookup_after_save);
        assert!(config.validate().is_ok());
        assert!(config.uses_default_credentials());
    }

    #[test]
    fn test_cli_overrides_file_overrides_default() {
        let file = TomlConfig::from_toml_str(
            r#"
[server]
port = 8080
page_size = 50

[database]
store = "memory"
"#,
        )
        .unwrap();
        let mut cli = CliConfig::empty();
        cli.port = Some(9090);

        let config = ServerConfig::resolve(&cli, file).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.record_store, RecordStoreKind::Memory);
    }

    #[test]
    fn test_cli_parses_import_subcommand() {
        let cli = CliConfig::try_parse_from([
            "cp-gestao",
            "import",
            "codigos.csv",
            "--record-store",
            "memory",
            "--page-size",
            "10",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Command::Import { ref file }) if file == &PathBuf::from("codigos.csv")));
        assert_eq!(cli.record_store, Some(RecordStoreKind::Memory));
        assert_eq!(cli.page_size, Some(10));
    }

    #[test]
    fn test_short_session_secret_is_rejected() {
        let mut cli = CliConfig::empty();
        cli.session_secret = Some("too-short".to_string());

        let config = ServerConfig::resolve(&cli, TomlConfig::default()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut cli = CliConfig::empty();
        cli.page_size = Some(0);
        let config = ServerConfig::resolve(&cli, TomlConfig::default()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_store_kind_in_file_fails() {
        let file = TomlConfig::from_toml_str("[database]\nstore = \"mongo\"\n").unwrap();
        assert!(ServerConfig::resolve(&CliConfig::empty(), file).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cli = CliConfig::empty();
        cli.admin_password = Some("super-secret-password".to_string());
        let config = ServerConfig::resolve(&cli, TomlConfig::default()).unwrap();

        assert!(!format!("{:?}", config).contains("super-secret-password"));
    }
}
