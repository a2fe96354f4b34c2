use clap::Parser;
use cp_gestao::config::{Command, RecordStoreKind};
use cp_gestao::domain::ports::RecordStore;
use cp_gestao::utils::error::{AppError, ErrorSeverity};
use cp_gestao::utils::{logger, validation::Validate};
use cp_gestao::{build_router, AppState, CliConfig, CttLookupClient, MemoryRecordStore, PgRecordStore, ServerConfig};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = CliConfig::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e, 1),
    };

    logger::init_logger(config.log_format, config.verbose);
    tracing::debug!("Server config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e, 1);
    }

    if config.uses_default_credentials() {
        tracing::warn!("Using default admin password or session secret; set ADMIN_PASSWORD and SESSION_SECRET");
    }
    if config.postal_api_key.is_empty() {
        tracing::warn!("POSTAL_API_KEY is not set; external lookups will be rejected by the API");
    }

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("❌ Could not open the record store: {}", e);
            exit_with(&e, 1);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::Import { file } => import(config, store, &file).await,
    }
}

async fn open_store(config: &ServerConfig) -> cp_gestao::Result<Arc<dyn RecordStore>> {
    match config.record_store {
        RecordStoreKind::Postgres => {
            let store = PgRecordStore::connect(&config.database_url, config.db_max_connections).await?;
            Ok(Arc::new(store))
        }
        RecordStoreKind::Memory => {
            tracing::warn!("Using the in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}

async fn serve(config: ServerConfig, store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let lookup = Arc::new(CttLookupClient::new(
        config.postal_api_base_url.clone(),
        config.postal_api_key.clone(),
    ));
    let addr = format!("0.0.0.0:{}", config.port);
    let app = build_router(AppState::new(config, store, lookup))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "🚀 Server ready and accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn import(config: ServerConfig, store: Arc<dyn RecordStore>, file: &Path) -> anyhow::Result<()> {
    let importer = cp_gestao::core::csv_import::CsvImport::new(store, config.import_max_rows);

    match importer.import_file(file).await {
        Ok(inserted) => {
            println!("✅ Foram inseridos {} registos na base de dados.", inserted);
            Ok(())
        }
        Err(e) => {
            tracing::error!(path = %file.display(), "❌ Import failed: {}", e);
            let code = match e.severity() {
                ErrorSeverity::Low => 2,
                ErrorSeverity::Medium | ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            exit_with(&e, code)
        }
    }
}

fn exit_with(e: &AppError, code: i32) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(code);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
