use crate::config::ServerConfig;
use crate::core::csv_import::CsvImport;
use crate::core::service::PostalService;
use crate::domain::ports::{PostalLookup, RecordStore};
use std::sync::Arc;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub service: Arc<PostalService>,
    pub importer: Arc<CsvImport>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn RecordStore>,
        lookup: Arc<dyn PostalLookup>,
    ) -> Self {
        let service = PostalService::new(
            store.clone(),
            lookup,
            config.page_size,
            config.lookup_after_save,
        );
        let importer = CsvImport::new(store, config.import_max_rows);

        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            importer: Arc::new(importer),
        }
    }
}
