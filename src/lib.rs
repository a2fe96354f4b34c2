pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{CttLookupClient, MemoryRecordStore, PgRecordStore};
pub use app::{build_router, AppState};
pub use config::{CliConfig, ServerConfig};
pub use utils::error::{AppError, Result};
