pub mod csv_import;
pub mod pagination;
pub mod query;
pub mod records;
pub mod service;
