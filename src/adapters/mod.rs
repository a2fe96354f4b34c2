// Adapters layer: concrete implementations of the domain ports.

pub mod lookup;
pub mod memory;
pub mod postgres;

pub use lookup::CttLookupClient;
pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
