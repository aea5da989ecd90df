// Adapters layer: concrete grant stores.

pub mod memory;
pub mod postgres;

pub use memory::MemoryGrantStore;
pub use postgres::PgGrantStore;
