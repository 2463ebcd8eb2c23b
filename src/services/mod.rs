// Service exports
pub mod listings;
pub mod memory;
pub mod postgres;
pub mod store;

pub use listings::ListingService;
pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::{ListingStore, StoreError};
