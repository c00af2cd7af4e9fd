// Local bookkeeping for records awaiting on-chain confirmation
pub mod memory;
pub mod models;
pub mod repository;

pub use memory::InMemoryStore;
pub use repository::{LedgerRepository, RecordStore};
