mod error;
mod memory;
mod record;
mod rest;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::ScamLogRecord;
pub use rest::{RestStore, RestStoreConfig};
pub use traits::{AuthScope, ScamLogStore};
