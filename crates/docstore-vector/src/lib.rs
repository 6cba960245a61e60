//! Vector-store engines and the collection manager.
//!
//! `LanceStore` persists collections as LanceDB tables; `MemoryStore` keeps
//! them in process. `CollectionManager` sits on top of either.

pub mod lance;
pub mod manager;
pub mod memory;
pub mod schema;

pub use lance::LanceStore;
pub use manager::{open_engine, with_manager, AddAck, CollectionHandle, CollectionManager, DeleteAck};
pub use memory::MemoryStore;
