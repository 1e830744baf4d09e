pub mod durable_store;

pub use durable_store::{DurableStore, FileStore, MemoryStore};
