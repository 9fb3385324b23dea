// storage/src/lib.rs

pub mod file_store;
pub mod kv;

pub use file_store::JsonFileStore;
pub use kv::{KeyValueStore, MemoryStore};
