pub mod file_store;
pub mod in_memory;

pub use file_store::JsonFileStore;
pub use in_memory::InMemoryKeyValueStore;
