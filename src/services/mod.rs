//! Business logic services.

pub mod import;
pub mod local_storage;
pub mod storage;

pub use import::ImportService;
pub use local_storage::LocalStorage;
pub use storage::{ObjectStore, S3Storage, open_store};
