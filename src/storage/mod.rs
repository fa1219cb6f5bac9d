pub mod backend;

pub use backend::{BackendError, Rows, StorageBackend};
