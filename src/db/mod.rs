pub mod policy;
pub mod sqlite_backend;

pub use sqlite_backend::SqliteBackend;
