//! Infrastructure layer implementations.

pub mod api;
pub mod persistence;

pub use api::{ApiClientConfig, HttpApiClient, RefreshPolicy};
pub use persistence::{FileAuthPersistence, MemoryAuthPersistence};
