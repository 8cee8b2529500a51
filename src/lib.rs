pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod demo;
pub mod infrastructure;

pub use crate::core::errors::ForumError;
pub use crate::core::services::ForumService;
pub use crate::infrastructure::cache::in_memory::InMemoryCache;
pub use crate::infrastructure::logging::in_memory::InMemoryLogging;
pub use crate::infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests;
