pub mod config;
pub mod debounce;
pub mod error;
pub mod pagination;
pub mod progress;
pub mod query;
