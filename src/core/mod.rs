pub mod config;
pub mod middleware;
pub mod shared;
pub mod store;
pub mod urls;
