//! Start-up, routing and lifecycle of the HTTP server

mod bootstrap;
mod health;
mod server;
mod shutdown;

pub use bootstrap::*;
pub use health::*;
pub use server::*;
pub use shutdown::*;
