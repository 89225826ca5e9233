pub mod enums;
pub mod models;
pub mod schema;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod utils;

pub use enums::*;
pub use utils::{create_conn, DbPool};
