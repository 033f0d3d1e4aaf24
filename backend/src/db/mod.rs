pub mod connection;
pub mod migrations;
pub mod cursors;
pub mod purchases;
pub mod transfers;

pub use connection::{get_db_pool, DatabaseConfig};
