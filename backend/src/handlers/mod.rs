pub mod transfers;

pub use transfers::{get_transfers, refresh_transfers};
