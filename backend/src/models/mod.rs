pub mod transfers;

pub use transfers::{NewTransfer, RelationshipCursor, Transfer};
