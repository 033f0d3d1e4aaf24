pub mod chain;
pub mod reconcile;
pub mod stores;
pub mod timeline;

pub use chain::{ChainError, ChainReader, RpcChainClient, TransferLog};
pub use reconcile::{DirectionView, TransferView};
pub use stores::PgStore;
pub use timeline::TimelineView;
