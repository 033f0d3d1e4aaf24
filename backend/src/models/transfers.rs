use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A confirmed on-chain token movement between two wallets. Immutable once
/// cached; `(chain_id, tx_hash)` is unique at the schema level.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub chain_id: i64,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    /// Token amount in smallest units, as a decimal string (U256-safe)
    pub amount: String,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A transfer discovered by a scan, before it has been cached.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub chain_id: i64,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
}

/// Scan progress for one directed (buyer, seller) pair on one chain.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RelationshipCursor {
    pub buyer_address: String,
    pub seller_address: String,
    pub chain_id: i64,
    pub last_scanned_block: i64,
    pub updated_at: DateTime<Utc>,
}
