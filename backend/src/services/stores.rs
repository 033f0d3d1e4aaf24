use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::db;
use crate::models::{NewTransfer, Transfer};

/// Read-only view of the platform's purchases and reviews for one wallet
/// pair. Purchases gate scanning (no purchase, no relationship) and supply
/// the exclusion set; reviews drive the `reviewed` flag.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn earliest_purchase_block(&self, buyer: &str, seller: &str) -> Result<Option<i64>>;

    async fn purchase_tx_hashes(&self, buyer: &str, seller: &str) -> Result<Vec<String>>;

    async fn reviewed_tx_hashes(
        &self,
        reviewer: &str,
        counterparty: &str,
        chain_id: i64,
    ) -> Result<Vec<String>>;
}

/// Persistence for discovered transfers and scan cursors. Implementations
/// must make `insert_if_absent` idempotent on (chain_id, tx_hash) and
/// `advance_cursor` monotonic, so concurrent overlapping scans stay safe.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn insert_if_absent(&self, transfer: &NewTransfer) -> Result<()>;

    /// Cached transfers from `sender` to `recipient`, newest block first.
    async fn transfers_from_to(
        &self,
        chain_id: i64,
        sender: &str,
        recipient: &str,
    ) -> Result<Vec<Transfer>>;

    async fn last_scanned_block(
        &self,
        buyer: &str,
        seller: &str,
        chain_id: i64,
    ) -> Result<Option<i64>>;

    async fn advance_cursor(
        &self,
        buyer: &str,
        seller: &str,
        chain_id: i64,
        to_block: i64,
    ) -> Result<()>;
}

/// Postgres-backed store used by the server and the ops binaries.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn earliest_purchase_block(&self, buyer: &str, seller: &str) -> Result<Option<i64>> {
        db::purchases::earliest_purchase_block(&self.pool, buyer, seller).await
    }

    async fn purchase_tx_hashes(&self, buyer: &str, seller: &str) -> Result<Vec<String>> {
        db::purchases::list_purchase_tx_hashes(&self.pool, buyer, seller).await
    }

    async fn reviewed_tx_hashes(
        &self,
        reviewer: &str,
        counterparty: &str,
        chain_id: i64,
    ) -> Result<Vec<String>> {
        db::purchases::list_reviewed_tx_hashes(&self.pool, reviewer, counterparty, chain_id).await
    }
}

#[async_trait]
impl TransferStore for PgStore {
    async fn insert_if_absent(&self, transfer: &NewTransfer) -> Result<()> {
        db::transfers::insert_transfer_if_absent(&self.pool, transfer).await
    }

    async fn transfers_from_to(
        &self,
        chain_id: i64,
        sender: &str,
        recipient: &str,
    ) -> Result<Vec<Transfer>> {
        db::transfers::list_transfers_from_to(&self.pool, chain_id, sender, recipient).await
    }

    async fn last_scanned_block(
        &self,
        buyer: &str,
        seller: &str,
        chain_id: i64,
    ) -> Result<Option<i64>> {
        db::cursors::get_last_scanned_block(&self.pool, buyer, seller, chain_id).await
    }

    async fn advance_cursor(
        &self,
        buyer: &str,
        seller: &str,
        chain_id: i64,
        to_block: i64,
    ) -> Result<()> {
        db::cursors::advance_cursor(&self.pool, buyer, seller, chain_id, to_block).await
    }
}
