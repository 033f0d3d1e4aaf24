use crate::models::{NewTransfer, Transfer};
use anyhow::Result;
use sqlx::PgPool;

/// Cache a discovered transfer. Insert-if-absent on (chain_id, tx_hash):
/// overlapping or retried scans of the same range must never double-insert.
pub async fn insert_transfer_if_absent(pool: &PgPool, transfer: &NewTransfer) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transfers (chain_id, tx_hash, from_address, to_address, amount, block_number, block_timestamp)
        VALUES ($1, LOWER($2), LOWER($3), LOWER($4), $5, $6, $7)
        ON CONFLICT (chain_id, tx_hash) DO NOTHING
        "#,
    )
    .bind(transfer.chain_id)
    .bind(&transfer.tx_hash)
    .bind(&transfer.from_address)
    .bind(&transfer.to_address)
    .bind(&transfer.amount)
    .bind(transfer.block_number)
    .bind(transfer.block_timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// All cached transfers sent by `sender` to `recipient` on one chain,
/// newest block first.
pub async fn list_transfers_from_to(
    pool: &PgPool,
    chain_id: i64,
    sender: &str,
    recipient: &str,
) -> Result<Vec<Transfer>> {
    let transfers = sqlx::query_as::<_, Transfer>(
        r#"
        SELECT id, chain_id, tx_hash, from_address, to_address, amount, block_number, block_timestamp, created_at
        FROM transfers
        WHERE chain_id = $1 AND from_address = LOWER($2) AND to_address = LOWER($3)
        ORDER BY block_number DESC
        "#,
    )
    .bind(chain_id)
    .bind(sender)
    .bind(recipient)
    .fetch_all(pool)
    .await?;

    Ok(transfers)
}
