use anyhow::Result;
use sqlx::PgPool;

// The purchases and reviews tables are written by the marketplace subsystem;
// reconciliation only reads them.

/// Block number of the earliest platform purchase between a buyer and seller.
/// None means the pair has no relationship and nothing should be scanned.
pub async fn earliest_purchase_block(
    pool: &PgPool,
    buyer: &str,
    seller: &str,
) -> Result<Option<i64>> {
    let block = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        SELECT MIN(block_number)
        FROM purchases
        WHERE LOWER(buyer_address) = LOWER($1) AND LOWER(seller_address) = LOWER($2)
        "#,
    )
    .bind(buyer)
    .bind(seller)
    .fetch_one(pool)
    .await?;

    Ok(block)
}

/// Transaction hashes of all platform purchases between a buyer and seller.
/// These settle the same economic event as their on-chain transfer and must
/// be excluded from transfer ingestion.
pub async fn list_purchase_tx_hashes(
    pool: &PgPool,
    buyer: &str,
    seller: &str,
) -> Result<Vec<String>> {
    let hashes = sqlx::query_scalar::<_, String>(
        r#"
        SELECT tx_hash
        FROM purchases
        WHERE LOWER(buyer_address) = LOWER($1) AND LOWER(seller_address) = LOWER($2)
        "#,
    )
    .bind(buyer)
    .bind(seller)
    .fetch_all(pool)
    .await?;

    Ok(hashes)
}

/// Transaction hashes the reviewer has already reviewed for this counterparty.
pub async fn list_reviewed_tx_hashes(
    pool: &PgPool,
    reviewer: &str,
    counterparty: &str,
    chain_id: i64,
) -> Result<Vec<String>> {
    let hashes = sqlx::query_scalar::<_, String>(
        r#"
        SELECT tx_hash
        FROM reviews
        WHERE LOWER(reviewer_address) = LOWER($1)
          AND LOWER(counterparty_address) = LOWER($2)
          AND chain_id = $3
        "#,
    )
    .bind(reviewer)
    .bind(counterparty)
    .bind(chain_id)
    .fetch_all(pool)
    .await?;

    Ok(hashes)
}
