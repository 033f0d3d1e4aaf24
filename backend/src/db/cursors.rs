use crate::models::RelationshipCursor;
use anyhow::Result;
use sqlx::PgPool;

/// Full cursor row for a directed (buyer, seller) pair, if one exists.
pub async fn get_cursor(
    pool: &PgPool,
    buyer: &str,
    seller: &str,
    chain_id: i64,
) -> Result<Option<RelationshipCursor>> {
    let cursor = sqlx::query_as::<_, RelationshipCursor>(
        r#"
        SELECT buyer_address, seller_address, chain_id, last_scanned_block, updated_at
        FROM relationship_cursors
        WHERE buyer_address = LOWER($1) AND seller_address = LOWER($2) AND chain_id = $3
        "#,
    )
    .bind(buyer)
    .bind(seller)
    .bind(chain_id)
    .fetch_optional(pool)
    .await?;

    Ok(cursor)
}

/// Last block fully scanned for a directed (buyer, seller) pair, if any.
pub async fn get_last_scanned_block(
    pool: &PgPool,
    buyer: &str,
    seller: &str,
    chain_id: i64,
) -> Result<Option<i64>> {
    let block = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT last_scanned_block
        FROM relationship_cursors
        WHERE buyer_address = LOWER($1) AND seller_address = LOWER($2) AND chain_id = $3
        "#,
    )
    .bind(buyer)
    .bind(seller)
    .bind(chain_id)
    .fetch_optional(pool)
    .await?;

    Ok(block)
}

/// Record that the relationship has been scanned up to `to_block`.
/// GREATEST keeps the cursor monotonic: a stale overlapping scan that
/// finishes late can never move it backwards.
pub async fn advance_cursor(
    pool: &PgPool,
    buyer: &str,
    seller: &str,
    chain_id: i64,
    to_block: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO relationship_cursors (buyer_address, seller_address, chain_id, last_scanned_block, updated_at)
        VALUES (LOWER($1), LOWER($2), $3, $4, NOW())
        ON CONFLICT (buyer_address, seller_address, chain_id)
        DO UPDATE SET
            last_scanned_block = GREATEST(relationship_cursors.last_scanned_block, EXCLUDED.last_scanned_block),
            updated_at = NOW()
        "#,
    )
    .bind(buyer)
    .bind(seller)
    .bind(chain_id)
    .bind(to_block)
    .execute(pool)
    .await?;

    Ok(())
}
