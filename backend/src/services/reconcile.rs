use alloy::primitives::{Address, U256};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::constants::{MAX_BLOCK_RANGE, MIN_CONFIRMATIONS, MIN_TRANSFER_AMOUNT_UNITS};
use crate::models::NewTransfer;
use crate::services::chain::{resolve_block_timestamps, ChainReader};
use crate::services::stores::{RelationshipStore, TransferStore};

/// One cached transfer as served to clients. Amounts and block numbers are
/// decimal strings; a 256-bit amount never fits a float.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferView {
    pub tx_hash: String,
    pub amount: String,
    pub block_number: String,
    pub timestamp: DateTime<Utc>,
    pub reviewed: bool,
}

/// Result of a single-direction scan or cache read.
#[derive(Debug, Clone)]
pub struct DirectionView {
    pub transfers: Vec<TransferView>,
    pub has_more: bool,
    pub error: Option<String>,
}

impl DirectionView {
    fn empty() -> Self {
        Self {
            transfers: vec![],
            has_more: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from_block: u64,
    pub to_block: u64,
    /// More confirmed history remains beyond `to_block`
    pub has_more: bool,
}

/// Compute the next scan window. Returns None when the relationship is
/// already scanned up to the confirmed frontier (latest − MIN_CONFIRMATIONS);
/// a single window never spans more than MAX_BLOCK_RANGE blocks.
pub fn compute_scan_window(last_scanned_block: u64, latest_block: u64) -> Option<ScanWindow> {
    let max_confirmed_block = latest_block.saturating_sub(MIN_CONFIRMATIONS);
    let from_block = last_scanned_block + 1;
    if from_block > max_confirmed_block {
        return None;
    }

    let to_block = std::cmp::min(from_block + MAX_BLOCK_RANGE - 1, max_confirmed_block);

    Some(ScanWindow {
        from_block,
        to_block,
        has_more: to_block < max_confirmed_block,
    })
}

/// Scan one direction (buyer paid seller) of a relationship: advance the
/// cursor through the next window of confirmed blocks, cache any new
/// transfers, and return the full cached view.
///
/// Chain failures degrade to the cached view with an `error` annotation;
/// persistence failures are hard errors (a transfer seen but not durably
/// recorded must fail the scan so the range is retried).
pub async fn scan_direction<C, S>(
    chain: &C,
    store: &S,
    token: Address,
    chain_id: i64,
    buyer: &str,
    seller: &str,
) -> Result<DirectionView>
where
    C: ChainReader + ?Sized,
    S: RelationshipStore + TransferStore + ?Sized,
{
    let buyer = buyer.to_lowercase();
    let seller = seller.to_lowercase();

    // No platform purchase between the pair means no relationship, and we
    // never scan chain history for arbitrary wallet pairs.
    let Some(earliest_block) = store.earliest_purchase_block(&buyer, &seller).await? else {
        return Ok(DirectionView::empty());
    };

    // Purchase settlements are the same economic event as their transfer and
    // must not show up twice.
    let excluded: HashSet<String> = store
        .purchase_tx_hashes(&buyer, &seller)
        .await?
        .into_iter()
        .map(|hash| hash.to_lowercase())
        .collect();

    let last_scanned_block = match store.last_scanned_block(&buyer, &seller, chain_id).await? {
        Some(block) => block.max(0) as u64,
        // First scan starts one before the earliest purchase so that block
        // itself falls inside the window.
        None => (earliest_block.max(0) as u64).saturating_sub(1),
    };

    let latest_block = match chain.latest_block().await {
        Ok(block) => block,
        Err(e) => {
            warn!("Serving cached transfers for {} -> {}: {}", buyer, seller, e);
            return assemble_view(store, chain_id, &buyer, &seller, true, Some(e.to_string()))
                .await;
        }
    };

    let Some(window) = compute_scan_window(last_scanned_block, latest_block) else {
        // Fully scanned up to the confirmed frontier
        return assemble_view(store, chain_id, &buyer, &seller, false, None).await;
    };

    let buyer_address: Address = buyer.parse()?;
    let seller_address: Address = seller.parse()?;

    info!(
        "Scanning blocks {} to {} for {} -> {} (hasMore: {})",
        window.from_block, window.to_block, buyer, seller, window.has_more
    );

    let logs = match chain
        .transfer_logs(
            token,
            buyer_address,
            seller_address,
            window.from_block,
            window.to_block,
        )
        .await
    {
        Ok(logs) => logs,
        Err(e) => {
            warn!("Serving cached transfers for {} -> {}: {}", buyer, seller, e);
            return assemble_view(store, chain_id, &buyer, &seller, true, Some(e.to_string()))
                .await;
        }
    };

    let min_amount = U256::from(MIN_TRANSFER_AMOUNT_UNITS);
    let fresh: Vec<_> = logs
        .into_iter()
        .filter(|log| {
            log.block_number.is_some()
                && log.amount >= min_amount
                && !excluded.contains(&log.tx_hash.to_lowercase())
        })
        .collect();

    let blocks: Vec<u64> = fresh.iter().filter_map(|log| log.block_number).collect();
    let timestamps = resolve_block_timestamps(chain, &blocks).await;

    for log in &fresh {
        let Some(block_number) = log.block_number else {
            continue;
        };
        let block_timestamp = timestamps
            .get(&block_number)
            .copied()
            .unwrap_or_else(Utc::now);

        store
            .insert_if_absent(&NewTransfer {
                chain_id,
                tx_hash: log.tx_hash.to_lowercase(),
                from_address: buyer.clone(),
                to_address: seller.clone(),
                amount: log.amount.to_string(),
                block_number: block_number as i64,
                block_timestamp,
            })
            .await?;
    }

    // Even a scan that found nothing records "checked up to to_block".
    store
        .advance_cursor(&buyer, &seller, chain_id, window.to_block as i64)
        .await?;

    info!(
        "Cached {} new transfers for {} -> {}, cursor now {}",
        fresh.len(),
        buyer,
        seller,
        window.to_block
    );

    assemble_view(store, chain_id, &buyer, &seller, window.has_more, None).await
}

/// Cache-only read for instant page loads: never fetches logs. `has_more` is
/// estimated from the cursor against the confirmed frontier; a failed height
/// fetch optimistically assumes more data exists.
pub async fn cached_direction<C, S>(
    chain: &C,
    store: &S,
    chain_id: i64,
    buyer: &str,
    seller: &str,
) -> Result<DirectionView>
where
    C: ChainReader + ?Sized,
    S: RelationshipStore + TransferStore + ?Sized,
{
    let buyer = buyer.to_lowercase();
    let seller = seller.to_lowercase();

    if store
        .earliest_purchase_block(&buyer, &seller)
        .await?
        .is_none()
    {
        return Ok(DirectionView::empty());
    }

    let has_more = match store.last_scanned_block(&buyer, &seller, chain_id).await? {
        // Never scanned
        None => true,
        Some(last_scanned) => match chain.latest_block().await {
            Ok(latest) => (last_scanned.max(0) as u64) < latest.saturating_sub(MIN_CONFIRMATIONS),
            Err(e) => {
                warn!("Assuming unscanned history for {} -> {}: {}", buyer, seller, e);
                true
            }
        },
    };

    assemble_view(store, chain_id, &buyer, &seller, has_more, None).await
}

/// Re-read the cached transfer set and annotate each entry with whether the
/// buyer has already reviewed it.
async fn assemble_view<S>(
    store: &S,
    chain_id: i64,
    buyer: &str,
    seller: &str,
    has_more: bool,
    error: Option<String>,
) -> Result<DirectionView>
where
    S: RelationshipStore + TransferStore + ?Sized,
{
    let reviewed: HashSet<String> = store
        .reviewed_tx_hashes(buyer, seller, chain_id)
        .await?
        .into_iter()
        .map(|hash| hash.to_lowercase())
        .collect();

    let transfers = store
        .transfers_from_to(chain_id, buyer, seller)
        .await?
        .into_iter()
        .map(|t| {
            let is_reviewed = reviewed.contains(&t.tx_hash.to_lowercase());
            TransferView {
                tx_hash: t.tx_hash,
                amount: t.amount,
                block_number: t.block_number.to_string(),
                timestamp: t.block_timestamp,
                reviewed: is_reviewed,
            }
        })
        .collect();

    Ok(DirectionView {
        transfers,
        has_more,
        error,
    })
}
