use alloy::primitives::Address;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use crate::services::chain::ChainReader;
use crate::services::reconcile::{cached_direction, scan_direction, DirectionView, TransferView};
use crate::services::stores::{RelationshipStore, TransferStore};

/// The merged two-direction payment history served to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub transfers: Vec<TransferView>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full refresh: scan both directions of the relationship concurrently and
/// merge them into one timeline. `wallet` is the viewer; it is the buyer of
/// the forward direction and the seller of the reverse one.
pub async fn refresh_between<C, S>(
    chain: &C,
    store: &S,
    token: Address,
    chain_id: i64,
    wallet: &str,
    counterparty: &str,
) -> Result<TimelineView>
where
    C: ChainReader + ?Sized,
    S: RelationshipStore + TransferStore + ?Sized,
{
    let (forward, reverse) = tokio::join!(
        scan_direction(chain, store, token, chain_id, wallet, counterparty),
        scan_direction(chain, store, token, chain_id, counterparty, wallet),
    );

    Ok(merge_directions(forward?, reverse?))
}

/// Instant read: cache-only in both directions, no log fetches.
pub async fn cached_between<C, S>(
    chain: &C,
    store: &S,
    chain_id: i64,
    wallet: &str,
    counterparty: &str,
) -> Result<TimelineView>
where
    C: ChainReader + ?Sized,
    S: RelationshipStore + TransferStore + ?Sized,
{
    let (forward, reverse) = tokio::join!(
        cached_direction(chain, store, chain_id, wallet, counterparty),
        cached_direction(chain, store, chain_id, counterparty, wallet),
    );

    Ok(merge_directions(forward?, reverse?))
}

/// Merge both directions: dedup by case-insensitive transaction hash (first
/// occurrence wins; the directions are disjoint by construction, the guard
/// covers contrived inputs), sort by numeric block number descending.
pub fn merge_directions(forward: DirectionView, reverse: DirectionView) -> TimelineView {
    let has_more = forward.has_more || reverse.has_more;
    let error = forward.error.or(reverse.error);

    let mut seen = HashSet::new();
    let mut transfers: Vec<TransferView> = forward
        .transfers
        .into_iter()
        .chain(reverse.transfers)
        .filter(|t| seen.insert(t.tx_hash.to_lowercase()))
        .collect();

    // Block numbers are string-encoded on the wire; compare numerically
    transfers.sort_by_key(|t| std::cmp::Reverse(t.block_number.parse::<u64>().unwrap_or(0)));

    TimelineView {
        transfers,
        has_more,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reconcile::tests::{log, MemStore, MockChain, BUYER, CHAIN_ID, SELLER};
    use chrono::Utc;

    fn view(tx_hash: &str, block_number: &str) -> TransferView {
        TransferView {
            tx_hash: tx_hash.to_string(),
            amount: "20000000".to_string(),
            block_number: block_number.to_string(),
            timestamp: Utc::now(),
            reviewed: false,
        }
    }

    fn direction(transfers: Vec<TransferView>, has_more: bool, error: Option<&str>) -> DirectionView {
        DirectionView {
            transfers,
            has_more,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn merge_dedups_by_hash_case_insensitively_first_wins() {
        let forward = direction(vec![view("0xAAA", "100")], false, None);
        let reverse = direction(vec![view("0xaaa", "100"), view("0xbbb", "200")], false, None);

        let merged = merge_directions(forward, reverse);

        assert_eq!(merged.transfers.len(), 2);
        // First occurrence (forward's casing) survives
        assert!(merged.transfers.iter().any(|t| t.tx_hash == "0xAAA"));
        assert!(!merged.transfers.iter().any(|t| t.tx_hash == "0xaaa"));
    }

    #[test]
    fn merge_sorts_numerically_descending() {
        // "900" > "1500" lexicographically; the sort must be numeric
        let forward = direction(vec![view("0xa", "900")], false, None);
        let reverse = direction(vec![view("0xb", "1500"), view("0xc", "80")], false, None);

        let merged = merge_directions(forward, reverse);

        let blocks: Vec<&str> = merged
            .transfers
            .iter()
            .map(|t| t.block_number.as_str())
            .collect();
        assert_eq!(blocks, vec!["1500", "900", "80"]);
    }

    #[test]
    fn merge_ors_has_more() {
        let merged = merge_directions(
            direction(vec![], false, None),
            direction(vec![], true, None),
        );
        assert!(merged.has_more);

        let merged = merge_directions(
            direction(vec![], false, None),
            direction(vec![], false, None),
        );
        assert!(!merged.has_more);
    }

    #[test]
    fn merge_prefers_forward_error() {
        let merged = merge_directions(
            direction(vec![], false, Some("forward failed")),
            direction(vec![], false, Some("reverse failed")),
        );
        assert_eq!(merged.error.as_deref(), Some("forward failed"));

        let merged = merge_directions(
            direction(vec![], false, None),
            direction(vec![], false, Some("reverse failed")),
        );
        assert_eq!(merged.error.as_deref(), Some("reverse failed"));
    }

    #[tokio::test]
    async fn refresh_merges_both_directions_into_one_timeline() {
        let store = MemStore::with_purchase(BUYER, SELLER, "0xp1", 100);
        store.set_cursor(BUYER, SELLER, 1000);
        // The counterparty has also paid the viewer at least once
        store
            .state
            .lock()
            .unwrap()
            .purchases
            .push((SELLER.to_string(), BUYER.to_string(), "0xp2".to_string(), 100));
        store.set_cursor(SELLER, BUYER, 1000);
        store.seed_transfer("0xback", SELLER, BUYER, 1700);

        let chain = MockChain::new(Some(2000), vec![log("0xfwd", 1500, 20_000_000)]);
        let token = crate::constants::USDC_CONTRACT_ADDRESS.parse().unwrap();

        let timeline = refresh_between(&chain, &store, token, CHAIN_ID, BUYER, SELLER)
            .await
            .unwrap();

        // Note: the mock returns its logs for both directions, so the same
        // hash arrives twice and must be deduplicated.
        let hashes: Vec<&str> = timeline
            .transfers
            .iter()
            .map(|t| t.tx_hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["0xback", "0xfwd"]);
        assert!(!timeline.has_more);
        assert!(timeline.error.is_none());
    }
}
