use alloy::primitives::Address;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::is_valid_ethereum_address,
    services::{timeline, PgStore, RpcChainClient, TimelineView},
    utils::Config,
};

#[derive(Debug, Deserialize)]
pub struct TransfersQuery {
    pub buyer: String,
    pub seller: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub buyer: String,
    pub seller: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

fn internal_error(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

fn validate_pair(buyer: &str, seller: &str) -> Result<(String, String), (StatusCode, Json<ApiError>)> {
    if !is_valid_ethereum_address(buyer) {
        return Err(bad_request("Invalid buyer address format"));
    }
    if !is_valid_ethereum_address(seller) {
        return Err(bad_request("Invalid seller address format"));
    }
    Ok((buyer.to_lowercase(), seller.to_lowercase()))
}

/// Instant view of the cached payment history between two wallets.
/// Never fetches logs from the chain.
pub async fn get_transfers(
    State((store, chain, config)): State<(PgStore, RpcChainClient, Config)>,
    Query(query): Query<TransfersQuery>,
) -> Result<Json<TimelineView>, (StatusCode, Json<ApiError>)> {
    let (buyer, seller) = validate_pair(&query.buyer, &query.seller)?;

    let view = timeline::cached_between(&chain, &store, config.chain_id, &buyer, &seller)
        .await
        .map_err(|e| {
            tracing::error!("Cached transfer read failed for {} / {}: {}", buyer, seller, e);
            internal_error("Failed to read cached transfers")
        })?;

    Ok(Json(view))
}

/// User-triggered refresh: scans both directions of the relationship for new
/// on-chain transfers. A degraded scan (node unavailable) still returns 200
/// with cached data and an `error` field in the body; only persistence
/// failures surface as 500s.
pub async fn refresh_transfers(
    State((store, chain, config)): State<(PgStore, RpcChainClient, Config)>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TimelineView>, (StatusCode, Json<ApiError>)> {
    let (buyer, seller) = validate_pair(&req.buyer, &req.seller)?;

    let token: Address = config
        .payment_token_address
        .parse()
        .map_err(|_| internal_error("Invalid payment token address in config"))?;

    let view = timeline::refresh_between(&chain, &store, token, config.chain_id, &buyer, &seller)
        .await
        .map_err(|e| {
            tracing::error!("Transfer refresh failed for {} / {}: {}", buyer, seller, e);
            internal_error("Failed to refresh transfers")
        })?;

    Ok(Json(view))
}
