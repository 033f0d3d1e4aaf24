use alloy::primitives::Address;
use anyhow::Result;
use clap::Parser;
use opengig::{
    constants::is_valid_ethereum_address,
    db::{get_db_pool, DatabaseConfig},
    services::{timeline, PgStore, RpcChainClient},
    utils::{config::Config, init_logging},
};
use tracing::info;

/// Run one full bidirectional reconciliation scan for a wallet pair and
/// print the merged timeline as JSON.
#[derive(Debug, Parser)]
struct Args {
    /// Buyer wallet address (the viewer of the timeline)
    #[arg(long)]
    buyer: String,

    /// Seller wallet address
    #[arg(long)]
    seller: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    if !is_valid_ethereum_address(&args.buyer) {
        anyhow::bail!("Invalid buyer address: {}", args.buyer);
    }
    if !is_valid_ethereum_address(&args.seller) {
        anyhow::bail!("Invalid seller address: {}", args.seller);
    }

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    let store = PgStore::new(pool.clone());
    let chain = RpcChainClient::new(config.rpc_url.clone());
    let token: Address = config.payment_token_address.parse()?;

    info!(
        "Scanning relationship {} <-> {} on chain {}",
        args.buyer, args.seller, config.chain_id
    );

    let view = timeline::refresh_between(
        &chain,
        &store,
        token,
        config.chain_id,
        &args.buyer,
        &args.seller,
    )
    .await?;

    info!(
        "Scan complete: {} transfers, hasMore: {}",
        view.transfers.len(),
        view.has_more
    );
    if let Some(ref error) = view.error {
        tracing::warn!("Scan degraded: {}", error);
    }

    for (buyer, seller) in [(&args.buyer, &args.seller), (&args.seller, &args.buyer)] {
        if let Some(cursor) =
            opengig::db::cursors::get_cursor(&pool, buyer, seller, config.chain_id).await?
        {
            info!(
                "Cursor {} -> {}: scanned up to block {}",
                cursor.buyer_address, cursor.seller_address, cursor.last_scanned_block
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
