use anyhow::Result;
use std::env;
use crate::constants::{BASE_MAINNET_CHAIN_ID, DEFAULT_SERVER_PORT, USDC_CONTRACT_ADDRESS};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rpc_url: String,
    pub chain_id: i64,
    pub payment_token_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            rpc_url: env::var("RPC_URL")
                .map_err(|_| anyhow::anyhow!("RPC_URL must be set"))?,
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| BASE_MAINNET_CHAIN_ID.to_string())
                .parse()
                .unwrap_or(BASE_MAINNET_CHAIN_ID),
            payment_token_address: env::var("PAYMENT_TOKEN_ADDRESS")
                .unwrap_or_else(|_| USDC_CONTRACT_ADDRESS.to_string()),
        })
    }
}
