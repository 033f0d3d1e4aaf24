// =============================================================================
// OpenGig Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// CONTRACT ADDRESSES
// =============================================================================

/// USDC contract address on Base mainnet (the payment token we reconcile)
pub const USDC_CONTRACT_ADDRESS: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

// =============================================================================
// BLOCKCHAIN CONFIGURATION
// =============================================================================

/// Base mainnet chain ID
pub const BASE_MAINNET_CHAIN_ID: i64 = 8453;

/// USDC uses 6 decimals
pub const USDC_DECIMALS: u32 = 6;

// =============================================================================
// EVENT TOPICS (for blockchain log queries)
// =============================================================================

/// ERC-20 Transfer(address,address,uint256) event topic
pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

// =============================================================================
// SCAN CONFIGURATION
// =============================================================================

/// Blocks that must follow a transaction's block before we treat it as final.
/// Blocks shallower than this are never scanned (reorg protection).
pub const MIN_CONFIRMATIONS: u64 = 12;

/// Maximum block span covered by a single scan request
pub const MAX_BLOCK_RANGE: u64 = 100_000;

/// Minimum transfer amount recorded as a payment, in USDC smallest units
/// (10 USDC at 6 decimals). Anything below is treated as dust.
pub const MIN_TRANSFER_AMOUNT_UNITS: u64 = 10_000_000;

// =============================================================================
// ADDRESS VALIDATION
// =============================================================================

/// Expected length of Ethereum address (including 0x prefix)
pub const ETHEREUM_ADDRESS_LENGTH: usize = 42;

/// Ethereum address prefix
pub const ETHEREUM_ADDRESS_PREFIX: &str = "0x";

/// Length of transaction hash (including 0x prefix)
pub const TX_HASH_LENGTH: usize = 66;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// HELPER FUNCTIONS FOR VALIDATION
// =============================================================================

/// Validates if a string is a valid Ethereum address format
pub fn is_valid_ethereum_address(address: &str) -> bool {
    address.starts_with(ETHEREUM_ADDRESS_PREFIX)
        && address.len() == ETHEREUM_ADDRESS_LENGTH
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates if a string is a valid transaction hash format
pub fn is_valid_tx_hash(hash: &str) -> bool {
    hash.starts_with(ETHEREUM_ADDRESS_PREFIX)
        && hash.len() == TX_HASH_LENGTH
        && hash[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_ethereum_address(USDC_CONTRACT_ADDRESS));
        assert!(!is_valid_ethereum_address("0x123"));
        assert!(!is_valid_ethereum_address(
            "833589fCD6eDb6E08f4c7C32D4f71b54bdA02913833589fCDa"
        ));
        assert!(!is_valid_ethereum_address(
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA0291g"
        ));
    }

    #[test]
    fn test_dust_threshold_is_ten_dollars() {
        assert_eq!(MIN_TRANSFER_AMOUNT_UNITS, 10 * 10u64.pow(USDC_DECIMALS));
    }

    #[test]
    fn test_tx_hash_validation() {
        assert!(is_valid_tx_hash(TRANSFER_EVENT_TOPIC));
        assert!(!is_valid_tx_hash("0xabc"));
    }
}
