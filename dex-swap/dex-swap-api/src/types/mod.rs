//! API types for the dex swap client

pub mod metadata;
pub mod swap;

pub use metadata::*;
pub use swap::*;

use alloy_primitives::{address, Address};

// -------------
// | Constants |
// -------------

/// The chain ID of BNB Smart Chain, the only chain the client operates on
pub const BSC_CHAIN_ID: u64 = 56;

/// The sentinel address used by the aggregator to denote the chain's native
/// token (BNB on BSC)
pub const NATIVE_TOKEN_ADDRESS: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// The symbol of the native token on BSC
pub const NATIVE_TOKEN_SYMBOL: &str = "BNB";
/// The number of decimals of the native token
pub const NATIVE_TOKEN_DECIMALS: u8 = 18;

/// Whether the given address is the native token sentinel
pub fn is_native_token(address: &Address) -> bool {
    *address == NATIVE_TOKEN_ADDRESS
}

/// Whether the given string is a valid token address, i.e. the native
/// sentinel or a `0x`-prefixed 40 hex character address
pub fn is_valid_token_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };

    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}
