//! Configuration for the dex swap client

use std::{fmt, str::FromStr, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{address, Address};
use dex_swap_api::{is_valid_token_address, BSC_CHAIN_ID, DEFAULT_SLIPPAGE_PERCENT};
use reqwest::Url;

use crate::error::SwapError;

// -------------
// | Constants |
// -------------

/// The default base URL of the OKX DEX aggregator API
pub const DEFAULT_AGGREGATOR_BASE_URL: &str = "https://web3.okx.com";
/// The default timeout for aggregator requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// The aggregator's approval spender on BSC
pub const BSC_SPENDER_ADDRESS: Address = address!("0x9b9efa5Efa731EA9Bbb0369E91fA17Abf249CFD4");
/// The gas limit used for approval transactions
pub const DEFAULT_APPROVE_GAS_LIMIT: u64 = 100_000;
/// The gas limit used for swap transactions
pub const DEFAULT_SWAP_GAS_LIMIT: u64 = 300_000;
/// The delay after a swap broadcast before its receipt is first fetched
pub const DEFAULT_CONFIRMATION_GRACE: Duration = Duration::from_secs(3);

// ---------
// | Types |
// ---------

/// The credentials required for authenticating with the OKX API
#[derive(Clone)]
pub struct OkxCredentials {
    /// The API key to use for requests
    pub api_key: String,
    /// The secret w/ which to compute request HMACs
    pub secret_key: String,
    /// The passphrase used to create the API key
    pub passphrase: String,
    /// The project ID under which the API key was created
    pub project_id: String,
}

impl fmt::Debug for OkxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkxCredentials")
            .field("api_key", &self.api_key)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl OkxCredentials {
    /// Check that every credential is present
    pub fn validate(&self) -> Result<(), SwapError> {
        let fields = [
            ("api key", &self.api_key),
            ("secret key", &self.secret_key),
            ("passphrase", &self.passphrase),
            ("project id", &self.project_id),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SwapError::config(format!("missing aggregator {name}")));
            }
        }

        Ok(())
    }
}

/// The configuration of a swap client
///
/// Constructed once and passed to each component; there is no process-wide
/// configuration
#[derive(Clone)]
pub struct SwapConfig {
    /// The aggregator credentials
    pub credentials: OkxCredentials,
    /// The base URL of the aggregator API
    pub aggregator_base_url: String,
    /// The timeout applied to each aggregator request
    pub request_timeout: Duration,
    /// The URL of the chain's JSON-RPC node
    pub rpc_url: String,
    /// The wallet that signs and sends transactions
    pub wallet_address: Address,
    /// The key that signs transactions
    pub signer: PrivateKeySigner,
    /// The chain on which the client operates
    pub chain_id: u64,
    /// The contract approved to spend tokens for swaps
    pub spender_address: Address,
    /// The gas limit used for approval transactions
    pub approve_gas_limit: u64,
    /// The gas limit used for swap transactions
    pub swap_gas_limit: u64,
    /// The slippage tolerance used when a request omits one, in percent
    pub default_slippage_percent: f64,
    /// The delay after a swap broadcast before its receipt is first fetched
    pub confirmation_grace: Duration,
}

impl fmt::Debug for SwapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapConfig")
            .field("credentials", &self.credentials)
            .field("aggregator_base_url", &self.aggregator_base_url)
            .field("rpc_url", &self.rpc_url)
            .field("wallet_address", &self.wallet_address)
            .field("chain_id", &self.chain_id)
            .field("spender_address", &self.spender_address)
            .finish_non_exhaustive()
    }
}

impl SwapConfig {
    /// Construct a validated configuration with default settings
    pub fn new(
        credentials: OkxCredentials,
        rpc_url: String,
        wallet_address: &str,
        private_key: &str,
    ) -> Result<Self, SwapError> {
        if !is_valid_token_address(wallet_address) {
            return Err(SwapError::config(format!("malformed wallet address: {wallet_address}")));
        }
        let wallet_address = Address::from_str(wallet_address).map_err(SwapError::config)?;
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|_| SwapError::config("private key is not a valid secp256k1 key"))?;

        let config = Self {
            credentials,
            aggregator_base_url: DEFAULT_AGGREGATOR_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rpc_url,
            wallet_address,
            signer,
            chain_id: BSC_CHAIN_ID,
            spender_address: BSC_SPENDER_ADDRESS,
            approve_gas_limit: DEFAULT_APPROVE_GAS_LIMIT,
            swap_gas_limit: DEFAULT_SWAP_GAS_LIMIT,
            default_slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            confirmation_grace: DEFAULT_CONFIRMATION_GRACE,
        };
        config.validate()?;

        Ok(config)
    }

    /// Set the aggregator base URL
    pub fn with_aggregator_base_url(mut self, url: String) -> Self {
        self.aggregator_base_url = url;
        self
    }

    /// Set the chain ID
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Set the confirmation grace delay
    pub fn with_confirmation_grace(mut self, grace: Duration) -> Self {
        self.confirmation_grace = grace;
        self
    }

    /// Check the configuration for missing or malformed values
    pub fn validate(&self) -> Result<(), SwapError> {
        self.credentials.validate()?;

        Url::parse(&self.aggregator_base_url)
            .map_err(|e| SwapError::config(format!("invalid aggregator base URL: {e}")))?;
        Url::parse(&self.rpc_url).map_err(|e| SwapError::config(format!("invalid RPC URL: {e}")))?;

        if self.signer.address() != self.wallet_address {
            return Err(SwapError::config(format!(
                "private key derives {:#x}, not the configured wallet {:#x}",
                self.signer.address(),
                self.wallet_address
            )));
        }

        if self.chain_id != BSC_CHAIN_ID {
            return Err(SwapError::config(format!(
                "unsupported chain {}, only BSC ({BSC_CHAIN_ID}) is supported",
                self.chain_id
            )));
        }

        if self.approve_gas_limit == 0 || self.swap_gas_limit == 0 {
            return Err(SwapError::config("gas limits must be non-zero"));
        }

        let slippage = self.default_slippage_percent;
        if !(slippage > 0.0 && slippage <= 100.0) {
            return Err(SwapError::config(format!("slippage {slippage}% out of range")));
        }

        Ok(())
    }
}
