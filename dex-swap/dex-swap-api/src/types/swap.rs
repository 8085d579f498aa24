//! API types for swaps

use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{
    serialization::{
        address_string_serialization, bytes_string_serialization, u256_string_serialization,
    },
    types::{is_native_token, BSC_CHAIN_ID},
};

/// The default slippage tolerance, in percent
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;

// --------------
// | Parameters |
// --------------

/// The parameters of a quote or swap request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    /// The token being sold
    #[serde(rename = "fromTokenAddress", with = "address_string_serialization")]
    pub from_token: Address,
    /// The token being bought
    #[serde(rename = "toTokenAddress", with = "address_string_serialization")]
    pub to_token: Address,
    /// The amount of the sell token, in atomic units
    #[serde(with = "u256_string_serialization")]
    pub amount: U256,
    /// The slippage tolerance in percent, e.g. `0.5` for 0.5%
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_percent: Option<f64>,
    /// The wallet that sells and receives the tokens
    #[serde(with = "address_string_serialization")]
    pub user_wallet_address: Address,
    /// The chain on which the swap executes
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

/// The chain ID assumed when a request omits one
fn default_chain_id() -> u64 {
    BSC_CHAIN_ID
}

impl SwapParams {
    /// Construct swap parameters on BSC with the default slippage
    pub fn new(from_token: Address, to_token: Address, amount: U256, wallet: Address) -> Self {
        Self {
            from_token,
            to_token,
            amount,
            slippage_percent: None,
            user_wallet_address: wallet,
            chain_id: BSC_CHAIN_ID,
        }
    }

    /// Set the slippage tolerance, in percent
    pub fn with_slippage_percent(mut self, slippage_percent: f64) -> Self {
        self.slippage_percent = Some(slippage_percent);
        self
    }

    /// The slippage tolerance in percent, falling back to the default
    pub fn slippage_percent_or_default(&self) -> f64 {
        self.slippage_percent.unwrap_or(DEFAULT_SLIPPAGE_PERCENT)
    }

    /// Whether the swap sells the chain's native token
    pub fn sells_native_token(&self) -> bool {
        is_native_token(&self.from_token)
    }
}

// ----------
// | Quotes |
// ----------

/// A token as it appears in a quote
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteToken {
    /// The token contract address
    #[serde(with = "address_string_serialization")]
    pub address: Address,
    /// The token symbol
    pub symbol: String,
    /// The number of decimals in the token's atomic unit
    pub decimals: u8,
    /// The aggregator's USD unit price for the token, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,
}

/// A liquidity source's share of a single hop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexShare {
    /// The name of the DEX
    pub dex_name: String,
    /// The percentage of the hop routed through this DEX
    pub percent: f64,
}

/// A single hop of a route, from one token to another
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHop {
    /// The symbol of the token entering the hop
    pub from_symbol: String,
    /// The symbol of the token leaving the hop
    pub to_symbol: String,
    /// The DEXs the hop is split across
    pub dexes: Vec<DexShare>,
}

/// One leg of a split route, an ordered sequence of hops carrying a
/// percentage of the sell amount
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    /// The percentage of the sell amount routed through this leg
    pub percent: f64,
    /// The hops of the leg, in order
    pub hops: Vec<RouteHop>,
}

/// A competing quote the aggregator compared against
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteComparison {
    /// The name of the DEX quoting
    pub dex_name: String,
    /// The amount of the buy token the DEX would return, in whole units
    pub amount_out: String,
    /// The trade fee the DEX would charge, in USD
    pub trade_fee: String,
}

/// A price quote for a swap
///
/// Quotes are fetched fresh for every request and never cached
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// The token being sold
    pub from_token: QuoteToken,
    /// The token being bought
    pub to_token: QuoteToken,
    /// The amount sold, in atomic units
    #[serde(with = "u256_string_serialization")]
    pub from_amount: U256,
    /// The amount bought, in atomic units
    #[serde(with = "u256_string_serialization")]
    pub to_amount: U256,
    /// The estimated price impact of the swap, in percent
    pub price_impact_percent: f64,
    /// The aggregator's estimate of the gas fee
    pub estimated_gas_fee: String,
    /// The trade fee in USD, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_fee: Option<String>,
    /// The route the swap takes
    pub route: Vec<RouteLeg>,
    /// The quotes the aggregator compared against
    #[serde(default)]
    pub alternatives: Vec<QuoteComparison>,
}

// -----------
// | Results |
// -----------

/// The status of a submitted transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Not yet mined, or not found within the polling budget
    Pending,
    /// Mined and executed successfully
    Success,
    /// Mined and reverted
    Failed,
}

/// The result of an approval check and, if needed, approval
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResult {
    /// Whether an approval transaction was required
    pub need_approval: bool,
    /// The hash of the approval transaction, if one was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

/// The transaction submitted for a swap
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransaction {
    /// The sending wallet
    #[serde(with = "address_string_serialization")]
    pub from: Address,
    /// The aggregator router contract
    #[serde(with = "address_string_serialization")]
    pub to: Address,
    /// The swap calldata
    #[serde(with = "bytes_string_serialization")]
    pub data: Bytes,
    /// The native value attached to the transaction
    #[serde(with = "u256_string_serialization")]
    pub value: U256,
    /// The gas limit of the transaction
    pub gas_limit: u64,
    /// The gas price of the transaction, in wei
    #[serde(with = "u256_string_serialization")]
    pub gas_price: U256,
    /// The nonce of the transaction
    pub nonce: u64,
    /// The minimum amount of the buy token the swap accepts, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_receive_amount: Option<String>,
}

/// The result of a swap
///
/// Every stage of a swap reports failure through this shape rather than an
/// error, so `error` carries a human-readable message when `success` is false
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    /// Whether the swap succeeded
    pub success: bool,
    /// The hash of the swap transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// The hash of the approval sent ahead of the swap, if one was needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<TxHash>,
    /// The order ID of the swap; the transaction hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// The status of the swap transaction when the result was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    /// The quote the swap executed against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    /// The submitted transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<SwapTransaction>,
    /// A human-readable error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwapResult {
    /// A failed swap result with the given message
    pub fn failure<T: ToString>(message: T) -> Self {
        Self { success: false, error: Some(message.to_string()), ..Default::default() }
    }
}

/// The result of monitoring a transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorResult {
    /// The status of the transaction
    pub status: TransactionStatus,
    /// The hash of the monitored transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Why the transaction failed or is still pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
    /// The block the transaction was mined in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// The gas used by the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}
