//! API types for metadata lookups

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{serialization::u256_string_serialization, QuoteComparison, RouteLeg};

// -------------------------
// | Best-Effort Lookups |
// -------------------------

/// The outcome of a lookup on a non-critical path
///
/// A failed lookup degrades rather than erroring, but the caller can still
/// tell an empty result from a failed one
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum BestEffort<T> {
    /// The lookup succeeded
    Fetched(T),
    /// The lookup failed for the given reason
    Degraded(String),
}

impl<T> BestEffort<T> {
    /// Whether the lookup failed
    pub fn is_degraded(&self) -> bool {
        matches!(self, BestEffort::Degraded(_))
    }

    /// The fetched value, if any
    pub fn fetched(self) -> Option<T> {
        match self {
            BestEffort::Fetched(value) => Some(value),
            BestEffort::Degraded(_) => None,
        }
    }
}

impl<T: Default> BestEffort<T> {
    /// The fetched value, or the default value if the lookup degraded
    pub fn unwrap_or_default(self) -> T {
        self.fetched().unwrap_or_default()
    }
}

// ----------
// | Tokens |
// ----------

/// A token supported by the aggregator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListEntry {
    /// The token contract address
    pub address: String,
    /// The token symbol
    pub symbol: String,
    /// The token name
    pub name: String,
    /// The number of decimals in the token's atomic unit
    pub decimals: u8,
    /// A URL for the token's logo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Token metadata read from the token contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// The token symbol
    pub symbol: String,
    /// The token name
    pub name: String,
    /// The number of decimals in the token's atomic unit
    pub decimals: u8,
}

/// A wallet's balance of a token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// The token contract address, or the native sentinel
    pub token: String,
    /// The balance in atomic units
    #[serde(with = "u256_string_serialization")]
    pub atomic: U256,
    /// The balance in whole units
    pub formatted: String,
}

// ----------
// | Chains |
// ----------

/// A chain supported by the aggregator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// The chain ID
    pub chain_id: u64,
    /// The chain name
    pub name: String,
    /// The contract that must be approved to spend tokens on this chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve_address: Option<String>,
}

// ----------------
// | Transactions |
// ----------------

/// Where a transaction history record came from
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistorySource {
    /// The chain node's receipt
    Node,
    /// The aggregator's transaction history
    Aggregator,
}

/// A historical record of a transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistoryRecord {
    /// The transaction hash
    pub tx_hash: String,
    /// The transaction status as reported by the source
    pub status: String,
    /// The block the transaction was mined in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// The gas used by the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// The sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// The recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Where the record came from
    pub source: HistorySource,
}

// ------------------
// | Route Analysis |
// ------------------

/// The risk level assigned to a route
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low price impact over a simple route
    Low,
    /// Moderate price impact or a complex route
    Medium,
    /// High price impact, or moderate impact over a complex route
    High,
}

impl RiskLevel {
    /// The next-higher risk level, saturating at `High`
    pub fn raise(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }
}

/// An analysis of the route the aggregator proposes for a swap
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAnalysis {
    /// The first leg of the proposed route
    pub best_route: Option<RouteLeg>,
    /// The competing quotes the aggregator compared against
    pub all_routes: Vec<QuoteComparison>,
    /// The assessed risk of the route
    pub risk: RiskLevel,
}
