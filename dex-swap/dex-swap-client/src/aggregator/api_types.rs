//! OKX API type definitions
//!
//! Responses are parsed into these schemas at the client boundary and
//! converted into the caller-facing types; nothing past this module handles
//! untyped JSON

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use std::str::FromStr;

use alloy_primitives::{Address, Bytes, U256};
use dex_swap_api::{
    ChainInfo, DexShare, HistorySource, Quote, QuoteComparison, QuoteToken, RouteHop, RouteLeg,
    TokenListEntry, TransactionHistoryRecord,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SwapError;

/// The response code the OKX API uses to signal success
pub const OKX_SUCCESS_CODE: &str = "0";

// ------------
// | Envelope |
// ------------

/// The envelope wrapping every OKX API response
#[derive(Debug, Deserialize)]
pub struct OkxApiResponse<T> {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> OkxApiResponse<T> {
    /// Unwrap the envelope, mapping a non-zero code to a provider error
    pub fn into_data(self) -> Result<Vec<T>, SwapError> {
        if self.code != OKX_SUCCESS_CODE {
            return Err(SwapError::Provider { code: self.code, message: self.msg });
        }

        Ok(self.data)
    }

    /// Unwrap the envelope, expecting at least one data element
    pub fn into_first(self) -> Result<T, SwapError> {
        self.into_data()?
            .into_iter()
            .next()
            .ok_or_else(|| SwapError::parse("aggregator returned no data"))
    }
}

// ------------
// | Requests |
// ------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxSwapRequestParams {
    pub chain_id: String,
    pub from_token_address: String,
    pub to_token_address: String,
    pub amount: String,
    pub user_wallet_address: String,
    pub slippage: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxApproveRequestParams {
    pub chain_id: String,
    pub token_contract_address: String,
    pub approve_amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxChainQuery {
    pub chain_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxHistoryRequest {
    pub chain_index: String,
    pub tx_hash_list: Vec<String>,
}

// ---------------------
// | Swap & Approval |
// ---------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxSwapResponse {
    pub router_result: OkxRouterResult,
    pub tx: Option<OkxSwapTx>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxRouterResult {
    #[serde(default)]
    pub dex_router_list: Vec<OkxDexRouter>,
    #[serde(default)]
    pub estimate_gas_fee: String,
    pub from_token: OkxToken,
    pub to_token: OkxToken,
    pub from_token_amount: String,
    pub to_token_amount: String,
    #[serde(default)]
    pub price_impact_percentage: Option<String>,
    #[serde(default)]
    pub quote_compare_list: Vec<OkxQuoteCompare>,
    #[serde(default)]
    pub trade_fee: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxToken {
    #[serde(deserialize_with = "string_or_number")]
    pub decimal: String,
    pub token_contract_address: String,
    pub token_symbol: String,
    #[serde(default)]
    pub token_unit_price: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxDexRouter {
    #[serde(default, deserialize_with = "string_or_number")]
    pub router_percent: String,
    #[serde(default)]
    pub sub_router_list: Vec<OkxSubRouter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxSubRouter {
    #[serde(default)]
    pub dex_protocol: Vec<OkxDexProtocol>,
    pub from_token: OkxToken,
    pub to_token: OkxToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxDexProtocol {
    pub dex_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub percent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxQuoteCompare {
    pub dex_name: String,
    #[serde(default, alias = "receiveAmount")]
    pub amount_out: String,
    #[serde(default)]
    pub trade_fee: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxSwapTx {
    pub data: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub min_receive_amount: Option<String>,
    pub to: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxApproveResponse {
    pub data: String,
    pub dex_contract_address: String,
}

// ------------
// | Metadata |
// ------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxTokenListEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub decimals: String,
    pub token_contract_address: String,
    #[serde(default)]
    pub token_logo_url: Option<String>,
    #[serde(default)]
    pub token_name: String,
    pub token_symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxChainEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub chain_id: String,
    #[serde(default)]
    pub chain_name: String,
    #[serde(default)]
    pub dex_token_approve_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxHistoryRecord {
    #[serde(alias = "txhash")]
    pub tx_hash: String,
    #[serde(default)]
    pub tx_status: String,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub from_details: Vec<OkxAddressDetail>,
    #[serde(default)]
    pub to_details: Vec<OkxAddressDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OkxAddressDetail {
    pub address: String,
}

// ---------------
// | Conversions |
// ---------------

impl OkxToken {
    /// Convert to the caller-facing token shape
    pub fn to_quote_token(&self) -> Result<QuoteToken, SwapError> {
        Ok(QuoteToken {
            address: parse_address(&self.token_contract_address)?,
            symbol: self.token_symbol.clone(),
            decimals: self.decimal.parse().map_err(SwapError::parse)?,
            unit_price: self.token_unit_price.clone().filter(|p| !p.is_empty()),
        })
    }
}

impl OkxRouterResult {
    /// Convert the router result into a quote
    pub fn to_quote(&self) -> Result<Quote, SwapError> {
        let route = self.dex_router_list.iter().map(OkxDexRouter::to_route_leg).collect();
        let alternatives = self
            .quote_compare_list
            .iter()
            .map(|c| QuoteComparison {
                dex_name: c.dex_name.clone(),
                amount_out: c.amount_out.clone(),
                trade_fee: c.trade_fee.clone(),
            })
            .collect();

        Ok(Quote {
            from_token: self.from_token.to_quote_token()?,
            to_token: self.to_token.to_quote_token()?,
            from_amount: parse_u256(&self.from_token_amount)?,
            to_amount: parse_u256(&self.to_token_amount)?,
            price_impact_percent: parse_price_impact(self.price_impact_percentage.as_deref())?,
            estimated_gas_fee: self.estimate_gas_fee.clone(),
            trade_fee: self.trade_fee.clone().filter(|f| !f.is_empty()),
            route,
            alternatives,
        })
    }
}

impl OkxDexRouter {
    /// Convert a router entry into a route leg
    fn to_route_leg(&self) -> RouteLeg {
        let hops = self
            .sub_router_list
            .iter()
            .map(|sub| RouteHop {
                from_symbol: sub.from_token.token_symbol.clone(),
                to_symbol: sub.to_token.token_symbol.clone(),
                dexes: sub
                    .dex_protocol
                    .iter()
                    .map(|p| DexShare {
                        dex_name: p.dex_name.clone(),
                        percent: p.percent.parse().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        RouteLeg { percent: self.router_percent.parse().unwrap_or_default(), hops }
    }
}

impl From<OkxTokenListEntry> for TokenListEntry {
    fn from(entry: OkxTokenListEntry) -> Self {
        TokenListEntry {
            address: entry.token_contract_address,
            symbol: entry.token_symbol,
            name: entry.token_name,
            decimals: entry.decimals.parse().unwrap_or_default(),
            logo_url: entry.token_logo_url.filter(|u| !u.is_empty()),
        }
    }
}

impl OkxChainEntry {
    /// Convert to the caller-facing chain shape, skipping malformed entries
    pub fn to_chain_info(self) -> Option<ChainInfo> {
        let chain_id = self.chain_id.parse().ok()?;
        Some(ChainInfo {
            chain_id,
            name: self.chain_name,
            approve_address: self.dex_token_approve_address.filter(|a| !a.is_empty()),
        })
    }
}

impl From<OkxHistoryRecord> for TransactionHistoryRecord {
    fn from(record: OkxHistoryRecord) -> Self {
        TransactionHistoryRecord {
            tx_hash: record.tx_hash,
            status: record.tx_status,
            block_number: record.height.and_then(|h| h.parse().ok()),
            gas_used: record.gas_used.and_then(|g| g.parse().ok()),
            from: record.from_details.into_iter().next().map(|d| d.address),
            to: record.to_details.into_iter().next().map(|d| d.address),
            source: HistorySource::Aggregator,
        }
    }
}

// -----------
// | Helpers |
// -----------

/// Parse an address returned by the aggregator
pub fn parse_address(s: &str) -> Result<Address, SwapError> {
    Address::from_str(s).map_err(|e| SwapError::parse(format!("invalid address {s}: {e}")))
}

/// Parse hex calldata returned by the aggregator
pub fn parse_bytes(s: &str) -> Result<Bytes, SwapError> {
    Bytes::from_str(s).map_err(|e| SwapError::parse(format!("invalid calldata: {e}")))
}

/// Parse a decimal integer amount returned by the aggregator
pub fn parse_u256(s: &str) -> Result<U256, SwapError> {
    U256::from_str_radix(s, 10).map_err(|e| SwapError::parse(format!("invalid amount {s}: {e}")))
}

/// Parse an optional decimal amount, treating a missing or empty value as
/// zero
pub fn parse_u256_or_zero(s: Option<&str>) -> Result<U256, SwapError> {
    match s {
        None | Some("") => Ok(U256::ZERO),
        Some(s) => parse_u256(s),
    }
}

/// Parse the aggregator's price impact as a non-negative magnitude in percent
fn parse_price_impact(s: Option<&str>) -> Result<f64, SwapError> {
    match s {
        None | Some("") => Ok(0.0),
        Some(s) => {
            let impact: f64 = s
                .trim()
                .parse()
                .map_err(|_| SwapError::parse(format!("invalid price impact {s}")))?;
            Ok(impact.abs())
        },
    }
}

/// Deserialize a field the API sends as either a string or a number
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(d)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}
