//! Helpers for the dex swap client

use alloy_primitives::U256;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::SwapError;

/// The numerator of the gas price multiplier
const GAS_PRICE_MULTIPLIER_NUM: u64 = 12;
/// The denominator of the gas price multiplier
const GAS_PRICE_MULTIPLIER_DENOM: u64 = 10;

/// Scale a node-reported gas price by 1.2x, rounding half up
pub fn bump_gas_price(gas_price: U256) -> U256 {
    let num = U256::from(GAS_PRICE_MULTIPLIER_NUM);
    let denom = U256::from(GAS_PRICE_MULTIPLIER_DENOM);
    let half = denom / U256::from(2u64);

    gas_price.saturating_mul(num).saturating_add(half) / denom
}

/// The number of decimal places slippage fractions are sent with
const SLIPPAGE_FRACTION_DECIMALS: usize = 8;

/// Format a slippage percentage as the fraction the aggregator expects, e.g.
/// `0.007` for 0.7%
///
/// The fraction is rounded to a fixed number of places and trailing zeros are
/// trimmed, so float error in the division never reaches the request
pub fn format_slippage_fraction(percent: f64) -> String {
    let fraction = format!("{:.*}", SLIPPAGE_FRACTION_DECIMALS, percent / 100.0);
    fraction.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Handle an HTTP response, deserializing the body on success
///
/// A 401 or 403 is an auth error; any other non-success status is an HTTP
/// error carrying the status and body
pub async fn handle_http_response<T: DeserializeOwned>(response: Response) -> Result<T, SwapError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(SwapError::auth(format!("status code {}: {body}", status.as_u16())));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SwapError::http(format!("status code {}: {body}", status.as_u16())));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(SwapError::parse)
}
