//! Route risk analysis and transaction history lookups

use alloy_primitives::TxHash;
use dex_swap_api::{
    BestEffort, HistorySource, Quote, RiskLevel, RouteAnalysis, SwapParams,
    TransactionHistoryRecord,
};
use itertools::Itertools;
use tracing::{debug, warn};

use super::SwapOrchestrator;
use crate::error::SwapError;

/// Price impact above which a route is high risk, in percent
const HIGH_RISK_PRICE_IMPACT: f64 = 5.0;
/// Price impact above which a route is medium risk, in percent
const MEDIUM_RISK_PRICE_IMPACT: f64 = 1.0;
/// The number of route legs above which risk is raised one level
const MAX_LOW_RISK_LEGS: usize = 2;

/// Classify the risk of executing a quote
///
/// Price impact sets the base level and a route split across many legs
/// raises it one step
pub fn assess_risk(quote: &Quote) -> RiskLevel {
    let impact = quote.price_impact_percent.abs();
    let base = if impact > HIGH_RISK_PRICE_IMPACT {
        RiskLevel::High
    } else if impact > MEDIUM_RISK_PRICE_IMPACT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if quote.route.len() > MAX_LOW_RISK_LEGS {
        base.raise()
    } else {
        base
    }
}

/// A one-line description of a quote's route, e.g.
/// `60% WBNB->USDT via PancakeSwap V3 | 40% WBNB->USDT via Uniswap V3`
pub fn route_summary(quote: &Quote) -> String {
    quote
        .route
        .iter()
        .map(|leg| {
            let hops = leg
                .hops
                .iter()
                .map(|hop| {
                    let dexes = hop.dexes.iter().map(|d| d.dex_name.as_str()).join("+");
                    format!("{}->{} via {dexes}", hop.from_symbol, hop.to_symbol)
                })
                .join(", ");
            format!("{}% {hops}", leg.percent)
        })
        .join(" | ")
}

impl SwapOrchestrator {
    /// Quote a swap and summarize its route and risk
    pub async fn analyze_route(&self, params: &SwapParams) -> Result<RouteAnalysis, SwapError> {
        let quote = self.get_quote(params).await?;
        let risk = assess_risk(&quote);
        debug!(?risk, route = %route_summary(&quote), "analyzed route");

        Ok(RouteAnalysis {
            best_route: quote.route.first().cloned(),
            all_routes: quote.alternatives,
            risk,
        })
    }

    /// Look up a transaction, preferring the node's receipt and falling back
    /// to the aggregator's history
    pub async fn get_transaction_history(
        &self,
        tx_hash: TxHash,
    ) -> BestEffort<Option<TransactionHistoryRecord>> {
        match self.gateway.get_receipt(tx_hash).await {
            Ok(Some(receipt)) => {
                let status = if receipt.status { "success" } else { "failed" };
                return BestEffort::Fetched(Some(TransactionHistoryRecord {
                    tx_hash: format!("{:#x}", receipt.tx_hash),
                    status: status.to_string(),
                    block_number: receipt.block_number,
                    gas_used: Some(receipt.gas_used),
                    from: Some(format!("{:#x}", receipt.from)),
                    to: receipt.to.map(|to| format!("{to:#x}")),
                    source: HistorySource::Node,
                }));
            },
            Ok(None) => debug!("no receipt for {tx_hash:#x}, asking the aggregator"),
            Err(e) => warn!("receipt lookup for {tx_hash:#x} failed, asking the aggregator: {e}"),
        }

        self.aggregator.get_transaction_history(self.config.chain_id, tx_hash).await
    }
}
