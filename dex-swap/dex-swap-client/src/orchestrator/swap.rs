//! The end-to-end swap flow

use alloy_primitives::TxHash;
use dex_swap_api::{SwapParams, SwapResult, SwapTransaction, TransactionStatus};
use tracing::{error, info, instrument, warn};

use super::{SwapOrchestrator, TransactionClass};
use crate::error::SwapError;

impl SwapOrchestrator {
    /// Execute a swap, approving the sell token first if needed
    ///
    /// Never returns an error: every failure is reported as an unsuccessful
    /// result carrying a human-readable message. A swap with no receipt after
    /// the grace period is reported as a pending success
    #[instrument(
        skip_all,
        fields(from = %params.from_token, to = %params.to_token, amount = %params.amount)
    )]
    pub async fn execute_swap(&self, params: &SwapParams) -> SwapResult {
        let mut approval_tx_hash = None;
        match self.try_execute_swap(params, &mut approval_tx_hash).await {
            Ok(res) => res,
            Err(e) => {
                error!("swap failed: {e}");
                SwapResult { approval_tx_hash, ..SwapResult::failure(e.user_message()) }
            },
        }
    }

    /// The swap flow, with failures before broadcast returned as errors
    ///
    /// The hash of a sent approval is recorded in `approval_tx_hash` as soon as
    /// it is known, so that it survives a later failure
    async fn try_execute_swap(
        &self,
        params: &SwapParams,
        approval_tx_hash: &mut Option<TxHash>,
    ) -> Result<SwapResult, SwapError> {
        let params = self.validate_params(params)?;

        // A fresh quote precedes the approval so that bad pairs fail before
        // any transaction is sent
        let quote =
            self.aggregator.get_quote(&params).await.map_err(SwapError::into_quote_error)?;
        info!(
            to_amount = %quote.to_amount,
            price_impact = quote.price_impact_percent,
            "quoted swap"
        );

        if !params.sells_native_token() {
            let approval = self.approve_token(params.from_token, params.amount).await?;
            if let Some(hash) = approval.tx_hash {
                info!("approved {} via {hash:#x}", params.from_token);
            }
            *approval_tx_hash = approval.tx_hash;
        }

        let payload =
            self.aggregator.get_swap_payload(&params).await.map_err(SwapError::into_quote_error)?;
        let (tx_hash, request) = self
            .send_transaction(TransactionClass::Swap, payload.to, payload.data, payload.value)
            .await?;
        info!("swap submitted as {tx_hash:#x}");

        let transaction = SwapTransaction {
            from: request.from,
            to: request.to,
            data: request.data,
            value: request.value,
            gas_limit: request.gas_limit,
            gas_price: request.gas_price,
            nonce: request.nonce,
            min_receive_amount: payload.min_receive_amount,
        };
        let mut res = SwapResult {
            success: true,
            tx_hash: Some(tx_hash),
            approval_tx_hash: *approval_tx_hash,
            order_id: Some(format!("{tx_hash:#x}")),
            status: Some(TransactionStatus::Pending),
            quote: Some(payload.quote),
            transaction: Some(transaction),
            error: None,
        };

        self.sleeper.sleep(self.config.confirmation_grace).await;
        match self.gateway.get_receipt(tx_hash).await {
            Ok(Some(receipt)) if receipt.status => {
                res.status = Some(TransactionStatus::Success);
            },
            Ok(Some(_)) => {
                warn!("swap {tx_hash:#x} reverted");
                res.success = false;
                res.status = Some(TransactionStatus::Failed);
                res.error = Some(SwapError::broadcast("execution reverted").user_message());
            },
            Ok(None) => info!("swap {tx_hash:#x} not yet mined"),
            Err(e) => warn!("receipt lookup for {tx_hash:#x} failed: {e}"),
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{atomic::Ordering, Arc},
        time::Duration,
    };

    use alloy_primitives::{Address, U256};
    use dex_swap_api::NATIVE_TOKEN_ADDRESS;

    use super::*;
    use crate::{
        orchestrator::test_utils::orchestrator,
        test_helpers::{
            broadcast_hash, receipt, test_wallet, MockAggregator, MockChainGateway,
            RecordingSleeper, ROUTER, USDT,
        },
    };

    /// Parameters selling `amount` of `from` for `to`
    fn params(from: Address, to: Address, amount: u64) -> SwapParams {
        SwapParams::new(from, to, U256::from(amount), test_wallet())
    }

    /// Selling the native token sends exactly one transaction, with the
    /// amount attached as value, and never touches allowances
    #[tokio::test]
    async fn test_native_swap_confirmed() {
        let aggregator = Arc::new(MockAggregator::default());
        let gateway = Arc::new(MockChainGateway::confirming());
        let sleeper = Arc::new(RecordingSleeper::default());
        let orch = orchestrator(&aggregator, &gateway, &sleeper);

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(res.success, "swap failed: {:?}", res.error);
        assert_eq!(res.tx_hash, Some(broadcast_hash(0)));
        assert_eq!(res.order_id, Some(format!("{:#x}", broadcast_hash(0))));
        assert_eq!(res.approval_tx_hash, None);
        assert_eq!(res.status, Some(TransactionStatus::Success));
        assert_eq!(res.quote.unwrap().to_amount, U256::from(600_000u64));

        let broadcasts = gateway.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].to, ROUTER);
        assert_eq!(broadcasts[0].value, U256::from(1_000u64));
        assert_eq!(broadcasts[0].gas_limit, 300_000);
        assert_eq!(broadcasts[0].gas_price, U256::from(1_200_000_000u64));

        assert_eq!(gateway.allowance_calls.load(Ordering::SeqCst), 0);
        assert_eq!(aggregator.approval_calls.load(Ordering::SeqCst), 0);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(3)]);
    }

    #[tokio::test]
    async fn test_token_swap_with_sufficient_allowance() {
        let aggregator = Arc::new(MockAggregator::default());
        let gateway = Arc::new(MockChainGateway::confirming());
        gateway.set_allowance(U256::MAX);
        let orch = orchestrator(&aggregator, &gateway, &Arc::new(RecordingSleeper::default()));

        let res = orch.execute_swap(&params(USDT, NATIVE_TOKEN_ADDRESS, 1_000)).await;

        assert!(res.success);
        assert_eq!(aggregator.approval_calls.load(Ordering::SeqCst), 0);
        let broadcasts = gateway.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].value, U256::ZERO);
    }

    /// A short allowance sends the approval first, then the swap with the
    /// next nonce
    #[tokio::test]
    async fn test_token_swap_approves_first() {
        let aggregator = Arc::new(MockAggregator::default());
        let gateway = Arc::new(MockChainGateway::confirming());
        let orch = orchestrator(&aggregator, &gateway, &Arc::new(RecordingSleeper::default()));

        let res = orch.execute_swap(&params(USDT, NATIVE_TOKEN_ADDRESS, 1_000)).await;

        assert!(res.success);
        assert_eq!(res.approval_tx_hash, Some(broadcast_hash(0)));
        assert_eq!(res.tx_hash, Some(broadcast_hash(1)));

        let broadcasts = gateway.broadcasts();
        assert_eq!(broadcasts.len(), 2);
        let summary: Vec<_> =
            broadcasts.iter().map(|tx| (tx.to, tx.nonce, tx.gas_limit)).collect();
        assert_eq!(summary, vec![(USDT, 0, 100_000), (ROUTER, 1, 300_000)]);
        assert!(broadcasts.iter().all(|tx| tx.gas_price == U256::from(1_200_000_000u64)));
    }

    /// A node rejection yields a translated message, never the raw one
    #[tokio::test]
    async fn test_insufficient_funds_message() {
        let gateway = Arc::new(MockChainGateway::default());
        let raw = "insufficient funds for gas * price + value";
        gateway.reject_broadcasts(raw);
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(!res.success);
        assert_eq!(res.tx_hash, None);
        let error = res.error.unwrap();
        assert!(error.contains("balance"));
        assert!(!error.contains(raw));
    }

    #[tokio::test]
    async fn test_quote_failure_sends_nothing() {
        let aggregator = Arc::new(MockAggregator::default());
        *aggregator.quote_error.lock().unwrap() = Some(SwapError::Provider {
            code: "82000".into(),
            message: "Insufficient liquidity".into(),
        });
        let gateway = Arc::new(MockChainGateway::default());
        let orch = orchestrator(&aggregator, &gateway, &Arc::new(RecordingSleeper::default()));

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(!res.success);
        assert!(res.error.unwrap().contains("82000"));
        assert_eq!(aggregator.swap_calls.load(Ordering::SeqCst), 0);
        assert!(gateway.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_message() {
        let aggregator = Arc::new(MockAggregator::default());
        *aggregator.quote_error.lock().unwrap() =
            Some(SwapError::auth("status code 401: Invalid Authority"));
        let orch = orchestrator(
            &aggregator,
            &Arc::new(MockChainGateway::default()),
            &Arc::new(RecordingSleeper::default()),
        );

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(!res.success);
        assert!(res.error.unwrap().contains("credentials"));
    }

    /// A reverted swap keeps its hash and reports failure
    #[tokio::test]
    async fn test_reverted_swap() {
        let gateway = Arc::new(MockChainGateway::default());
        gateway.push_receipt(Ok(Some(receipt(broadcast_hash(0), false))));
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(!res.success);
        assert_eq!(res.tx_hash, Some(broadcast_hash(0)));
        assert_eq!(res.status, Some(TransactionStatus::Failed));
        assert!(res.error.unwrap().contains("slippage"));
    }

    /// A swap not mined within the grace period is a pending success, looked
    /// up exactly once
    #[tokio::test]
    async fn test_unmined_swap_is_pending() {
        let gateway = Arc::new(MockChainGateway::default());
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await;

        assert!(res.success);
        assert_eq!(res.status, Some(TransactionStatus::Pending));
        assert_eq!(res.error, None);
        assert_eq!(gateway.receipt_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_params_fail_without_calls() {
        let aggregator = Arc::new(MockAggregator::default());
        let orch = orchestrator(
            &aggregator,
            &Arc::new(MockChainGateway::default()),
            &Arc::new(RecordingSleeper::default()),
        );

        let res = orch.execute_swap(&params(NATIVE_TOKEN_ADDRESS, USDT, 0)).await;

        assert!(!res.success);
        assert!(res.error.unwrap().starts_with("Invalid swap parameters"));
        assert_eq!(aggregator.quote_calls.load(Ordering::SeqCst), 0);
    }
}
