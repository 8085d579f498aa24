//! The swap orchestrator, which sequences quote, approval, swap, and
//! confirmation
//!
//! Every entry point that moves funds reports failure through its result
//! value; typed errors from the aggregator and the chain are converted to
//! human-readable messages here and nowhere else

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, Bytes, TxHash, U256};
use dex_swap_api::{
    amounts::from_atomic_units, is_native_token, BestEffort, ChainInfo, MonitorResult, Quote,
    SwapParams, TokenBalance, TokenListEntry, NATIVE_TOKEN_DECIMALS,
};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::{
    aggregator::{DexAggregator, OkxClient},
    chain::{ChainGateway, RpcChainGateway, TransactionRequest},
    config::SwapConfig,
    error::SwapError,
    helpers::bump_gas_price,
    monitor::{Sleeper, TokioSleeper, TransactionMonitor},
};

pub mod analysis;
pub mod approval;
pub mod swap;

/// The class of a transaction, which fixes its gas limit
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionClass {
    /// An ERC-20 approval
    Approval,
    /// An aggregator swap
    Swap,
}

/// Sequences swaps against an aggregator and a chain gateway
#[derive(Clone)]
pub struct SwapOrchestrator {
    /// The client configuration
    config: SwapConfig,
    /// The source of quotes and payloads
    aggregator: Arc<dyn DexAggregator>,
    /// The chain connection
    gateway: Arc<dyn ChainGateway>,
    /// Delays for the confirmation grace period
    sleeper: Arc<dyn Sleeper>,
    /// The nonce after the last one this orchestrator broadcast with
    ///
    /// Held from the nonce read until the node accepts the signed
    /// transaction. The node's `latest` count lags transactions still in the
    /// mempool, so the next nonce is the larger of the two
    next_nonce: Arc<Mutex<u64>>,
}

impl SwapOrchestrator {
    /// Create an orchestrator talking to the configured aggregator and node
    pub fn new(config: SwapConfig) -> Result<Self, SwapError> {
        let aggregator = Arc::new(OkxClient::new(&config)?);
        let gateway = Arc::new(RpcChainGateway::new(&config)?);

        Self::with_components(config, aggregator, gateway, Arc::new(TokioSleeper))
    }

    /// Create an orchestrator from explicit components
    pub fn with_components(
        config: SwapConfig,
        aggregator: Arc<dyn DexAggregator>,
        gateway: Arc<dyn ChainGateway>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, SwapError> {
        config.validate()?;
        Ok(Self { config, aggregator, gateway, sleeper, next_nonce: Arc::new(Mutex::new(0)) })
    }

    /// The client configuration
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// A monitor sharing this orchestrator's gateway
    pub fn monitor(&self) -> TransactionMonitor {
        TransactionMonitor::new(self.gateway.clone(), self.sleeper.clone())
    }

    // ----------
    // | Quotes |
    // ----------

    /// Get a quote for a swap
    #[instrument(
        skip_all,
        fields(from = %params.from_token, to = %params.to_token, amount = %params.amount)
    )]
    pub async fn get_quote(&self, params: &SwapParams) -> Result<Quote, SwapError> {
        let params = self.validate_params(params)?;
        self.aggregator.get_quote(&params).await.map_err(SwapError::into_quote_error)
    }

    // ----------------
    // | Transactions |
    // ----------------

    /// Poll for a transaction's receipt
    pub async fn monitor_transaction(
        &self,
        tx_hash: TxHash,
        max_attempts: u32,
        interval: Duration,
    ) -> MonitorResult {
        self.monitor().monitor(tx_hash, max_attempts, interval).await
    }

    /// Sign and broadcast a transaction from the configured wallet
    ///
    /// The gas price and nonce are read immediately before signing, with the
    /// gas price scaled by 1.2x and the gas limit fixed by the class. The
    /// nonce never falls behind one this orchestrator already broadcast with
    pub(crate) async fn send_transaction(
        &self,
        class: TransactionClass,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<(TxHash, TransactionRequest), SwapError> {
        let gas_limit = match class {
            TransactionClass::Approval => self.config.approve_gas_limit,
            TransactionClass::Swap => self.config.swap_gas_limit,
        };

        let mut next_nonce = self.next_nonce.lock().await;
        let gas_price = bump_gas_price(self.gateway.get_gas_price().await?);
        let chain_nonce = self.gateway.get_nonce(self.config.wallet_address).await?;
        let nonce = chain_nonce.max(*next_nonce);

        let request = TransactionRequest {
            from: self.config.wallet_address,
            to,
            data,
            value,
            gas_limit,
            gas_price,
            nonce,
        };

        debug!(?class, nonce, gas_price = %gas_price, gas_limit, "signing transaction");
        let tx_hash = self.gateway.sign_and_broadcast(&request).await?;
        *next_nonce = nonce + 1;

        Ok((tx_hash, request))
    }

    // ------------
    // | Metadata |
    // ------------

    /// The configured wallet's balance of a token, or of BNB for the native
    /// sentinel
    pub async fn get_balance(&self, token: Address) -> Result<TokenBalance, SwapError> {
        let wallet = self.config.wallet_address;
        let (atomic, decimals) = if is_native_token(&token) {
            (self.gateway.get_native_balance_wei(wallet).await?, NATIVE_TOKEN_DECIMALS)
        } else {
            let info = self.gateway.get_token_info(token).await?;
            (self.gateway.get_token_balance(token, wallet).await?, info.decimals)
        };

        Ok(TokenBalance {
            token: format!("{token:#x}"),
            atomic,
            formatted: from_atomic_units(atomic, decimals),
        })
    }

    /// The tokens the aggregator supports on the configured chain
    pub async fn get_supported_tokens(&self) -> BestEffort<Vec<TokenListEntry>> {
        self.aggregator.get_supported_tokens(self.config.chain_id).await
    }

    /// The chains the aggregator supports
    pub async fn get_supported_chains(&self) -> BestEffort<Vec<ChainInfo>> {
        self.aggregator.get_supported_chains().await
    }

    /// Whether the node is reachable
    pub async fn check_connection(&self) -> bool {
        self.gateway.check_connection().await
    }

    // -----------
    // | Helpers |
    // -----------

    /// Check swap parameters against the configuration, filling in the
    /// default slippage
    fn validate_params(&self, params: &SwapParams) -> Result<SwapParams, SwapError> {
        if params.user_wallet_address != self.config.wallet_address {
            return Err(SwapError::invalid_params(format!(
                "wallet {:#x} is not the configured wallet {:#x}",
                params.user_wallet_address, self.config.wallet_address
            )));
        }

        if params.chain_id != self.config.chain_id {
            return Err(SwapError::invalid_params(format!(
                "chain {} is not the configured chain {}",
                params.chain_id, self.config.chain_id
            )));
        }

        if params.from_token == params.to_token {
            return Err(SwapError::invalid_params("cannot swap a token for itself"));
        }

        if params.amount.is_zero() {
            return Err(SwapError::invalid_params("amount must be positive"));
        }

        let slippage = params.slippage_percent.unwrap_or(self.config.default_slippage_percent);
        if !(slippage > 0.0 && slippage <= 100.0) {
            return Err(SwapError::invalid_params(format!("slippage {slippage}% out of range")));
        }

        Ok(params.clone().with_slippage_percent(slippage))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{atomic::Ordering, Arc};

    use dex_swap_api::{SwapParams, NATIVE_TOKEN_ADDRESS};

    use super::{test_utils::orchestrator, *};
    use crate::test_helpers::{
        test_wallet, MockAggregator, MockChainGateway, RecordingSleeper, USDT,
    };

    /// Parameters selling `amount` of `from` for `to`
    fn params(from: Address, to: Address, amount: u64) -> SwapParams {
        SwapParams::new(from, to, U256::from(amount), test_wallet())
    }

    #[tokio::test]
    async fn test_quote_fills_default_slippage() {
        let aggregator = Arc::new(MockAggregator::default());
        let orch = orchestrator(
            &aggregator,
            &Arc::new(MockChainGateway::default()),
            &Arc::new(RecordingSleeper::default()),
        );

        let quote = orch.get_quote(&params(NATIVE_TOKEN_ADDRESS, USDT, 1_000)).await.unwrap();
        assert_eq!(quote.to_amount, U256::from(600_000u64));
        assert_eq!(aggregator.quote_calls.load(Ordering::SeqCst), 1);
    }

    /// Parameters that contradict the configuration never reach the
    /// aggregator
    #[tokio::test]
    async fn test_invalid_params_rejected() {
        let aggregator = Arc::new(MockAggregator::default());
        let orch = orchestrator(
            &aggregator,
            &Arc::new(MockChainGateway::default()),
            &Arc::new(RecordingSleeper::default()),
        );

        let mut wrong_wallet = params(NATIVE_TOKEN_ADDRESS, USDT, 1_000);
        wrong_wallet.user_wallet_address = Address::ZERO;
        let mut wrong_chain = params(NATIVE_TOKEN_ADDRESS, USDT, 1_000);
        wrong_chain.chain_id = 1;
        let zero_amount = params(NATIVE_TOKEN_ADDRESS, USDT, 0);
        let same_token = params(USDT, USDT, 1_000);
        let bad_slippage = params(NATIVE_TOKEN_ADDRESS, USDT, 1_000).with_slippage_percent(150.0);

        for p in [wrong_wallet, wrong_chain, zero_amount, same_token, bad_slippage] {
            let err = orch.get_quote(&p).await.unwrap_err();
            assert!(matches!(err, SwapError::InvalidParams(_)), "unexpected error: {err:?}");
        }
        assert_eq!(aggregator.quote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_native_balance_formatted() {
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &Arc::new(MockChainGateway::default()),
            &Arc::new(RecordingSleeper::default()),
        );

        let balance = orch.get_balance(NATIVE_TOKEN_ADDRESS).await.unwrap();
        assert_eq!(balance.formatted, "1");

        let balance = orch.get_balance(USDT).await.unwrap();
        assert_eq!(balance.atomic, U256::from(5_000_000u64));
        assert_eq!(balance.formatted, "0.000000000005");
    }

    /// Concurrent broadcasts from one orchestrator never share a nonce, even
    /// while the node's count still excludes them
    #[tokio::test]
    async fn test_concurrent_broadcasts_get_distinct_nonces() {
        let gateway = Arc::new(MockChainGateway::default());
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let send = || orch.send_transaction(TransactionClass::Swap, USDT, Bytes::new(), U256::ZERO);
        let (a, b, c, d) = tokio::join!(send(), send(), send(), send());
        assert!([a, b, c, d].iter().all(Result::is_ok));

        let mut nonces: Vec<u64> = gateway.broadcasts().iter().map(|r| r.nonce).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }

    /// Transactions sent from the wallet elsewhere move the nonce forward
    #[tokio::test]
    async fn test_nonce_follows_chain_when_ahead() {
        let gateway = Arc::new(MockChainGateway::default());
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let send = || orch.send_transaction(TransactionClass::Swap, USDT, Bytes::new(), U256::ZERO);
        send().await.unwrap();
        gateway.set_mined_nonce(7);
        send().await.unwrap();
        send().await.unwrap();

        let nonces: Vec<u64> = gateway.broadcasts().iter().map(|r| r.nonce).collect();
        assert_eq!(nonces, vec![0, 7, 8]);
    }

    /// A rejected broadcast does not consume a nonce
    #[tokio::test]
    async fn test_rejected_broadcast_keeps_nonce() {
        let gateway = Arc::new(MockChainGateway::default());
        let orch = orchestrator(
            &Arc::new(MockAggregator::default()),
            &gateway,
            &Arc::new(RecordingSleeper::default()),
        );

        let send = || orch.send_transaction(TransactionClass::Swap, USDT, Bytes::new(), U256::ZERO);
        send().await.unwrap();
        gateway.reject_broadcasts("connection reset");
        assert!(matches!(send().await, Err(SwapError::Broadcast(_))));
        *gateway.broadcast_error.lock().unwrap() = None;
        send().await.unwrap();

        let nonces: Vec<u64> = gateway.broadcasts().iter().map(|r| r.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
    }
}
