//! Polls the chain for a transaction's receipt with a bounded retry budget

use std::{sync::Arc, time::Duration};

use alloy_primitives::TxHash;
use async_trait::async_trait;
use dex_swap_api::{MonitorResult, TransactionStatus};
use tracing::{debug, info, instrument, warn};

use crate::{chain::ChainGateway, error::SwapError};

/// The default number of receipt lookups before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
/// The default spacing between receipt lookups
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// A source of delays, injectable so that polling is deterministic in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// A sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Watches submitted transactions until they are mined or the budget runs out
#[derive(Clone)]
pub struct TransactionMonitor {
    /// The gateway receipts are fetched from
    gateway: Arc<dyn ChainGateway>,
    /// Delays between attempts
    sleeper: Arc<dyn Sleeper>,
}

impl TransactionMonitor {
    /// Create a new monitor
    pub fn new(gateway: Arc<dyn ChainGateway>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { gateway, sleeper }
    }

    /// Monitor a transaction with the default policy of 30 attempts spaced
    /// 2 seconds apart
    pub async fn monitor_with_defaults(&self, tx_hash: TxHash) -> MonitorResult {
        self.monitor(tx_hash, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL).await
    }

    /// Poll for the transaction's receipt up to `max_attempts` times,
    /// sleeping `interval` between attempts
    ///
    /// A lookup error is retried like a missing receipt; only an on-chain
    /// revert is a failure. Exhausting the budget yields `Pending`
    #[instrument(skip_all, fields(tx_hash = %tx_hash, max_attempts))]
    pub async fn monitor(
        &self,
        tx_hash: TxHash,
        max_attempts: u32,
        interval: Duration,
    ) -> MonitorResult {
        for attempt in 1..=max_attempts {
            match self.gateway.get_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status {
                        TransactionStatus::Success
                    } else {
                        TransactionStatus::Failed
                    };
                    info!("transaction {tx_hash:#x} mined with status {status:?}");

                    return MonitorResult {
                        status,
                        tx_hash: Some(tx_hash),
                        fail_reason: (!receipt.status)
                            .then(|| "transaction reverted on-chain".to_string()),
                        block_number: receipt.block_number,
                        gas_used: Some(receipt.gas_used),
                    };
                },
                Ok(None) => debug!("no receipt yet (attempt {attempt}/{max_attempts})"),
                Err(e) => warn!("receipt lookup failed (attempt {attempt}/{max_attempts}): {e}"),
            }

            if attempt < max_attempts {
                self.sleeper.sleep(interval).await;
            }
        }

        let reason =
            SwapError::ConfirmationTimeout(format!("no receipt after {max_attempts} attempts"));
        warn!("{reason}");

        MonitorResult {
            status: TransactionStatus::Pending,
            tx_hash: Some(tx_hash),
            fail_reason: Some(reason.to_string()),
            block_number: None,
            gas_used: None,
        }
    }
}
