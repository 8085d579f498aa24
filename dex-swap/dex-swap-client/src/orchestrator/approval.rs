//! Token allowance checks and approval transactions

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use dex_swap_api::{is_native_token, ApprovalResult, TransactionStatus};
use tracing::{info, instrument};

use super::{SwapOrchestrator, TransactionClass};
use crate::{chain::rpc::IERC20, error::SwapError};

/// A token's allowance relative to an amount about to be spent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalState {
    /// The router's current allowance
    pub current_allowance: U256,
    /// The amount the swap will spend
    pub required_amount: U256,
    /// Whether an approval must be sent first
    pub need_approval: bool,
}

impl SwapOrchestrator {
    /// Compare the router's allowance for a token against an amount
    ///
    /// The native token needs no allowance and is answered without a chain
    /// read
    pub async fn check_approval(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<ApprovalState, SwapError> {
        if is_native_token(&token) {
            return Ok(ApprovalState {
                current_allowance: U256::MAX,
                required_amount: amount,
                need_approval: false,
            });
        }

        let current_allowance = self
            .gateway
            .get_allowance(token, self.config.wallet_address, self.config.spender_address)
            .await?;

        Ok(ApprovalState {
            current_allowance,
            required_amount: amount,
            need_approval: current_allowance < amount,
        })
    }

    /// Ensure the router may spend `amount` of `token`, sending an approval
    /// and waiting for it to be mined if the allowance falls short
    #[instrument(skip_all, fields(token = %token, amount = %amount))]
    pub async fn approve_token(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<ApprovalResult, SwapError> {
        let state = self.check_approval(token, amount).await?;
        if !state.need_approval {
            return Ok(ApprovalResult { need_approval: false, tx_hash: None });
        }

        info!("allowance {} below {amount}, approving", state.current_allowance);
        let payload = self.aggregator.get_approval_payload(token, amount).await?;
        if payload.spender != self.config.spender_address {
            return Err(SwapError::config(format!(
                "aggregator approves spender {:#x}, but allowances are read for {:#x}",
                payload.spender, self.config.spender_address
            )));
        }

        let call = IERC20::approveCall::abi_decode(&payload.data).map_err(SwapError::parse)?;
        if call.spender != payload.spender || call.value < amount {
            return Err(SwapError::parse(format!(
                "approval calldata approves {} for {:#x}, expected {amount} for {:#x}",
                call.value, call.spender, payload.spender
            )));
        }

        let (tx_hash, _) = self
            .send_transaction(TransactionClass::Approval, payload.to, payload.data, U256::ZERO)
            .await?;

        let res = self.monitor().monitor_with_defaults(tx_hash).await;
        match res.status {
            TransactionStatus::Success => {
                info!("approval {tx_hash:#x} confirmed");
                Ok(ApprovalResult { need_approval: true, tx_hash: Some(tx_hash) })
            },
            TransactionStatus::Failed => Err(SwapError::broadcast(format!(
                "approval transaction {tx_hash:#x} reverted"
            ))),
            TransactionStatus::Pending => Err(SwapError::ConfirmationTimeout(format!(
                "approval transaction {tx_hash:#x} was not mined"
            ))),
        }
    }
}
