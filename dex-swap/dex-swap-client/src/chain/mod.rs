//! Reads from and writes to the chain

use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use dex_swap_api::{amounts::from_atomic_units, TokenMetadata, NATIVE_TOKEN_DECIMALS};

use crate::error::SwapError;

pub mod rpc;

pub use rpc::RpcChainGateway;

/// A transaction ready to be signed
///
/// Built once per broadcast attempt, with the nonce and gas price read from
/// the chain immediately beforehand
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// The sending wallet
    pub from: Address,
    /// The contract called
    pub to: Address,
    /// The calldata
    pub data: Bytes,
    /// The native value attached
    pub value: U256,
    /// The gas limit
    pub gas_limit: u64,
    /// The gas price, in wei
    pub gas_price: U256,
    /// The nonce
    pub nonce: u64,
}

/// The parts of a transaction receipt the client acts on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    /// The transaction hash
    pub tx_hash: TxHash,
    /// Whether the transaction executed successfully
    pub status: bool,
    /// The block the transaction was mined in
    pub block_number: Option<u64>,
    /// The gas used by the transaction
    pub gas_used: u64,
    /// The sender
    pub from: Address,
    /// The recipient
    pub to: Option<Address>,
}

/// A connection to a chain node holding a single signing key
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// The node's current gas price, in wei
    async fn get_gas_price(&self) -> Result<U256, SwapError>;

    /// The number of transactions the address has in the latest block
    ///
    /// Pending transactions are not counted
    async fn get_nonce(&self, address: Address) -> Result<u64, SwapError>;

    /// The address's native balance, in wei
    async fn get_native_balance_wei(&self, address: Address) -> Result<U256, SwapError>;

    /// The address's balance of an ERC-20 token, in atomic units
    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256, SwapError>;

    /// The amount `spender` may transfer from `owner`
    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SwapError>;

    /// A token's metadata
    async fn get_token_info(&self, token: Address) -> Result<TokenMetadata, SwapError>;

    /// Sign the request with the configured key and submit it
    async fn sign_and_broadcast(&self, request: &TransactionRequest) -> Result<TxHash, SwapError>;

    /// Look up a receipt; `None` means the transaction is not yet mined
    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, SwapError>;

    /// The latest block number
    async fn get_block_number(&self) -> Result<u64, SwapError>;

    /// The address's native balance in whole units
    async fn get_native_balance(&self, address: Address) -> Result<String, SwapError> {
        let wei = self.get_native_balance_wei(address).await?;
        Ok(from_atomic_units(wei, NATIVE_TOKEN_DECIMALS))
    }

    /// Whether the node answers a block number probe
    async fn check_connection(&self) -> bool {
        self.get_block_number().await.is_ok()
    }
}
