//! A chain gateway backed by a JSON-RPC node

use alloy::{
    eips::{eip2718::Encodable2718, BlockId},
    network::{EthereumWallet, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest as RpcTransactionRequest,
    sol,
    transports::{RpcError, TransportError},
};
use alloy_contract::Error as ContractError;
use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use dex_swap_api::{
    is_native_token, TokenMetadata, NATIVE_TOKEN_DECIMALS, NATIVE_TOKEN_SYMBOL,
};
use tracing::{debug, info};

use crate::{
    chain::{ChainGateway, TransactionRequest, TxReceipt},
    config::SwapConfig,
    error::SwapError,
};

// ---------
// | ERC20 |
// ---------

sol! {
    /// The subset of ERC-20 the client calls or decodes
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string memory);
        function name() external view returns (string memory);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

// -----------
// | Gateway |
// -----------

/// A chain gateway that signs locally and talks to a node over HTTP
#[derive(Clone)]
pub struct RpcChainGateway {
    /// The RPC provider
    provider: DynProvider,
    /// The wallet that signs transactions
    wallet: EthereumWallet,
    /// The address of the signing key
    wallet_address: Address,
    /// The chain ID signed into each transaction
    chain_id: u64,
}

impl RpcChainGateway {
    /// Create a gateway from the configuration
    ///
    /// The provider fills nothing itself; every transaction field is set
    /// explicitly on each request
    pub fn new(config: &SwapConfig) -> Result<Self, SwapError> {
        let url = config.rpc_url.parse().map_err(SwapError::config)?;
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(url);

        Ok(Self {
            provider: DynProvider::new(provider),
            wallet: EthereumWallet::from(config.signer.clone()),
            wallet_address: config.wallet_address,
            chain_id: config.chain_id,
        })
    }

    /// Get a handle to a token contract
    fn erc20(&self, token: Address) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(token, self.provider.clone())
    }
}

/// Classify an error from a node read
fn read_error(e: TransportError) -> SwapError {
    match e {
        RpcError::Transport(kind) => SwapError::network(kind),
        other => SwapError::rpc(other),
    }
}

/// Classify an error from a contract read
fn contract_error(e: ContractError) -> SwapError {
    match e {
        ContractError::TransportError(e) => read_error(e),
        other => SwapError::rpc(other),
    }
}

/// Classify an error from a transaction submission
fn broadcast_error(e: TransportError) -> SwapError {
    match e {
        RpcError::ErrorResp(payload) => SwapError::broadcast(payload.message),
        RpcError::Transport(kind) => SwapError::network(kind),
        other => SwapError::broadcast(other),
    }
}

#[async_trait]
impl ChainGateway for RpcChainGateway {
    async fn get_gas_price(&self) -> Result<U256, SwapError> {
        let gas_price = self.provider.get_gas_price().await.map_err(read_error)?;
        Ok(U256::from(gas_price))
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, SwapError> {
        self.provider
            .get_transaction_count(address)
            .block_id(BlockId::latest())
            .await
            .map_err(read_error)
    }

    async fn get_native_balance_wei(&self, address: Address) -> Result<U256, SwapError> {
        self.provider.get_balance(address).await.map_err(read_error)
    }

    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256, SwapError> {
        self.erc20(token).balanceOf(owner).call().await.map_err(contract_error)
    }

    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SwapError> {
        self.erc20(token).allowance(owner, spender).call().await.map_err(contract_error)
    }

    async fn get_token_info(&self, token: Address) -> Result<TokenMetadata, SwapError> {
        if is_native_token(&token) {
            return Ok(TokenMetadata {
                symbol: NATIVE_TOKEN_SYMBOL.to_string(),
                name: NATIVE_TOKEN_SYMBOL.to_string(),
                decimals: NATIVE_TOKEN_DECIMALS,
            });
        }

        let erc20 = self.erc20(token);
        let symbol = erc20.symbol().call().await.map_err(contract_error)?;
        let name = erc20.name().call().await.map_err(contract_error)?;
        let decimals = erc20.decimals().call().await.map_err(contract_error)?;

        Ok(TokenMetadata { symbol, name, decimals })
    }

    async fn sign_and_broadcast(&self, request: &TransactionRequest) -> Result<TxHash, SwapError> {
        if request.from != self.wallet_address {
            return Err(SwapError::invalid_params(format!(
                "cannot sign for {:#x}, the configured wallet is {:#x}",
                request.from, self.wallet_address
            )));
        }

        let gas_price = u128::try_from(request.gas_price)
            .map_err(|_| SwapError::broadcast("gas price overflows u128"))?;

        let tx = RpcTransactionRequest::default()
            .with_from(request.from)
            .with_to(request.to)
            .with_input(request.data.clone())
            .with_value(request.value)
            .with_gas_limit(request.gas_limit)
            .with_gas_price(gas_price)
            .with_nonce(request.nonce)
            .with_chain_id(self.chain_id);

        let envelope = tx.build(&self.wallet).await.map_err(SwapError::broadcast)?;
        let raw_tx = envelope.encoded_2718();

        debug!(nonce = request.nonce, gas_price = %request.gas_price, "broadcasting transaction");
        let pending = self.provider.send_raw_transaction(&raw_tx).await.map_err(broadcast_error)?;
        let tx_hash = *pending.tx_hash();

        info!("broadcast transaction {tx_hash:#x}");
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, SwapError> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await.map_err(read_error)?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            status: r.status(),
            block_number: r.block_number,
            gas_used: r.gas_used,
            from: r.from,
            to: r.to,
        }))
    }

    async fn get_block_number(&self) -> Result<u64, SwapError> {
        self.provider.get_block_number().await.map_err(read_error)
    }
}
