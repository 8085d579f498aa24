//! Mock collaborators shared by the client's tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy_primitives::{address, b256, bytes, Address, TxHash, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use dex_swap_api::{
    is_native_token, BestEffort, ChainInfo, DexShare, Quote, QuoteComparison, QuoteToken,
    RouteHop, RouteLeg, SwapParams, TokenListEntry, TokenMetadata, TransactionHistoryRecord,
    NATIVE_TOKEN_ADDRESS,
};

use crate::{
    aggregator::{ApprovalPayload, DexAggregator, SwapPayload},
    chain::{rpc::IERC20, ChainGateway, TransactionRequest, TxReceipt},
    config::{test_config::TEST_WALLET, BSC_SPENDER_ADDRESS},
    error::SwapError,
    monitor::Sleeper,
};

/// A transaction hash used where any hash will do
pub const TEST_TX_HASH: TxHash =
    b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
/// The USDT token on BSC
pub const USDT: Address = address!("0x55d398326f99059fF775485246999027B3197955");
/// The aggregator router on BSC
pub const ROUTER: Address = address!("0x9b9efa5Efa731EA9Bbb0369E91fA17Abf249CFD4");

/// The test wallet's address
pub fn test_wallet() -> Address {
    TEST_WALLET.parse().unwrap()
}

/// A receipt for the given hash
pub fn receipt(tx_hash: TxHash, status: bool) -> TxReceipt {
    TxReceipt {
        tx_hash,
        status,
        block_number: Some(100),
        gas_used: 150_000,
        from: test_wallet(),
        to: Some(ROUTER),
    }
}

/// The hash the mock gateway assigns to its `n`th broadcast
pub fn broadcast_hash(n: usize) -> TxHash {
    B256::with_last_byte(n as u8 + 1)
}

// ---------------
// | Chain Mock |
// ---------------

/// A chain gateway that records what it is asked to sign
///
/// The reported nonce counts mined transactions only: a broadcast advances it
/// once a receipt for it has been returned. A broadcast reusing the nonce of
/// an earlier one is rejected, as a node rejects a same-priced replacement
pub struct MockChainGateway {
    /// The gas price the node reports
    pub gas_price: U256,
    /// The nonce the node reports at the latest block
    pub mined_nonce: Mutex<u64>,
    /// The allowance every token reports
    pub allowance: Mutex<U256>,
    /// The native balance every address reports
    pub native_balance: U256,
    /// An error message the node rejects broadcasts with
    pub broadcast_error: Mutex<Option<String>>,
    /// Every request signed and broadcast
    pub broadcasts: Mutex<Vec<TransactionRequest>>,
    /// Queued receipt lookup results, consumed in order
    pub receipts: Mutex<VecDeque<Result<Option<TxReceipt>, SwapError>>>,
    /// The status of the receipt returned once the queue is empty; `None`
    /// means no receipt
    pub default_receipt_status: Mutex<Option<bool>>,
    /// The number of receipt lookups
    pub receipt_calls: AtomicUsize,
    /// The number of allowance reads
    pub allowance_calls: AtomicUsize,
}

impl Default for MockChainGateway {
    fn default() -> Self {
        Self {
            gas_price: U256::from(1_000_000_000u64),
            mined_nonce: Mutex::new(0),
            allowance: Mutex::new(U256::ZERO),
            native_balance: U256::from(10u64).pow(U256::from(18)),
            broadcast_error: Mutex::new(None),
            broadcasts: Mutex::new(Vec::new()),
            receipts: Mutex::new(VecDeque::new()),
            default_receipt_status: Mutex::new(None),
            receipt_calls: AtomicUsize::new(0),
            allowance_calls: AtomicUsize::new(0),
        }
    }
}

impl MockChainGateway {
    /// A gateway whose transactions all confirm successfully
    pub fn confirming() -> Self {
        let gateway = Self::default();
        *gateway.default_receipt_status.lock().unwrap() = Some(true);
        gateway
    }

    /// Queue a receipt lookup result
    pub fn push_receipt(&self, res: Result<Option<TxReceipt>, SwapError>) {
        self.receipts.lock().unwrap().push_back(res);
    }

    /// Set the nonce the node reports, as if transactions were mined from
    /// elsewhere
    pub fn set_mined_nonce(&self, nonce: u64) {
        *self.mined_nonce.lock().unwrap() = nonce;
    }

    /// Set the allowance every token reports
    pub fn set_allowance(&self, allowance: U256) {
        *self.allowance.lock().unwrap() = allowance;
    }

    /// Reject every broadcast with the given message
    pub fn reject_broadcasts(&self, message: &str) {
        *self.broadcast_error.lock().unwrap() = Some(message.to_string());
    }

    /// The requests broadcast so far
    pub fn broadcasts(&self) -> Vec<TransactionRequest> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Advance the mined nonce past the broadcast with the given hash
    fn mark_mined(&self, tx_hash: TxHash) {
        let broadcasts = self.broadcasts.lock().unwrap();
        let Some(tx) = (0..broadcasts.len()).find(|&i| broadcast_hash(i) == tx_hash) else {
            return;
        };

        let mut mined = self.mined_nonce.lock().unwrap();
        *mined = (*mined).max(broadcasts[tx].nonce + 1);
    }
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn get_gas_price(&self) -> Result<U256, SwapError> {
        Ok(self.gas_price)
    }

    async fn get_nonce(&self, _address: Address) -> Result<u64, SwapError> {
        let nonce = *self.mined_nonce.lock().unwrap();
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        Ok(nonce)
    }

    async fn get_native_balance_wei(&self, _address: Address) -> Result<U256, SwapError> {
        Ok(self.native_balance)
    }

    async fn get_token_balance(&self, _token: Address, _owner: Address) -> Result<U256, SwapError> {
        Ok(U256::from(5_000_000u64))
    }

    async fn get_allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, SwapError> {
        self.allowance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.allowance.lock().unwrap())
    }

    async fn get_token_info(&self, token: Address) -> Result<TokenMetadata, SwapError> {
        if is_native_token(&token) {
            return Ok(TokenMetadata { symbol: "BNB".into(), name: "BNB".into(), decimals: 18 });
        }
        Ok(TokenMetadata { symbol: "USDT".into(), name: "Tether USD".into(), decimals: 18 })
    }

    async fn sign_and_broadcast(&self, request: &TransactionRequest) -> Result<TxHash, SwapError> {
        if let Some(message) = self.broadcast_error.lock().unwrap().clone() {
            return Err(SwapError::broadcast(message));
        }

        let mut broadcasts = self.broadcasts.lock().unwrap();
        if broadcasts.iter().any(|tx| tx.nonce == request.nonce) {
            return Err(SwapError::broadcast("replacement transaction underpriced"));
        }
        if request.nonce < *self.mined_nonce.lock().unwrap() {
            return Err(SwapError::broadcast("nonce too low"));
        }

        let hash = broadcast_hash(broadcasts.len());
        broadcasts.push(request.clone());
        Ok(hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, SwapError> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        let res = match self.receipts.lock().unwrap().pop_front() {
            Some(res) => res,
            None => {
                let status = *self.default_receipt_status.lock().unwrap();
                Ok(status.map(|status| receipt(tx_hash, status)))
            },
        };

        if let Ok(Some(receipt)) = &res {
            self.mark_mined(receipt.tx_hash);
        }
        res
    }

    async fn get_block_number(&self) -> Result<u64, SwapError> {
        Ok(100)
    }
}

// --------------------
// | Aggregator Mock |
// --------------------

/// An aggregator returning canned quotes and payloads
pub struct MockAggregator {
    /// An error returned from quote requests
    pub quote_error: Mutex<Option<SwapError>>,
    /// The price impact reported in quotes
    pub price_impact_percent: f64,
    /// The number of route legs reported in quotes
    pub route_legs: usize,
    /// The spender encoded in approval calldata, which may differ from the
    /// declared spender
    pub approval_spender: Address,
    /// The spender the aggregator declares alongside approval calldata
    pub declared_spender: Address,
    /// The aggregator's history record for any hash
    pub history: Mutex<BestEffort<Option<TransactionHistoryRecord>>>,
    /// The number of quote requests
    pub quote_calls: AtomicUsize,
    /// The number of approval payload requests
    pub approval_calls: AtomicUsize,
    /// The number of swap payload requests
    pub swap_calls: AtomicUsize,
}

impl Default for MockAggregator {
    fn default() -> Self {
        Self {
            quote_error: Mutex::new(None),
            price_impact_percent: 0.1,
            route_legs: 1,
            approval_spender: BSC_SPENDER_ADDRESS,
            declared_spender: BSC_SPENDER_ADDRESS,
            history: Mutex::new(BestEffort::Fetched(None)),
            quote_calls: AtomicUsize::new(0),
            approval_calls: AtomicUsize::new(0),
            swap_calls: AtomicUsize::new(0),
        }
    }
}

impl MockAggregator {
    /// A quote for the given parameters at a rate of 600 buy units per sell
    /// unit
    pub fn quote(&self, params: &SwapParams) -> Quote {
        let token = |address: Address| QuoteToken {
            address,
            symbol: if is_native_token(&address) { "BNB".into() } else { "USDT".into() },
            decimals: 18,
            unit_price: None,
        };
        let leg = RouteLeg {
            percent: 100.0 / self.route_legs.max(1) as f64,
            hops: vec![RouteHop {
                from_symbol: "WBNB".into(),
                to_symbol: "USDT".into(),
                dexes: vec![DexShare { dex_name: "PancakeSwap V3".into(), percent: 100.0 }],
            }],
        };

        Quote {
            from_token: token(params.from_token),
            to_token: token(params.to_token),
            from_amount: params.amount,
            to_amount: params.amount * U256::from(600u64),
            price_impact_percent: self.price_impact_percent,
            estimated_gas_fee: "135000".into(),
            trade_fee: None,
            route: vec![leg; self.route_legs],
            alternatives: vec![QuoteComparison {
                dex_name: "Uniswap V3".into(),
                amount_out: "599.5".into(),
                trade_fee: "0.04".into(),
            }],
        }
    }
}

#[async_trait]
impl DexAggregator for MockAggregator {
    async fn get_quote(&self, params: &SwapParams) -> Result<Quote, SwapError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.quote_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.quote(params))
    }

    async fn get_approval_payload(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<ApprovalPayload, SwapError> {
        self.approval_calls.fetch_add(1, Ordering::SeqCst);
        let call = IERC20::approveCall { spender: self.approval_spender, value: amount };

        Ok(ApprovalPayload {
            to: token,
            data: call.abi_encode().into(),
            spender: self.declared_spender,
        })
    }

    async fn get_swap_payload(&self, params: &SwapParams) -> Result<SwapPayload, SwapError> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        let value =
            if params.from_token == NATIVE_TOKEN_ADDRESS { params.amount } else { U256::ZERO };

        Ok(SwapPayload {
            quote: self.quote(params),
            to: ROUTER,
            data: bytes!("0xb80c2f09"),
            value,
            min_receive_amount: Some("597".into()),
        })
    }

    async fn get_supported_tokens(&self, _chain_id: u64) -> BestEffort<Vec<TokenListEntry>> {
        BestEffort::Fetched(vec![])
    }

    async fn get_supported_chains(&self) -> BestEffort<Vec<ChainInfo>> {
        BestEffort::Fetched(vec![ChainInfo {
            chain_id: 56,
            name: "BNB Chain".into(),
            approve_address: None,
        }])
    }

    async fn get_transaction_history(
        &self,
        _chain_id: u64,
        _tx_hash: TxHash,
    ) -> BestEffort<Option<TransactionHistoryRecord>> {
        self.history.lock().unwrap().clone()
    }
}

// ----------------
// | Sleeper Mock |
// ----------------

/// A sleeper that returns immediately and records each requested delay
#[derive(Default)]
pub struct RecordingSleeper {
    /// The delays requested so far
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// The delays requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
