//! Okx-specific logic for quoting swaps and fetching transaction payloads

use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use dex_swap_api::{
    BestEffort, ChainInfo, Quote, SwapParams, TokenListEntry, TransactionHistoryRecord,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    config::SwapConfig,
    error::SwapError,
    helpers::{format_slippage_fraction, handle_http_response},
};

use self::{
    api_types::{
        parse_address, parse_bytes, parse_u256_or_zero, OkxApiResponse, OkxApproveRequestParams,
        OkxApproveResponse, OkxChainEntry, OkxChainQuery, OkxHistoryRecord, OkxHistoryRequest,
        OkxSwapRequestParams, OkxSwapResponse, OkxTokenListEntry,
    },
    signer::RequestSigner,
};

pub mod api_types;
pub mod signer;

// -------------
// | Constants |
// -------------

/// The string representation of the HTTP GET method as expected in the Okx API
/// HMAC signature
const HTTP_GET_METHOD: &str = "GET";
/// The string representation of the HTTP POST method
const HTTP_POST_METHOD: &str = "POST";

/// The endpoint for getting a swap payload, which also serves quotes
const OKX_SWAP_ENDPOINT: &str = "/api/v5/dex/aggregator/swap";
/// The endpoint for getting approval calldata
const OKX_APPROVAL_ENDPOINT: &str = "/api/v5/dex/aggregator/approve-transaction";
/// The endpoint for listing supported tokens
const OKX_TOKENS_ENDPOINT: &str = "/api/v5/dex/aggregator/all-tokens";
/// The endpoint for listing supported chains
const OKX_CHAINS_ENDPOINT: &str = "/api/v5/dex/aggregator/supported/chain";
/// The endpoint for looking up transactions by hash
const OKX_HISTORY_ENDPOINT: &str = "/api/v5/dex/transaction/get-transaction-history";

// ---------
// | Types |
// ---------

/// The calldata needed to set a token allowance
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalPayload {
    /// The token contract the approval is sent to
    pub to: Address,
    /// The approval calldata
    pub data: Bytes,
    /// The contract being approved to spend the token
    pub spender: Address,
}

/// The pricing detail and unsigned transaction fields of a swap
#[derive(Clone, Debug, PartialEq)]
pub struct SwapPayload {
    /// The quote the payload executes
    pub quote: Quote,
    /// The router contract to call
    pub to: Address,
    /// The swap calldata
    pub data: Bytes,
    /// The native value to attach
    pub value: U256,
    /// The minimum amount of the buy token the swap accepts
    pub min_receive_amount: Option<String>,
}

/// A source of quotes and ready-to-sign swap payloads
#[async_trait]
pub trait DexAggregator: Send + Sync {
    /// Get a quote for a swap
    async fn get_quote(&self, params: &SwapParams) -> Result<Quote, SwapError>;

    /// Get the calldata that approves the aggregator to spend `amount` of
    /// `token`
    async fn get_approval_payload(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<ApprovalPayload, SwapError>;

    /// Get a quote along with the unsigned swap transaction
    async fn get_swap_payload(&self, params: &SwapParams) -> Result<SwapPayload, SwapError>;

    /// List the tokens supported on a chain
    async fn get_supported_tokens(&self, chain_id: u64) -> BestEffort<Vec<TokenListEntry>>;

    /// List the supported chains
    async fn get_supported_chains(&self) -> BestEffort<Vec<ChainInfo>>;

    /// Look up a transaction in the aggregator's history
    async fn get_transaction_history(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> BestEffort<Option<TransactionHistoryRecord>>;
}

// ----------
// | Client |
// ----------

/// A client for interacting with the Okx API
#[derive(Clone, Debug)]
pub struct OkxClient {
    /// Signs each request
    signer: RequestSigner,
    /// The underlying HTTP client
    http_client: Client,
    /// The base URL of the API
    base_url: String,
    /// The chain on which the client is operating
    chain_id: u64,
}

impl OkxClient {
    /// Create a new client
    pub fn new(config: &SwapConfig) -> Result<Self, SwapError> {
        let signer = RequestSigner::new(config.credentials.clone())?;
        let http_client =
            Client::builder().timeout(config.request_timeout).build().map_err(SwapError::config)?;
        let base_url = config.aggregator_base_url.trim_end_matches('/').to_string();

        Ok(Self { signer, http_client, base_url, chain_id: config.chain_id })
    }

    /// Send a signed GET request to the Okx API
    async fn send_get_request<Q: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<OkxApiResponse<T>, SwapError> {
        let query_string = serde_qs::to_string(query).map_err(SwapError::parse)?;
        let query_string = format!("?{query_string}");
        let url = format!("{}{path}{query_string}", self.base_url);

        let iso_timestamp = RequestSigner::timestamp();
        let headers = self.signer.sign(&iso_timestamp, HTTP_GET_METHOD, path, &query_string)?;

        debug!("GET {path}{query_string}");
        let response = self.http_client.get(url).headers(headers).send().await?;
        handle_http_response(response).await
    }

    /// Send a signed POST request to the Okx API
    async fn send_post_request<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<OkxApiResponse<T>, SwapError> {
        let body = serde_json::to_string(body).map_err(SwapError::parse)?;
        let url = format!("{}{path}", self.base_url);

        let iso_timestamp = RequestSigner::timestamp();
        let headers = self.signer.sign(&iso_timestamp, HTTP_POST_METHOD, path, &body)?;

        debug!("POST {path}");
        let response = self.http_client.post(url).headers(headers).body(body).send().await?;
        handle_http_response(response).await
    }

    /// Construct the parameters for a swap request
    fn construct_swap_request_params(&self, params: &SwapParams) -> OkxSwapRequestParams {
        OkxSwapRequestParams {
            chain_id: self.chain_id.to_string(),
            from_token_address: format!("{:#x}", params.from_token),
            to_token_address: format!("{:#x}", params.to_token),
            amount: params.amount.to_string(),
            user_wallet_address: format!("{:#x}", params.user_wallet_address),
            slippage: format_slippage_fraction(params.slippage_percent_or_default()),
        }
    }

    /// Fetch the swap endpoint's response for the given parameters
    async fn fetch_swap(&self, params: &SwapParams) -> Result<OkxSwapResponse, SwapError> {
        let request_params = self.construct_swap_request_params(params);
        let response: OkxApiResponse<OkxSwapResponse> =
            self.send_get_request(OKX_SWAP_ENDPOINT, &request_params).await?;

        response.into_first()
    }
}

// -----------------------
// | Dex Aggregator Impl |
// -----------------------

#[async_trait]
impl DexAggregator for OkxClient {
    #[instrument(
        skip_all,
        fields(from = %params.from_token, to = %params.to_token, amount = %params.amount)
    )]
    async fn get_quote(&self, params: &SwapParams) -> Result<Quote, SwapError> {
        let swap = self.fetch_swap(params).await.map_err(SwapError::into_quote_error)?;
        swap.router_result.to_quote().map_err(SwapError::into_quote_error)
    }

    #[instrument(skip(self))]
    async fn get_approval_payload(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<ApprovalPayload, SwapError> {
        let request_params = OkxApproveRequestParams {
            chain_id: self.chain_id.to_string(),
            token_contract_address: format!("{token:#x}"),
            approve_amount: amount.to_string(),
        };

        let response: OkxApiResponse<OkxApproveResponse> =
            self.send_get_request(OKX_APPROVAL_ENDPOINT, &request_params).await?;
        let approval = response.into_first()?;

        Ok(ApprovalPayload {
            to: token,
            data: parse_bytes(&approval.data)?,
            spender: parse_address(&approval.dex_contract_address)?,
        })
    }

    #[instrument(
        skip_all,
        fields(from = %params.from_token, to = %params.to_token, amount = %params.amount)
    )]
    async fn get_swap_payload(&self, params: &SwapParams) -> Result<SwapPayload, SwapError> {
        let swap = self.fetch_swap(params).await?;
        let quote = swap.router_result.to_quote()?;
        let tx = swap.tx.ok_or_else(|| SwapError::parse("swap response has no transaction"))?;

        Ok(SwapPayload {
            quote,
            to: parse_address(&tx.to)?,
            data: parse_bytes(&tx.data)?,
            value: parse_u256_or_zero(tx.value.as_deref())?,
            min_receive_amount: tx.min_receive_amount,
        })
    }

    async fn get_supported_tokens(&self, chain_id: u64) -> BestEffort<Vec<TokenListEntry>> {
        let query = OkxChainQuery { chain_id: chain_id.to_string() };
        let res = self
            .send_get_request::<_, OkxTokenListEntry>(OKX_TOKENS_ENDPOINT, &query)
            .await
            .and_then(OkxApiResponse::into_data);

        match res {
            Ok(tokens) => {
                BestEffort::Fetched(tokens.into_iter().map(TokenListEntry::from).collect())
            },
            Err(e) => {
                warn!("failed to fetch supported tokens: {e}");
                BestEffort::Degraded(e.to_string())
            },
        }
    }

    async fn get_supported_chains(&self) -> BestEffort<Vec<ChainInfo>> {
        let query = OkxChainQuery { chain_id: self.chain_id.to_string() };
        let res = self
            .send_get_request::<_, OkxChainEntry>(OKX_CHAINS_ENDPOINT, &query)
            .await
            .and_then(OkxApiResponse::into_data);

        match res {
            Ok(chains) => {
                let chains = chains.into_iter().filter_map(OkxChainEntry::to_chain_info).collect();
                BestEffort::Fetched(chains)
            },
            Err(e) => {
                warn!("failed to fetch supported chains: {e}");
                BestEffort::Degraded(e.to_string())
            },
        }
    }

    async fn get_transaction_history(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> BestEffort<Option<TransactionHistoryRecord>> {
        let body = OkxHistoryRequest {
            chain_index: chain_id.to_string(),
            tx_hash_list: vec![format!("{tx_hash:#x}")],
        };
        let res = self
            .send_post_request::<_, OkxHistoryRecord>(OKX_HISTORY_ENDPOINT, &body)
            .await
            .and_then(OkxApiResponse::into_data);

        match res {
            Ok(records) => {
                BestEffort::Fetched(records.into_iter().next().map(TransactionHistoryRecord::from))
            },
            Err(e) => {
                warn!("failed to fetch transaction history for {tx_hash:#x}: {e}");
                BestEffort::Degraded(e.to_string())
            },
        }
    }
}
