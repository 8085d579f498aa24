//! The CLI for the dex swap client

use std::str::FromStr;

use alloy_primitives::{Address, TxHash, U256};
use clap::{Args, Parser, Subcommand};
use dex_swap_api::{amounts::to_atomic_units, SwapParams, BSC_CHAIN_ID};
use dex_swap_client::{
    config::DEFAULT_AGGREGATOR_BASE_URL, OkxCredentials, SwapConfig, SwapError,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Swap tokens on BSC through the OKX DEX aggregator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // --- Aggregator Config --- //
    /// The aggregator API key
    #[arg(long, env = "OKX_API_KEY", hide_env_values = true)]
    pub api_key: String,
    /// The aggregator API secret
    #[arg(long, env = "OKX_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
    /// The passphrase the API key was created with
    #[arg(long, env = "OKX_API_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,
    /// The aggregator project ID
    #[arg(long, env = "OKX_PROJECT_ID")]
    pub project_id: String,
    /// The aggregator base URL
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_AGGREGATOR_BASE_URL)]
    pub api_base_url: String,

    // --- Wallet Config --- //
    /// The RPC URL of the BSC node
    #[arg(long, env = "EVM_RPC_URL")]
    pub rpc_url: String,
    /// The address of the swapping wallet
    #[arg(long, env = "EVM_WALLET_ADDRESS")]
    pub wallet_address: String,
    /// The private key of the swapping wallet
    #[arg(long, env = "EVM_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
    /// The chain ID to swap on
    #[arg(long, env = "CHAIN_ID", default_value_t = BSC_CHAIN_ID)]
    pub chain_id: u64,

    // --- Telemetry --- //
    /// Whether to emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// A command against the aggregator or the chain
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Quote a swap without sending anything
    Quote(SwapArgs),
    /// Ensure the router may spend an amount of a token
    Approve {
        /// The token to approve
        #[arg(long)]
        token: Address,
        /// The amount to approve
        #[command(flatten)]
        amount: AmountArgs,
    },
    /// Execute a swap, approving the sell token first if needed
    Swap(SwapArgs),
    /// Poll for a transaction's receipt
    Monitor {
        /// The transaction hash
        #[arg(long)]
        tx_hash: TxHash,
        /// The number of receipt lookups before giving up
        #[arg(long, default_value_t = 30)]
        attempts: u32,
        /// The delay between lookups, in milliseconds
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
    /// Show the wallet's balance of a token
    Balance {
        /// The token; the native sentinel for BNB
        #[arg(long)]
        token: Address,
    },
    /// List the tokens the aggregator supports
    Tokens,
    /// List the chains the aggregator supports
    Chains,
    /// Look up a transaction by hash
    History {
        /// The transaction hash
        #[arg(long)]
        tx_hash: TxHash,
    },
    /// Quote a swap and assess its route
    Analyze(SwapArgs),
    /// Check that the node is reachable
    CheckConnection,
}

/// The arguments describing a swap
#[derive(Args, Debug, Clone)]
pub struct SwapArgs {
    /// The token to sell
    #[arg(long)]
    pub from: Address,
    /// The token to buy
    #[arg(long)]
    pub to: Address,
    /// The amount to sell
    #[command(flatten)]
    pub amount: AmountArgs,
    /// The slippage tolerance, in percent
    #[arg(long)]
    pub slippage: Option<f64>,
}

/// A token amount, given in whole units or atomic units
#[derive(Args, Debug, Clone)]
pub struct AmountArgs {
    /// The amount, e.g. `0.1`
    #[arg(long)]
    pub amount: String,
    /// The token's decimals, used to convert a whole unit amount
    #[arg(long, default_value_t = 18)]
    pub decimals: u8,
    /// Interpret the amount as atomic units
    #[arg(long)]
    pub atomic: bool,
}

impl AmountArgs {
    /// The amount in atomic units
    pub fn to_atomic(&self) -> Result<U256, SwapError> {
        if self.atomic {
            return U256::from_str(&self.amount).map_err(SwapError::invalid_params);
        }
        to_atomic_units(&self.amount, self.decimals).map_err(SwapError::invalid_params)
    }
}

impl SwapArgs {
    /// The swap parameters for the given wallet
    pub fn to_params(&self, wallet: Address, chain_id: u64) -> Result<SwapParams, SwapError> {
        let mut params = SwapParams::new(self.from, self.to, self.amount.to_atomic()?, wallet);
        params.chain_id = chain_id;
        params.slippage_percent = self.slippage;

        Ok(params)
    }
}

impl Cli {
    /// Build the client configuration from the CLI
    pub fn build_config(&self) -> Result<SwapConfig, SwapError> {
        let credentials = OkxCredentials {
            api_key: self.api_key.clone(),
            secret_key: self.secret_key.clone(),
            passphrase: self.passphrase.clone(),
            project_id: self.project_id.clone(),
        };

        let config = SwapConfig::new(
            credentials,
            self.rpc_url.clone(),
            &self.wallet_address,
            &self.private_key,
        )?
        .with_aggregator_base_url(self.api_base_url.clone())
        .with_chain_id(self.chain_id);
        config.validate()?;

        Ok(config)
    }

    /// Set up logging to stderr, leaving stdout for command output
    pub fn setup_logging(&self) {
        let json_layer = self.json_logs.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
        });
        let text_layer = (!self.json_logs).then(|| fmt::layer().with_writer(std::io::stderr));

        let filter =
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .init();
    }
}
