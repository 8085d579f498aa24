//! Entrypoint for the dex swap CLI

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(unsafe_code)]
#![deny(clippy::uninlined_format_args)]

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use dex_swap_api::TransactionStatus;
use dex_swap_client::{SwapError, SwapOrchestrator};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::cli::{Cli, Command};

mod cli;

/// Main entrypoint for the dex swap CLI
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.setup_logging();

    match run(cli).await {
        Ok((output, success)) => {
            println!("{output:#}");
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("command failed: {e}");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        },
    }
}

/// Run the CLI's command, returning its output and whether it succeeded
async fn run(cli: Cli) -> Result<(Value, bool), SwapError> {
    let config = cli.build_config()?;
    let wallet = config.wallet_address;
    let chain_id = config.chain_id;
    let orchestrator = SwapOrchestrator::new(config)?;

    let output = match cli.command {
        Command::Quote(args) => {
            let quote = orchestrator.get_quote(&args.to_params(wallet, chain_id)?).await?;
            (to_json(&quote)?, true)
        },
        Command::Approve { token, amount } => {
            let res = orchestrator.approve_token(token, amount.to_atomic()?).await?;
            (to_json(&res)?, true)
        },
        Command::Swap(args) => {
            let res = orchestrator.execute_swap(&args.to_params(wallet, chain_id)?).await;
            let success = res.success;
            (to_json(&res)?, success)
        },
        Command::Monitor { tx_hash, attempts, interval_ms } => {
            let res = orchestrator
                .monitor_transaction(tx_hash, attempts, Duration::from_millis(interval_ms))
                .await;
            let success = res.status != TransactionStatus::Failed;
            (to_json(&res)?, success)
        },
        Command::Balance { token } => (to_json(&orchestrator.get_balance(token).await?)?, true),
        Command::Tokens => (to_json(&orchestrator.get_supported_tokens().await)?, true),
        Command::Chains => (to_json(&orchestrator.get_supported_chains().await)?, true),
        Command::History { tx_hash } => {
            (to_json(&orchestrator.get_transaction_history(tx_hash).await)?, true)
        },
        Command::Analyze(args) => {
            let analysis = orchestrator.analyze_route(&args.to_params(wallet, chain_id)?).await?;
            (to_json(&analysis)?, true)
        },
        Command::CheckConnection => {
            let connected = orchestrator.check_connection().await;
            (json!({ "connected": connected }), connected)
        },
    };

    Ok(output)
}

/// Serialize a command's output
fn to_json<T: Serialize>(value: &T) -> Result<Value, SwapError> {
    serde_json::to_value(value).map_err(SwapError::parse)
}
