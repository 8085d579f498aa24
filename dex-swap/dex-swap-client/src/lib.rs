//! A client for swapping tokens on BSC through the OKX DEX aggregator
//!
//! The [`orchestrator::SwapOrchestrator`] sequences a swap. Quotes and
//! payloads come from a [`aggregator::DexAggregator`]; transactions are signed
//! with a locally held key and sent through a [`chain::ChainGateway`]

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::uninlined_format_args)]

pub mod aggregator;
pub mod chain;
pub mod config;
pub mod error;
pub mod helpers;
pub mod monitor;
pub mod orchestrator;
#[cfg(test)]
mod test_helpers;

pub use config::{OkxCredentials, SwapConfig};
pub use error::SwapError;
pub use orchestrator::SwapOrchestrator;
