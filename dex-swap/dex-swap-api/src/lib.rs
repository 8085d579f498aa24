//! Caller-facing types for the dex swap client
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod amounts;
mod serialization;
mod types;
pub use types::*;
