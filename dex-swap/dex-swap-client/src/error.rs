//! Error types for the dex swap client

/// An error returned by the dex swap client
#[derive(Debug, Clone, thiserror::Error)]
pub enum SwapError {
    /// Missing or malformed configuration
    #[error("config error: {0}")]
    Config(String),
    /// The aggregator or node could not be reached
    #[error("network error: {0}")]
    Network(String),
    /// The aggregator rejected the request credentials
    #[error("auth error: {0}")]
    Auth(String),
    /// The aggregator reported a business error
    #[error("provider error ({code}): {message}")]
    Provider {
        /// The aggregator's error code
        code: String,
        /// The aggregator's error message
        message: String,
    },
    /// The aggregator reported an error while quoting
    #[error("quote error ({code}): {message}")]
    Quote {
        /// The aggregator's error code
        code: String,
        /// The aggregator's error message
        message: String,
    },
    /// The node rejected a signed transaction
    #[error("broadcast error: {0}")]
    Broadcast(String),
    /// No receipt was found within the polling budget
    #[error("confirmation timeout: {0}")]
    ConfirmationTimeout(String),
    /// The caller supplied invalid swap parameters
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// A non-success HTTP status other than an auth failure
    #[error("http error: {0}")]
    Http(String),
    /// The node returned an error for a read
    #[error("rpc error: {0}")]
    Rpc(String),
    /// A payload could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
}

impl SwapError {
    /// Create a new config error
    #[allow(clippy::needless_pass_by_value)]
    pub fn config<T: ToString>(e: T) -> Self {
        SwapError::Config(e.to_string())
    }

    /// Create a new network error
    #[allow(clippy::needless_pass_by_value)]
    pub fn network<T: ToString>(e: T) -> Self {
        SwapError::Network(e.to_string())
    }

    /// Create a new auth error
    #[allow(clippy::needless_pass_by_value)]
    pub fn auth<T: ToString>(e: T) -> Self {
        SwapError::Auth(e.to_string())
    }

    /// Create a new broadcast error
    #[allow(clippy::needless_pass_by_value)]
    pub fn broadcast<T: ToString>(e: T) -> Self {
        SwapError::Broadcast(e.to_string())
    }

    /// Create a new invalid params error
    #[allow(clippy::needless_pass_by_value)]
    pub fn invalid_params<T: ToString>(e: T) -> Self {
        SwapError::InvalidParams(e.to_string())
    }

    /// Create a new http error
    #[allow(clippy::needless_pass_by_value)]
    pub fn http<T: ToString>(e: T) -> Self {
        SwapError::Http(e.to_string())
    }

    /// Create a new rpc error
    #[allow(clippy::needless_pass_by_value)]
    pub fn rpc<T: ToString>(e: T) -> Self {
        SwapError::Rpc(e.to_string())
    }

    /// Create a new parse error
    #[allow(clippy::needless_pass_by_value)]
    pub fn parse<T: ToString>(e: T) -> Self {
        SwapError::Parse(e.to_string())
    }

    /// Convert a provider error into a quote error, leaving other kinds as is
    pub fn into_quote_error(self) -> Self {
        match self {
            SwapError::Provider { code, message } => SwapError::Quote { code, message },
            other => other,
        }
    }

    /// A human-readable message describing the error and how to act on it
    ///
    /// Node rejections are matched against known substrings and translated;
    /// the raw node message is never returned
    pub fn user_message(&self) -> String {
        match self {
            SwapError::Config(msg) => format!("Configuration error: {msg}"),
            SwapError::Network(_) => {
                "Network connection failed: check the RPC URL, the aggregator base URL, and your network connection".to_string()
            },
            SwapError::Auth(_) => {
                "Aggregator authentication failed: check your API credentials (key, secret, passphrase, and project id)".to_string()
            },
            SwapError::Provider { code, message } => {
                format!("Aggregator error {code}: {message}")
            },
            SwapError::Quote { code, message } => {
                format!("Quote failed with aggregator error {code}: {message}")
            },
            SwapError::Broadcast(msg) => broadcast_hint(msg),
            SwapError::ConfirmationTimeout(_) => {
                "Transaction not yet confirmed: it may still be mined, check its status again later".to_string()
            },
            SwapError::InvalidParams(msg) => format!("Invalid swap parameters: {msg}"),
            SwapError::Http(_) => "The aggregator returned an unexpected HTTP error".to_string(),
            SwapError::Rpc(_) => "The blockchain node returned an error".to_string(),
            SwapError::Parse(_) => "Received a response that could not be understood".to_string(),
        }
    }
}

/// Translate a node's rejection of a transaction into an actionable message
fn broadcast_hint(raw: &str) -> String {
    let raw = raw.to_lowercase();
    let hint = if raw.contains("insufficient") {
        "Insufficient balance or gas: check the wallet's BNB balance"
    } else if raw.contains("underpriced") {
        "Gas price too low: the transaction was underpriced, retry the swap"
    } else if raw.contains("nonce too low") {
        "Nonce already used: another transaction from this wallet was mined first, retry the swap"
    } else if raw.contains("allowance") {
        "Token allowance too low: approve the token before swapping"
    } else if raw.contains("reverted") {
        "Transaction reverted: slippage may be too tight or liquidity insufficient"
    } else {
        "The node rejected the transaction"
    };

    hint.to_string()
}

impl From<reqwest::Error> for SwapError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            SwapError::network(e)
        } else {
            SwapError::http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Insufficient-funds rejections map to a balance hint without leaking
    /// the node's message
    #[test]
    fn test_insufficient_funds_hint() {
        let raw = "insufficient funds for gas * price + value: have 0 want 42";
        let msg = SwapError::broadcast(raw).user_message();

        assert!(msg.contains("balance"));
        assert!(!msg.contains("have 0 want 42"));
    }

    #[test]
    fn test_broadcast_hints() {
        let cases = [
            ("replacement transaction underpriced", "underpriced"),
            ("nonce too low: next nonce 5, tx nonce 4", "Nonce"),
            ("ERC20: transfer amount exceeds allowance", "approve"),
            ("execution reverted", "slippage"),
            ("something unexpected", "rejected"),
        ];

        for (raw, expected) in cases {
            let msg = SwapError::broadcast(raw).user_message();
            assert!(msg.contains(expected), "{raw:?} produced {msg:?}");
        }
    }

    #[test]
    fn test_auth_message_mentions_credentials() {
        let msg = SwapError::auth("status code 401").user_message();
        assert!(msg.contains("credentials"));
    }

    #[test]
    fn test_provider_into_quote() {
        let err = SwapError::Provider { code: "82000".into(), message: "no route".into() };
        match err.into_quote_error() {
            SwapError::Quote { code, message } => {
                assert_eq!(code, "82000");
                assert_eq!(message, "no route");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
