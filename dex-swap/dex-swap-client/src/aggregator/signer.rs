//! Request signing for the OKX API
//!
//! Every request carries an HMAC-SHA256 over
//! `timestamp + METHOD + path + (query | body)`, base64 encoded

use base64::Engine;
use chrono::{SecondsFormat, Utc};
use hmac::Mac;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::{config::OkxCredentials, error::SwapError};

/// The header name for the project ID
pub const OKX_PROJECT_HEADER: &str = "OK-ACCESS-PROJECT";
/// The header name for the API key
pub const OKX_API_KEY_HEADER: &str = "OK-ACCESS-KEY";
/// The header name for the API authentication HMAC
pub const OKX_API_HMAC_HEADER: &str = "OK-ACCESS-SIGN";
/// The header name for the passphrase
pub const OKX_PASSPHRASE_HEADER: &str = "OK-ACCESS-PASSPHRASE";
/// The header name for the request timestamp
pub const OKX_TIMESTAMP_HEADER: &str = "OK-ACCESS-TIMESTAMP";

/// Signs requests to the OKX API
#[derive(Clone, Debug)]
pub struct RequestSigner {
    /// The credentials to sign with
    credentials: OkxCredentials,
}

impl RequestSigner {
    /// Create a new signer, failing if any credential is missing
    pub fn new(credentials: OkxCredentials) -> Result<Self, SwapError> {
        credentials.validate()?;
        Ok(Self { credentials })
    }

    /// The current instant as an ISO-8601 timestamp with millisecond precision
    pub fn timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true /* use_z */)
    }

    /// Compute the request signature
    ///
    /// `body_or_query` is the literal query string including its leading `?`
    /// for GET requests, or the literal JSON body for POST requests
    pub fn signature(
        &self,
        iso_timestamp: &str,
        method: &str,
        path: &str,
        body_or_query: &str,
    ) -> Result<String, SwapError> {
        let mut hmac =
            hmac::Hmac::<sha2::Sha256>::new_from_slice(self.credentials.secret_key.as_bytes())
                .map_err(SwapError::config)?;

        let message = format!("{iso_timestamp}{method}{path}{body_or_query}");
        hmac.update(message.as_bytes());

        let hmac_bytes = hmac.finalize().into_bytes();
        Ok(base64::engine::general_purpose::STANDARD.encode(hmac_bytes))
    }

    /// Build the full set of authentication headers for a request
    pub fn sign(
        &self,
        iso_timestamp: &str,
        method: &str,
        path: &str,
        body_or_query: &str,
    ) -> Result<HeaderMap, SwapError> {
        let signature = self.signature(iso_timestamp, method, path, body_or_query)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let pairs = [
            (OKX_PROJECT_HEADER, self.credentials.project_id.as_str()),
            (OKX_API_KEY_HEADER, self.credentials.api_key.as_str()),
            (OKX_API_HMAC_HEADER, signature.as_str()),
            (OKX_PASSPHRASE_HEADER, self.credentials.passphrase.as_str()),
            (OKX_TIMESTAMP_HEADER, iso_timestamp),
        ];
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(SwapError::config)?;
            let value = HeaderValue::from_str(value).map_err(SwapError::config)?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}
