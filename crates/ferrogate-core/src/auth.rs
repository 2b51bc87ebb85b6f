//! Credentials and the request-signing boundary.
//!
//! The core never computes signatures. Private endpoints hand the canonical
//! request to a caller-supplied [`RequestSigner`] (HMAC for Binance, JWT for
//! Upbit) and attach whatever it returns.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

use crate::http_client::{HttpAuth, HttpMethod};
use crate::{EpochMillis, ExchangeId, GatewayError};

/// Name-tagged exchange secrets, e.g. `"API key"` and `"API secret"`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the named secret, failing when it is missing or blank.
    pub fn require(&self, name: &str, exchange: ExchangeId) -> Result<&str, GatewayError> {
        match self.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(GatewayError::configuration(format!(
                "credential '{name}' for {exchange} is empty"
            ))),
            None => Err(GatewayError::configuration(format!(
                "credential '{name}' for {exchange} is missing"
            ))),
        }
    }

    pub fn validate(&self, required: &[&str], exchange: ExchangeId) -> Result<(), GatewayError> {
        required
            .iter()
            .try_for_each(|name| self.require(name, exchange).map(|_| ()))
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|name| (name, "<redacted>")))
            .finish()
    }
}

/// Canonical request handed to a signer.
#[derive(Debug, Clone, Copy)]
pub struct SigningPayload<'a> {
    pub exchange: ExchangeId,
    pub method: HttpMethod,
    pub path: &'a str,
    /// Percent-encoded query string without the leading `?`.
    pub query: &'a str,
    pub body: Option<&'a str>,
    pub timestamp: EpochMillis,
}

/// Signer output: auth material plus any query parameters to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub auth: HttpAuth,
    pub extra_query: Vec<(String, String)>,
}

impl Signature {
    pub fn header(auth: HttpAuth) -> Self {
        Self {
            auth,
            extra_query: Vec::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_query.push((name.into(), value.into()));
        self
    }
}

/// External signer contract for private endpoints.
pub trait RequestSigner: Send + Sync {
    fn sign(
        &self,
        credentials: &Credentials,
        payload: &SigningPayload<'_>,
    ) -> Result<Signature, GatewayError>;
}

/// Signer used when none was configured; private calls fail as unauthenticated.
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingSigner;

impl RequestSigner for MissingSigner {
    fn sign(
        &self,
        _credentials: &Credentials,
        payload: &SigningPayload<'_>,
    ) -> Result<Signature, GatewayError> {
        Err(GatewayError::AuthenticationFailed(format!(
            "no request signer configured for private {} endpoint {}",
            payload.exchange, payload.path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_blank_values() {
        let credentials = Credentials::new().with("API key", "abc").with("API secret", "  ");

        assert_eq!(credentials.require("API key", ExchangeId::Binance), Ok("abc"));

        let blank = credentials
            .require("API secret", ExchangeId::Binance)
            .expect_err("blank must fail");
        assert!(blank.to_string().contains("'API secret'"));
        assert!(blank.to_string().contains("empty"));

        let missing = Credentials::new()
            .validate(&["Access key"], ExchangeId::Upbit)
            .expect_err("missing must fail");
        assert_eq!(
            missing,
            GatewayError::Configuration(String::from(
                "credential 'Access key' for upbit is missing"
            ))
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credentials = Credentials::from_pairs([("API secret", "super-secret")]);
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("API secret"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn missing_signer_fails_as_authentication_error() {
        let payload = SigningPayload {
            exchange: ExchangeId::Binance,
            method: HttpMethod::Get,
            path: "/api/v3/account",
            query: "timestamp=1",
            body: None,
            timestamp: 1,
        };
        let err = MissingSigner
            .sign(&Credentials::new(), &payload)
            .expect_err("must fail");
        assert!(matches!(err, GatewayError::AuthenticationFailed(_)));
    }
}
