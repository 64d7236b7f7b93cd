//! Link negotiation with the remote endpoint.
//!
//! Transport errors, a missing header and an unusable header all collapse
//! into "no redirect". Callers treat that as the signal to commit the main
//! application.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderName};
use url::Url;

use crate::error::{GateFailure, NegotiationError};
use crate::gate::fingerprint::DeviceFingerprint;
use crate::gate::push::PushToken;

/// Issues the one-time negotiation request.
#[async_trait]
pub trait LinkNegotiator: Send + Sync {
    /// `Ok(None)` means "no redirect".
    async fn negotiate(
        &self,
        endpoint: &Url,
        fingerprint: &DeviceFingerprint,
        token: &PushToken,
    ) -> Result<Option<Url>, NegotiationError>;
}

/// Build the negotiation URL: the endpoint plus one percent-encoded query
/// parameter per fingerprint field and the token.
pub fn build_request_url(
    endpoint: &Url,
    fingerprint: &DeviceFingerprint,
    token: &PushToken,
) -> Result<Url, NegotiationError> {
    if endpoint.cannot_be_a_base() {
        return Err(NegotiationError::MalformedRequest {
            endpoint: endpoint.to_string(),
            reason: "endpoint cannot carry a query".to_string(),
        });
    }

    let mut url = endpoint.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("uuid", &fingerprint.uuid)
        .append_pair("token", token.expose())
        .append_pair("model_id", &fingerprint.model_id)
        .append_pair("os", &fingerprint.os)
        .append_pair("lang", &fingerprint.lang)
        .append_pair("rg", &fingerprint.rg)
        .append_pair("bld", &fingerprint.bld);
    Ok(url)
}

/// Pull the candidate link out of the response headers.
///
/// Header lookup is case-insensitive. The value must look like a URL
/// reference: non-empty, no whitespace or control characters.
pub fn extract_candidate(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    Some(value.to_string())
}

/// Resolve a candidate into the final redirect target.
///
/// If the candidate is base64 for UTF-8 text that parses as a URL, the
/// decoded URL wins. Otherwise the raw candidate is used when it is itself an
/// absolute URL. Anything else is no target.
///
/// A plain URL that happens to also be valid base64 of another URL resolves
/// to the decoded one.
pub fn resolve_target(candidate: &str) -> Option<Url> {
    if let Some(decoded) = decode_base64_url(candidate) {
        return Some(decoded);
    }
    Url::parse(candidate).ok()
}

fn decode_base64_url(candidate: &str) -> Option<Url> {
    let bytes = STANDARD.decode(candidate).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    Url::parse(text.trim()).ok()
}

/// `reqwest` implementation of [`LinkNegotiator`].
#[derive(Debug, Clone)]
pub struct HttpLinkNegotiator {
    client: reqwest::Client,
    header_name: HeaderName,
}

impl HttpLinkNegotiator {
    /// Client with the platform default timeout and no retries.
    pub fn new(header_name: HeaderName) -> Result<Self, NegotiationError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, header_name))
    }

    pub fn with_client(client: reqwest::Client, header_name: HeaderName) -> Self {
        Self {
            client,
            header_name,
        }
    }
}

#[async_trait]
impl LinkNegotiator for HttpLinkNegotiator {
    async fn negotiate(
        &self,
        endpoint: &Url,
        fingerprint: &DeviceFingerprint,
        token: &PushToken,
    ) -> Result<Option<Url>, NegotiationError> {
        let url = build_request_url(endpoint, fingerprint, token)?;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    failure = GateFailure::Transport.as_str(),
                    "Negotiation request failed: {}",
                    e.without_url()
                );
                return Ok(None);
            }
        };
        tracing::debug!(status = response.status().as_u16(), "Negotiation response");

        let Some(candidate) = extract_candidate(response.headers(), &self.header_name) else {
            tracing::info!("Header {} not found", self.header_name);
            return Ok(None);
        };

        let target = resolve_target(&candidate);
        if target.is_none() {
            tracing::info!("Header {} carried no usable link", self.header_name);
        }
        Ok(target)
    }
}
