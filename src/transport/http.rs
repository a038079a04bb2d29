/// Production HTTP transport
///
/// XRPC requests against the directory service and the public AppView,
/// DNS-over-HTTPS TXT lookups, and per-domain well-known fetches, all over one
/// shared reqwest client.
use crate::{
    config::IdentityConfig,
    error::{IdentityError, IdentityResult},
    transport::{
        DohResponse, GetProfilesResponse, IdentityTransport, ProfileRecord,
        ResolveHandleResponse, XrpcErrorResponse,
    },
};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DNS_TYPE_TXT: u16 = 16;

/// HTTP implementation of the identity transports
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    directory_url: String,
    appview_url: String,
    doh_url: String,
}

impl HttpTransport {
    /// Create a new HTTP transport from configuration
    pub fn new(config: &IdentityConfig) -> IdentityResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                IdentityError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            directory_url: config.directory_url.clone(),
            appview_url: config.appview_url.clone(),
            doh_url: config.doh_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityTransport for HttpTransport {
    async fn resolve_handle(
        &self,
        full_handle: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<String>> {
        let url = format!(
            "{}/com.atproto.identity.resolveHandle?handle={}",
            self.directory_url,
            urlencoding::encode(full_handle)
        );

        with_cancel(cancel, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| IdentityError::Transport(format!("resolveHandle failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                // The directory signals an unknown handle with an XRPC error
                // body; that is an explicit not-found, not a failure
                if let Ok(err) = response.json::<XrpcErrorResponse>().await {
                    if err
                        .message
                        .as_deref()
                        .is_some_and(|m| m.contains("Unable to resolve handle"))
                    {
                        return Ok(None);
                    }
                }
                return Err(IdentityError::Transport(format!(
                    "resolveHandle returned {}",
                    status
                )));
            }

            let resolved: ResolveHandleResponse = response
                .json()
                .await
                .map_err(|e| IdentityError::Transport(format!("Invalid resolveHandle body: {}", e)))?;

            Ok(resolved.did.filter(|did| !did.is_empty()))
        })
        .await
    }

    async fn get_profiles(
        &self,
        full_dids: &[String],
        cancel: &CancellationToken,
    ) -> IdentityResult<Vec<ProfileRecord>> {
        let url = format!(
            "{}/app.bsky.actor.getProfiles?{}",
            self.appview_url,
            actors_query(full_dids)
        );

        with_cancel(cancel, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| IdentityError::Transport(format!("getProfiles failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(IdentityError::Transport(format!(
                    "getProfiles returned {}",
                    response.status()
                )));
            }

            let body: GetProfilesResponse = response
                .json()
                .await
                .map_err(|e| IdentityError::Transport(format!("Invalid getProfiles body: {}", e)))?;

            Ok(body.profiles)
        })
        .await
    }

    async fn lookup_txt(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Vec<String>> {
        let url = format!(
            "{}?name={}&type=TXT",
            self.doh_url,
            urlencoding::encode(name)
        );

        with_cancel(cancel, async {
            debug!("DNS TXT lookup over HTTPS: {}", name);

            let response = self
                .client
                .get(&url)
                .header("accept", "application/dns-json")
                .send()
                .await
                .map_err(|e| IdentityError::Transport(format!("DoH lookup failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(IdentityError::Transport(format!(
                    "DoH resolver returned {}",
                    response.status()
                )));
            }

            let body: DohResponse = response
                .json()
                .await
                .map_err(|e| IdentityError::Transport(format!("Invalid DoH body: {}", e)))?;

            Ok(body
                .answer
                .into_iter()
                .filter(|a| a.record_type == DNS_TYPE_TXT)
                .map(|a| strip_txt_quotes(&a.data).to_string())
                .collect())
        })
        .await
    }

    async fn fetch_well_known_did(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<String>> {
        let url = format!("https://{}/.well-known/atproto-did", domain);

        with_cancel(cancel, async {
            debug!("Well-known DID fetch: {}", url);

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| IdentityError::Transport(format!("Well-known fetch failed: {}", e)))?;

            // Domains without the well-known file are a plain no-match
            if !response.status().is_success() {
                return Ok(None);
            }

            let text = response
                .text()
                .await
                .map_err(|e| IdentityError::Transport(format!("Well-known read failed: {}", e)))?;

            let did = text.trim();
            if did.starts_with("did:") {
                Ok(Some(did.to_string()))
            } else {
                Ok(None)
            }
        })
        .await
    }
}

/// Race a transport future against the caller's cancellation token.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = IdentityResult<T>>,
) -> IdentityResult<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(IdentityError::Cancelled),
        result = fut => result,
    }
}

/// Repeated `actors=` query parameters, one per DID.
fn actors_query(full_dids: &[String]) -> String {
    full_dids
        .iter()
        .map(|did| format!("actors={}", urlencoding::encode(did)))
        .collect::<Vec<_>>()
        .join("&")
}

/// DoH resolvers return TXT record data wrapped in quotes.
fn strip_txt_quotes(data: &str) -> &str {
    data.trim().trim_matches('"')
}
