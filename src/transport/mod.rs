/// Network Transports
///
/// The identity core talks to four opaque collaborators: the directory
/// service's handle-resolution endpoint, the AppView's bulk profile endpoint,
/// a DNS-TXT-over-HTTPS resolver, and per-domain well-known fetches. All four
/// sit behind one trait so tests can substitute a counting mock, and every
/// response passes a validated serde decode step at this boundary; nothing
/// duck-typed travels further in.

pub mod http;

pub use http::HttpTransport;

use crate::error::IdentityResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The four network lookups the identity core depends on.
///
/// Every operation accepts a cancellation token and must fail or time out
/// independently without corrupting the others' outcomes. "No result" is
/// `Ok(None)` / an empty vector; errors are reserved for transport failures.
#[async_trait]
pub trait IdentityTransport: Send + Sync {
    /// Resolve a full handle to a DID via the directory service.
    async fn resolve_handle(
        &self,
        full_handle: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<String>>;

    /// Fetch full profile records for a batch of full DIDs.
    ///
    /// The response carries one record per DID the AppView knows about;
    /// requested DIDs may be absent and response order is unspecified.
    async fn get_profiles(
        &self,
        full_dids: &[String],
        cancel: &CancellationToken,
    ) -> IdentityResult<Vec<ProfileRecord>>;

    /// Look up TXT records for a DNS name over HTTPS.
    async fn lookup_txt(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Vec<String>>;

    /// Fetch the bare DID published at a domain's well-known path.
    async fn fetch_well_known_did(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<String>>;
}

/// A profile record as returned by app.bsky.actor.getProfiles.
///
/// Optional fields that fail to parse are nulled by serde rather than
/// propagated as unknown values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelRecord>,
}

/// A moderation label attached to a profile record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRecord {
    pub val: String,
    /// Negation flag: a negated label retracts an earlier one
    #[serde(default)]
    pub neg: bool,
}

/// Response shape of app.bsky.actor.getProfiles
#[derive(Debug, Deserialize)]
pub(crate) struct GetProfilesResponse {
    pub profiles: Vec<ProfileRecord>,
}

/// Response shape of com.atproto.identity.resolveHandle
#[derive(Debug, Deserialize)]
pub(crate) struct ResolveHandleResponse {
    pub did: Option<String>,
}

/// XRPC error body
#[derive(Debug, Deserialize)]
pub(crate) struct XrpcErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// DNS-over-HTTPS JSON answer envelope
#[derive(Debug, Deserialize)]
pub(crate) struct DohResponse {
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DohAnswer {
    #[serde(rename = "type")]
    pub record_type: u16,
    pub data: String,
}
