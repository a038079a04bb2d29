/// Handle resolution fallback chain
///
/// Turns a full handle into a DID: syntax gate, directory lookup, and, for
/// handles off the default hosting domain, concurrent DNS TXT and well-known
/// fallbacks. Terminal outcomes are a DID or "unresolved"; transport failures
/// along the chain are swallowed as non-matches.
use crate::{
    error::IdentityResult,
    identifier::{is_default_domain_handle, is_valid_handle},
    transport::IdentityTransport,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Subdomain whose TXT record may carry a handle's DID
const DNS_TXT_SUBDOMAIN: &str = "_atproto";

/// Prefix of the DID-bearing TXT record value
const DNS_DID_PREFIX: &str = "did=";

/// Handle -> DID resolver
#[derive(Clone)]
pub struct HandleResolver {
    transport: Arc<dyn IdentityTransport>,
}

impl HandleResolver {
    pub fn new(transport: Arc<dyn IdentityTransport>) -> Self {
        Self { transport }
    }

    /// Resolve a full handle to a full DID.
    ///
    /// `Ok(None)` means unresolved: invalid syntax, no source confirmed the
    /// handle, or the attempt was cancelled. Never returns an error; every
    /// step degrades to a non-match.
    pub async fn resolve(
        &self,
        full_handle: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<String>> {
        if !is_valid_handle(full_handle) {
            return Ok(None);
        }

        let primary = match self.transport.resolve_handle(full_handle, cancel).await {
            Ok(did) => did,
            Err(e) if e.is_cancelled() => return Ok(None),
            Err(e) => {
                debug!("Directory lookup failed for {}: {}", full_handle, e);
                None
            }
        };

        // The directory is authoritative for handles on its own hosting
        // domain: no fallback even on a miss
        if primary.is_some() || is_default_domain_handle(full_handle) {
            return Ok(primary);
        }

        let (dns, well_known) = tokio::join!(
            self.resolve_from_dns(full_handle, cancel),
            self.resolve_from_well_known(full_handle, cancel),
        );

        // DNS wins when both fallbacks produced a DID
        Ok(dns.or(well_known))
    }

    /// TXT lookup on the `_atproto` subdomain, over HTTPS.
    async fn resolve_from_dns(
        &self,
        full_handle: &str,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let name = format!("{}.{}", DNS_TXT_SUBDOMAIN, full_handle);

        match self.transport.lookup_txt(&name, cancel).await {
            Ok(records) => {
                let did = records.iter().find_map(|record| {
                    record
                        .strip_prefix(DNS_DID_PREFIX)
                        .filter(|value| value.starts_with("did:"))
                        .map(str::to_string)
                });
                if did.is_none() {
                    debug!("Handle did not resolve via DNS: {}", full_handle);
                }
                did
            }
            Err(e) => {
                if !e.is_cancelled() {
                    debug!("DNS fallback failed for {}: {}", full_handle, e);
                }
                None
            }
        }
    }

    /// Well-known path fetch on the handle's own domain.
    async fn resolve_from_well_known(
        &self,
        full_handle: &str,
        cancel: &CancellationToken,
    ) -> Option<String> {
        match self
            .transport
            .fetch_well_known_did(full_handle, cancel)
            .await
        {
            Ok(did) => did,
            Err(e) => {
                if !e.is_cancelled() {
                    debug!("Well-known fallback failed for {}: {}", full_handle, e);
                }
                None
            }
        }
    }
}
