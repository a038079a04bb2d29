/// Configuration management for the SkyLens identity core
use crate::error::{IdentityError, IdentityResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Identity resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// XRPC base URL of the directory service used for primary handle
    /// resolution (com.atproto.identity.resolveHandle)
    pub directory_url: String,
    /// XRPC base URL of the public AppView used for bulk profile lookups
    /// (app.bsky.actor.getProfiles)
    pub appview_url: String,
    /// DNS-over-HTTPS endpoint for _atproto TXT fallback lookups
    pub doh_url: String,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// How long a batch window stays open collecting DIDs, in milliseconds
    pub batch_window_ms: u64,
    /// Maximum number of DIDs carried by one bulk profile request
    pub max_batch_size: usize,
    /// Age after which a cache entry is served stale and refreshed in the
    /// background, in seconds
    pub cache_stale_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            directory_url: "https://bsky.social/xrpc".to_string(),
            appview_url: "https://public.api.bsky.app/xrpc".to_string(),
            doh_url: "https://mozilla.cloudflare-dns.com/dns-query".to_string(),
            user_agent: "SkyLens/0.1".to_string(),
            request_timeout_secs: 10,
            batch_window_ms: 10,
            max_batch_size: 25,
            cache_stale_secs: 600,
        }
    }
}

impl IdentityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> IdentityResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let directory_url =
            env::var("SKYLENS_DIRECTORY_URL").unwrap_or(defaults.directory_url);
        let appview_url = env::var("SKYLENS_APPVIEW_URL").unwrap_or(defaults.appview_url);
        let doh_url = env::var("SKYLENS_DOH_URL").unwrap_or(defaults.doh_url);
        let user_agent = env::var("SKYLENS_USER_AGENT").unwrap_or(defaults.user_agent);

        let request_timeout_secs = env::var("SKYLENS_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults.request_timeout_secs.to_string())
            .parse()
            .map_err(|_| IdentityError::Config("Invalid request timeout".to_string()))?;
        let batch_window_ms = env::var("SKYLENS_BATCH_WINDOW_MS")
            .unwrap_or_else(|_| defaults.batch_window_ms.to_string())
            .parse()
            .map_err(|_| IdentityError::Config("Invalid batch window".to_string()))?;
        let max_batch_size = env::var("SKYLENS_MAX_BATCH_SIZE")
            .unwrap_or_else(|_| defaults.max_batch_size.to_string())
            .parse()
            .map_err(|_| IdentityError::Config("Invalid batch size".to_string()))?;
        let cache_stale_secs = env::var("SKYLENS_CACHE_STALE_SECS")
            .unwrap_or_else(|_| defaults.cache_stale_secs.to_string())
            .parse()
            .map_err(|_| IdentityError::Config("Invalid cache staleness interval".to_string()))?;

        let config = Self {
            directory_url,
            appview_url,
            doh_url,
            user_agent,
            request_timeout_secs,
            batch_window_ms,
            max_batch_size,
            cache_stale_secs,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> IdentityResult<()> {
        if self.directory_url.is_empty() || self.appview_url.is_empty() {
            return Err(IdentityError::Config(
                "Service URLs cannot be empty".to_string(),
            ));
        }

        if self.max_batch_size == 0 {
            return Err(IdentityError::Config(
                "Batch size must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(IdentityError::Config(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
