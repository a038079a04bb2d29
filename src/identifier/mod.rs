/// Identifier Normalization
///
/// Classifies raw user input as a DID or a handle and converts between the
/// compact display ("short") and canonical wire ("full") representations.
///
/// Everything here is pure string transformation: these functions run on every
/// keystroke of live UI input, so they never perform I/O, never suspend, and
/// never fail. Malformed or partially-typed input degrades to `None`, an empty
/// string, or the input unchanged.
use lazy_static::lazy_static;
use regex::Regex;

/// Domain suffix assumed for bare handles ("alice" -> "alice.bsky.social")
pub const DEFAULT_HANDLE_DOMAIN: &str = "bsky.social";

/// The DID method prefix assumed for bare DID tokens
pub const DEFAULT_DID_PREFIX: &str = "did:plc:";

lazy_static! {
    static ref POST_URL_RE: Regex =
        Regex::new(r"^https?://bsky\.app/profile/([a-z0-9.:-]+)/post/([a-z0-9]+)$").unwrap();
    static ref PROFILE_URL_RE: Regex =
        Regex::new(r"^https?://bsky\.app/profile/([a-z0-9.:-]+)/?$").unwrap();
    static ref HANDLE_RE: Regex =
        Regex::new(r"^([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").unwrap();
}

/// A user-supplied account identifier, classified.
///
/// The enum makes the classification invariant structural: a value is exactly
/// one of the two kinds, never both, never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Did(String),
    Handle(String),
}

impl Identifier {
    /// Make a guess whether the given text is a DID or a handle.
    ///
    /// Empty or whitespace-only input classifies as a handle with an empty
    /// value, so callers downstream can uniformly treat it as "nothing to
    /// resolve".
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if likely_did(trimmed) {
            Identifier::Did(trimmed.to_string())
        } else {
            Identifier::Handle(trimmed.to_string())
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Identifier::Did(v) => v,
            Identifier::Handle(v) => v,
        }
    }
}

/// Heuristic DID detection: an explicit `did:` scheme, or a bare 24-character
/// alphanumeric token (the length of a did:plc identifier body).
pub fn likely_did(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("did:")
        || (trimmed.len() == 24 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Expand a short DID to its canonical wire form.
///
/// Prepends `did:plc:` when the input carries no method delimiter; lowercases.
/// Empty input yields `None`.
pub fn full_did(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(':') {
        Some(trimmed.to_lowercase())
    } else {
        Some(format!("{}{}", DEFAULT_DID_PREFIX, trimmed.to_lowercase()))
    }
}

/// Compact a full DID for display: strips the default method prefix,
/// lowercases. Empty input passes through unchanged.
pub fn short_did(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    match lower.strip_prefix(DEFAULT_DID_PREFIX) {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Expand user handle input to its canonical wire form.
///
/// Strips a leading `@`, unwraps a pasted bsky.app profile/post link or
/// `at://` URI into the identifier it contains, punycodes, and appends the
/// default domain when the value has no dot. An unwrapped value that is itself
/// DID-shaped is returned as-is so the caller can route it down the DID path
/// instead of gluing a domain suffix onto it.
pub fn full_handle(input: &str) -> Option<String> {
    let handle = cheap_normalize_handle(input);
    if handle.is_empty() {
        return None;
    }
    if likely_did(&handle) {
        return Some(handle);
    }
    // Punycode step; undecodable labels degrade to the input unchanged
    let ascii = idna::domain_to_ascii(&handle).unwrap_or(handle);
    if ascii.contains('.') {
        Some(ascii.to_lowercase())
    } else {
        Some(format!("{}.{}", ascii.to_lowercase(), DEFAULT_HANDLE_DOMAIN))
    }
}

/// Compact a handle for display: strips the default domain suffix, lowercases.
pub fn short_handle(input: &str) -> Option<String> {
    let handle = cheap_normalize_handle(input);
    if handle.is_empty() {
        return None;
    }
    let stripped = handle
        .strip_suffix(&format!(".{}", DEFAULT_HANDLE_DOMAIN))
        .unwrap_or(&handle);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_lowercase())
    }
}

/// Whether a full handle lives on the platform's default hosting domain,
/// making the primary directory lookup authoritative for it.
pub fn is_default_domain_handle(handle: &str) -> bool {
    handle.ends_with(&format!(".{}", DEFAULT_HANDLE_DOMAIN))
}

/// Check a full handle against the protocol handle grammar: dot-separated
/// labels of alphanumerics with inner hyphens, final label alphabetic.
pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_RE.is_match(handle)
}

/// A bsky.app post URL broken into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    /// The account segment: a handle or a DID, short or full
    pub account: String,
    pub post_id: String,
}

/// A record reference carried in an `at://` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRef {
    pub did: String,
    pub post_id: String,
}

/// Break a `https://bsky.app/profile/<account>/post/<rkey>` URL apart.
pub fn break_post_url(url: &str) -> Option<PostRef> {
    let caps = POST_URL_RE.captures(url)?;
    Some(PostRef {
        account: caps[1].to_string(),
        post_id: caps[2].to_string(),
    })
}

/// Break an `at://<did>/<collection>/<rkey>` URI apart.
pub fn break_feed_uri(uri: &str) -> Option<FeedRef> {
    let rest = uri.strip_prefix("at://")?;
    let mut parts = rest.split('/');
    let did = parts.next()?;
    let _collection = parts.next();
    let post_id = parts.next()?;
    if did.is_empty() || post_id.is_empty() {
        return None;
    }
    Some(FeedRef {
        did: did.to_string(),
        post_id: post_id.to_string(),
    })
}

/// CDN URL for an account's avatar blob
pub fn profile_blob_url(did: &str, cid: &str) -> Option<String> {
    if did.is_empty() || cid.is_empty() {
        return None;
    }
    Some(format!(
        "https://cdn.bsky.app/img/avatar/plain/{}/{}@jpeg",
        full_did(did)?,
        cid
    ))
}

/// CDN URL for a feed generator's thumbnail blob
pub fn feed_blob_url(did: &str, cid: &str) -> Option<String> {
    if did.is_empty() || cid.is_empty() {
        return None;
    }
    Some(format!(
        "https://cdn.bsky.app/img/feed_thumbnail/plain/{}/{}@jpeg",
        full_did(did)?,
        cid
    ))
}

/// Shared cheap normalization for handle input: trim, lowercase, strip a
/// leading `@`, and unwrap pasted bsky.app links and `at://` URIs into the
/// identifier they contain.
fn cheap_normalize_handle(input: &str) -> String {
    let mut handle = input.trim().to_lowercase();

    if let Some(stripped) = handle.strip_prefix('@') {
        handle = stripped.to_string();
    }

    if handle.starts_with("https://bsky.app/") || handle.starts_with("http://bsky.app/") {
        if let Some(post) = break_post_url(&handle) {
            return post.account;
        }
        if let Some(caps) = PROFILE_URL_RE.captures(&handle) {
            return caps[1].to_string();
        }
    }

    if handle.starts_with("at:") {
        if let Some(feed) = break_feed_uri(&handle) {
            return feed.did;
        }
    }

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_did_scheme() {
        assert_eq!(
            Identifier::classify("did:plc:z72i7hdynmk6r22z27h6tvur"),
            Identifier::Did("did:plc:z72i7hdynmk6r22z27h6tvur".to_string())
        );
    }

    #[test]
    fn test_classify_bare_token() {
        // 24-char alphanumeric token is treated as a bare did:plc body
        assert_eq!(
            Identifier::classify("z72i7hdynmk6r22z27h6tvur"),
            Identifier::Did("z72i7hdynmk6r22z27h6tvur".to_string())
        );
    }

    #[test]
    fn test_classify_handle() {
        assert_eq!(
            Identifier::classify("alice.test"),
            Identifier::Handle("alice.test".to_string())
        );
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(Identifier::classify(""), Identifier::Handle(String::new()));
        assert_eq!(
            Identifier::classify("   "),
            Identifier::Handle(String::new())
        );
    }

    #[test]
    fn test_full_did_prepends_prefix() {
        assert_eq!(
            full_did("z72i7hdynmk6r22z27h6tvur"),
            Some("did:plc:z72i7hdynmk6r22z27h6tvur".to_string())
        );
    }

    #[test]
    fn test_full_did_keeps_other_methods() {
        assert_eq!(
            full_did("did:web:example.com"),
            Some("did:web:example.com".to_string())
        );
    }

    #[test]
    fn test_full_did_empty() {
        assert_eq!(full_did(""), None);
    }

    #[test]
    fn test_did_round_trip() {
        let did = "did:plc:z72i7hdynmk6r22z27h6tvur";
        assert_eq!(full_did(&short_did(did)).as_deref(), Some(did));
    }

    #[test]
    fn test_short_did_lowercases() {
        assert_eq!(short_did("DID:PLC:ABC123"), "abc123");
    }

    #[test]
    fn test_full_handle_appends_domain() {
        assert_eq!(full_handle("alice"), Some("alice.bsky.social".to_string()));
    }

    #[test]
    fn test_full_handle_keeps_domains() {
        assert_eq!(
            full_handle("bob.custom.domain"),
            Some("bob.custom.domain".to_string())
        );
    }

    #[test]
    fn test_full_handle_strips_at_sign() {
        assert_eq!(full_handle("@alice"), Some("alice.bsky.social".to_string()));
    }

    #[test]
    fn test_full_handle_punycode() {
        assert_eq!(
            full_handle("bücher.example"),
            Some("xn--bcher-kva.example".to_string())
        );
    }

    #[test]
    fn test_handle_round_trip() {
        assert_eq!(
            short_handle(&full_handle("alice").unwrap()).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_full_handle_unwraps_post_url() {
        assert_eq!(
            full_handle("https://bsky.app/profile/alice.bsky.social/post/3k44deefghs2g"),
            Some("alice.bsky.social".to_string())
        );
    }

    #[test]
    fn test_full_handle_unwraps_profile_url_with_did() {
        // A DID inside a pasted link is returned unchanged, not domain-expanded
        assert_eq!(
            full_handle("https://bsky.app/profile/did:plc:z72i7hdynmk6r22z27h6tvur"),
            Some("did:plc:z72i7hdynmk6r22z27h6tvur".to_string())
        );
    }

    #[test]
    fn test_full_handle_unwraps_feed_uri() {
        assert_eq!(
            full_handle("at://did:plc:abc123/app.bsky.feed.post/3k44dee"),
            Some("did:plc:abc123".to_string())
        );
    }

    #[test]
    fn test_full_handle_empty() {
        assert_eq!(full_handle(""), None);
        assert_eq!(full_handle("@"), None);
    }

    #[test]
    fn test_short_handle_strips_default_domain() {
        assert_eq!(short_handle("alice.bsky.social").as_deref(), Some("alice"));
        assert_eq!(
            short_handle("bob.custom.domain").as_deref(),
            Some("bob.custom.domain")
        );
    }

    #[test]
    fn test_is_default_domain_handle() {
        assert!(is_default_domain_handle("alice.bsky.social"));
        assert!(!is_default_domain_handle("bob.custom.domain"));
    }

    #[test]
    fn test_is_valid_handle() {
        assert!(is_valid_handle("alice.bsky.social"));
        assert!(is_valid_handle("my-site.example.com"));
        assert!(!is_valid_handle("alice"));
        assert!(!is_valid_handle("did:plc:abc.bsky.social"));
        assert!(!is_valid_handle("alice..social"));
        assert!(!is_valid_handle("-alice.social"));
        assert!(!is_valid_handle("alice.b1"));
    }

    #[test]
    fn test_break_post_url() {
        let post =
            break_post_url("https://bsky.app/profile/alice.bsky.social/post/3k44deefghs2g")
                .unwrap();
        assert_eq!(post.account, "alice.bsky.social");
        assert_eq!(post.post_id, "3k44deefghs2g");

        assert!(break_post_url("https://example.com/profile/alice/post/1").is_none());
    }

    #[test]
    fn test_break_feed_uri() {
        let feed = break_feed_uri("at://did:plc:abc/app.bsky.feed.generator/aaalist").unwrap();
        assert_eq!(feed.did, "did:plc:abc");
        assert_eq!(feed.post_id, "aaalist");

        assert!(break_feed_uri("at://did:plc:abc").is_none());
        assert!(break_feed_uri("https://bsky.app/").is_none());
    }

    #[test]
    fn test_blob_urls() {
        assert_eq!(
            profile_blob_url("abc123", "bafyreib").as_deref(),
            Some("https://cdn.bsky.app/img/avatar/plain/did:plc:abc123/bafyreib@jpeg")
        );
        assert_eq!(profile_blob_url("", "bafyreib"), None);
        assert!(feed_blob_url("did:plc:abc", "cid")
            .unwrap()
            .contains("feed_thumbnail"));
    }
}
