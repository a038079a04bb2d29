/// Resolved account profiles
///
/// The terminal entity of a resolution: display-ready account info built from
/// a decoded AppView profile record. Values are immutable once constructed; a
/// fresher resolution produces a new value that supersedes the old one in the
/// cache.
use crate::{
    identifier::{short_did, short_handle},
    transport::{LabelRecord, ProfileRecord},
};
use serde::{Deserialize, Serialize};

/// Label value that marks a profile as opting out of unauthenticated viewing
const NO_UNAUTHENTICATED_LABEL: &str = "!no-unauthenticated";

/// Display-ready account information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProfile {
    pub short_did: String,
    pub short_handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    /// Account asked logged-out viewers not to be shown its records
    #[serde(default)]
    pub obscure_public_records: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A moderation label carried on a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub val: String,
    pub neg: bool,
}

impl From<LabelRecord> for Label {
    fn from(record: LabelRecord) -> Self {
        Label {
            val: record.val,
            neg: record.neg,
        }
    }
}

impl ResolvedProfile {
    /// Build a profile from a decoded wire record.
    ///
    /// Identifiers are shortened for display. A record whose handle cannot be
    /// shortened (e.g. `handle.invalid`-style placeholders collapsing to
    /// nothing) gets a `*did*` marker so the UI always has something to show.
    pub fn from_record(record: ProfileRecord) -> Self {
        let short_did = short_did(&record.did);
        let short_handle = short_handle(&record.handle)
            .unwrap_or_else(|| format!("*{}*", record.did));
        let obscure_public_records = detect_obscure_public_records(&record.labels);

        ResolvedProfile {
            short_did,
            short_handle,
            display_name: record.display_name,
            description: record.description,
            avatar_url: record.avatar,
            banner_url: record.banner,
            obscure_public_records,
            labels: record.labels.into_iter().map(Label::from).collect(),
        }
    }
}

/// A non-negated `!no-unauthenticated` label sets the obscure flag.
fn detect_obscure_public_records(labels: &[LabelRecord]) -> bool {
    labels
        .iter()
        .any(|label| label.val == NO_UNAUTHENTICATED_LABEL && !label.neg)
}
