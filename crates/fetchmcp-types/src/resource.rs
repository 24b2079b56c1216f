//! The resource model: a keyed, tiered piece of scraped content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage of processing a resource captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTier {
    Raw,
    Cleaned,
    Extracted,
}

impl ResourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceTier::Raw => "raw",
            ResourceTier::Cleaned => "cleaned",
            ResourceTier::Extracted => "extracted",
        }
    }

    /// Preference order used when the pipeline asks the store for the best
    /// cached content for a URL: cleaned beats extracted beats raw.
    pub fn preference_rank(&self) -> u8 {
        match self {
            ResourceTier::Cleaned => 0,
            ResourceTier::Extracted => 1,
            ResourceTier::Raw => 2,
        }
    }
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend owns a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreScheme {
    Memory,
    File,
}

impl StoreScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScheme::Memory => "memory",
            StoreScheme::File => "file",
        }
    }
}

/// A resource's identity: `<scheme>://<tier>/<sanitized_url>_<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceUri(pub String);

impl ResourceUri {
    /// Replace every non-alphanumeric byte with `_`, matching the grammar
    /// in the URI contract.
    pub fn sanitize_url(url: &str) -> String {
        url.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    pub fn new(scheme: StoreScheme, tier: ResourceTier, url: &str, timestamp_nanos: u128) -> Self {
        let sanitized = Self::sanitize_url(url);
        ResourceUri(format!(
            "{}://{}/{}_{}",
            scheme.as_str(),
            tier.as_str(),
            sanitized,
            timestamp_nanos
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header metadata for a resource, without its content body.
///
/// `extract_prompt` is `Some` iff `tier == Extracted`; that invariant is
/// upheld by every constructor in this module, not re-checked by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHeader {
    pub uri: ResourceUri,
    pub url: String,
    pub tier: ResourceTier,
    pub timestamp_nanos: u128,
    pub byte_size: u64,
    pub mime_type: String,
    pub source_strategy: Option<String>,
    pub extract_prompt: Option<String>,
    pub last_access_nanos: u128,
}

impl ResourceHeader {
    pub fn new(
        uri: ResourceUri,
        url: String,
        tier: ResourceTier,
        timestamp_nanos: u128,
        byte_size: u64,
        mime_type: String,
        source_strategy: Option<String>,
        extract_prompt: Option<String>,
    ) -> Self {
        debug_assert_eq!(
            tier == ResourceTier::Extracted,
            extract_prompt.is_some(),
            "extract_prompt must be present iff tier is Extracted"
        );
        Self {
            uri,
            url,
            tier,
            timestamp_nanos,
            byte_size,
            mime_type,
            source_strategy,
            extract_prompt,
            last_access_nanos: timestamp_nanos,
        }
    }
}

/// A full resource: header plus its opaque content body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub header: ResourceHeader,
    pub content: Vec<u8>,
}

impl Resource {
    pub fn new(header: ResourceHeader, content: Vec<u8>) -> Self {
        debug_assert_eq!(header.byte_size as usize, content.len());
        Self { header, content }
    }

    pub fn content_as_str(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}
