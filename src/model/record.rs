//! Extracted record types and their JSON representation.

use serde::ser::{Serialize, Serializer};

/// Normalized record for a single archived message.
///
/// Field order matches the emitted JSON object order. Raw header fields
/// (`labels`, `date`, `subject`, `message_id`) are `null` when the header
/// is absent; address fields are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MessageRecord {
    /// Raw `X-Gmail-Labels` header value (not split into labels).
    pub labels: Option<String>,

    /// Raw `Date` header value.
    pub date: Option<String>,

    /// Cleaned sender addresses.
    pub from: Vec<String>,

    /// Cleaned reply-to addresses.
    #[serde(rename = "reply-to")]
    pub reply_to: Vec<String>,

    /// Cleaned primary recipient addresses.
    pub to: Vec<String>,

    /// Cleaned delivered-to addresses.
    #[serde(rename = "delivered-to")]
    pub delivered_to: Vec<String>,

    /// Cleaned carbon-copy addresses.
    pub cc: Vec<String>,

    /// Cleaned blind-carbon-copy addresses.
    pub bcc: Vec<String>,

    /// Raw `Subject` header value.
    pub subject: Option<String>,

    /// Extracted body content, one item per leaf part.
    pub payload: Payload,

    /// Raw `Message-ID` header value.
    #[serde(rename = "message-id")]
    pub message_id: Option<String>,
}

/// Extracted content of one leaf body part.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContentItem {
    /// Lowercased mimetype of the part, or `"NA"` for a bare string leaf.
    pub content_type: String,

    /// Raw `Content-Transfer-Encoding` value, or `"NA"` when absent.
    pub encoding: String,

    /// Declared filename of the part, if any.
    pub file_name: Option<String>,

    /// Extracted text, `null` when the part carries none.
    pub content: Option<String>,

    /// MD5 digest of `content`, keyed by the record's hashing mode.
    pub content_hash: ContentHash,
}

/// Body payload of a record: disabled entirely, or a list of items.
///
/// Serializes as `false` when disabled, mirroring the record consumers'
/// expectation of a falsy placeholder rather than an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Content extraction was turned off for this record.
    Disabled,
    /// One content item per leaf part, in traversal order.
    Parts(Vec<ContentItem>),
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Payload::Disabled => serializer.serialize_bool(false),
            Payload::Parts(items) => items.serialize(serializer),
        }
    }
}

/// Content hash of one item: `false` when hashing is disabled, `null`
/// when the content is not a string, a hex MD5 digest otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentHash {
    /// Hashing was turned off for this record.
    Disabled,
    /// The item has no textual content to hash.
    Missing,
    /// Hex-encoded MD5 digest of the content.
    Digest(String),
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ContentHash::Disabled => serializer.serialize_bool(false),
            ContentHash::Missing => serializer.serialize_none(),
            ContentHash::Digest(hex) => serializer.serialize_str(hex),
        }
    }
}
