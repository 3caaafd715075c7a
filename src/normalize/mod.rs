//! Message normalization: turning a parsed message tree into a record.
//!
//! The entry point is [`normalize`], a pure function over one message and
//! the extraction options. No state is shared between messages.

pub mod html;

use std::collections::BTreeSet;

use crate::model::message::MailMessage;
use crate::model::record::{ContentHash, ContentItem, MessageRecord, Payload};

/// Toggles for record extraction.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Extract body content into the record payload.
    pub extract_content: bool,
    /// Hash extracted content.
    pub hash_content: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            extract_content: true,
            hash_content: true,
        }
    }
}

/// Normalize one parsed message into its extracted record.
pub fn normalize(message: &MailMessage, options: &NormalizeOptions) -> MessageRecord {
    MessageRecord {
        labels: message.header("x-gmail-labels").map(String::from),
        date: message.header("date").map(String::from),
        from: clean_addresses(message.header("from")),
        reply_to: clean_addresses(message.header("reply-to")),
        to: clean_addresses(message.header("to")),
        delivered_to: clean_addresses(message.header("delivered-to")),
        cc: clean_addresses(message.header("cc")),
        bcc: clean_addresses(message.header("bcc")),
        subject: message.header("subject").map(String::from),
        payload: if options.extract_content {
            Payload::Parts(read_payload(message, options.hash_content))
        } else {
            Payload::Disabled
        },
        message_id: message.header("message-id").map(String::from),
    }
}

/// Heuristic address extraction from a raw header value.
///
/// Lowercases the value, replaces separator characters with spaces, and
/// keeps the tokens that look like addresses: containing `@` and at least
/// one `.`. The result is sorted and duplicate-free. This is deliberately
/// not an RFC 5322 address parser; tokens merely resembling addresses pass.
pub fn clean_addresses(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut field = raw.to_lowercase();
    for separator in ['\n', '\t', '<', '>', '"', '\'', ','] {
        field = field.replace(separator, " ");
    }

    let unique: BTreeSet<&str> = field
        .split(' ')
        .filter(|token| token.contains('@') && token.contains('.'))
        .collect();

    unique.into_iter().map(String::from).collect()
}

/// One leaf of a message payload: a structured part, or the bare body
/// string of a non-multipart message (which has no part metadata at all).
enum Leaf<'a> {
    Part(&'a MailMessage),
    Text(&'a str),
}

/// Flatten the payload of a message into its leaf parts.
///
/// A multipart message flattens to its leaf parts in depth-first
/// encounter order. A non-multipart message contributes its bare body
/// string, which carries no part metadata of its own.
fn collect_leaves(message: &MailMessage) -> Vec<Leaf<'_>> {
    if !message.is_multipart() {
        return vec![Leaf::Text(&message.body)];
    }
    message.leaves().into_iter().map(Leaf::Part).collect()
}

/// Produce one content item per leaf part, in traversal order.
fn read_payload(message: &MailMessage, hash_content: bool) -> Vec<ContentItem> {
    collect_leaves(message)
        .iter()
        .map(|leaf| read_leaf(leaf, hash_content))
        .collect()
}

/// Extract the content item for one leaf.
///
/// Dispatch is by `(content_type, transfer_encoding)`. The encoding
/// comparison is exact: a part declaring `Base64` takes the fall-through
/// arm. A `text/plain` part with base64 encoding keeps its raw payload
/// without decoding.
fn read_leaf(leaf: &Leaf<'_>, hash_content: bool) -> ContentItem {
    let (content_type, encoding) = match leaf {
        Leaf::Part(part) => (
            part.content_type(),
            part.transfer_encoding().unwrap_or("NA").to_string(),
        ),
        Leaf::Text(_) => ("NA".to_string(), "NA".to_string()),
    };

    let content = match leaf {
        Leaf::Part(part) if content_type == "text/plain" && encoding == "base64" => {
            Some(part.body.clone())
        }
        Leaf::Part(part)
            if (content_type == "text/html" || content_type == "application/octet-stream")
                && encoding == "base64" =>
        {
            html::html_text(&part.body)
        }
        Leaf::Text(text) => html::html_text(text),
        _ => None,
    };

    // Strip newlines from textual content
    let content = content.map(|text| text.replace('\n', ""));

    let file_name = match leaf {
        Leaf::Part(part) => part.file_name(),
        Leaf::Text(_) => None,
    };

    let content_hash = if hash_content {
        match &content {
            Some(text) => ContentHash::Digest(hash_text(text)),
            None => ContentHash::Missing,
        }
    } else {
        ContentHash::Disabled
    };

    ContentItem {
        content_type,
        encoding,
        file_name,
        content,
        content_hash,
    }
}

/// Hex-encoded MD5 digest of a text's UTF-8 bytes.
fn hash_text(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_part(headers: &[(&str, &str)], body: &str) -> MailMessage {
        MailMessage {
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
            ..MailMessage::default()
        }
    }

    fn container(children: Vec<MailMessage>) -> MailMessage {
        MailMessage {
            multipart: true,
            children,
            ..MailMessage::default()
        }
    }

    #[test]
    fn test_clean_addresses_absent_header() {
        assert!(clean_addresses(None).is_empty());
    }

    #[test]
    fn test_clean_addresses_sorted_and_deduplicated() {
        let cleaned = clean_addresses(Some("B <b@x.com>, a@y.com, b@x.com"));
        assert_eq!(cleaned, vec!["a@y.com", "b@x.com"]);
    }

    #[test]
    fn test_clean_addresses_requires_at_and_dot() {
        let cleaned = clean_addresses(Some("plainword a@nodot dot.but.no.at a@b.com"));
        assert_eq!(cleaned, vec!["a@b.com"]);
    }

    #[test]
    fn test_clean_addresses_strips_quotes_and_angles() {
        let cleaned = clean_addresses(Some("\"A. Person\" <A@Example.COM>"));
        assert_eq!(cleaned, vec!["a@example.com"]);
    }

    #[test]
    fn test_clean_addresses_splits_on_tabs_and_newlines() {
        let cleaned = clean_addresses(Some("a@b.com\tc@d.org\ne@f.net"));
        assert_eq!(cleaned, vec!["a@b.com", "c@d.org", "e@f.net"]);
    }

    #[test]
    fn test_collect_leaves_non_multipart_is_bare_text() {
        let msg = leaf_part(&[("subject", "Hi")], "body text");
        let leaves = collect_leaves(&msg);
        assert_eq!(leaves.len(), 1);
        assert!(matches!(leaves[0], Leaf::Text("body text")));
    }

    #[test]
    fn test_collect_leaves_depth_first_order() {
        let tree = container(vec![
            leaf_part(&[], "first"),
            container(vec![leaf_part(&[], "second"), leaf_part(&[], "third")]),
            leaf_part(&[], "fourth"),
        ]);
        let leaves = collect_leaves(&tree);
        let bodies: Vec<&str> = leaves
            .iter()
            .map(|l| match l {
                Leaf::Part(p) => p.body.as_str(),
                Leaf::Text(t) => t,
            })
            .collect();
        assert_eq!(bodies, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_collect_leaves_empty_container_contributes_nothing() {
        let tree = container(vec![
            leaf_part(&[], "only"),
            container(Vec::new()),
        ]);
        let leaves = collect_leaves(&tree);
        assert_eq!(leaves.len(), 1);
    }

    #[test]
    fn test_read_leaf_plain_base64_keeps_raw_payload() {
        let part = leaf_part(
            &[
                ("content-type", "text/plain"),
                ("content-transfer-encoding", "base64"),
            ],
            "U3RpbGwgZW5jb2RlZA==\n",
        );
        let item = read_leaf(&Leaf::Part(&part), true);
        assert_eq!(item.content_type, "text/plain");
        assert_eq!(item.encoding, "base64");
        // Newlines stripped, but the payload stays base64
        assert_eq!(item.content.as_deref(), Some("U3RpbGwgZW5jb2RlZA=="));
    }

    #[test]
    fn test_read_leaf_html_base64_runs_text_extraction() {
        // The raw payload is fed to text extraction as-is; a base64 blob
        // has no markup, so it passes through minus newlines
        let part = leaf_part(
            &[
                ("content-type", "text/html"),
                ("content-transfer-encoding", "base64"),
            ],
            "PGI+SGk8L2I+\n",
        );
        let item = read_leaf(&Leaf::Part(&part), true);
        assert_eq!(item.content.as_deref(), Some("PGI+SGk8L2I+"));
    }

    #[test]
    fn test_read_leaf_encoding_comparison_is_case_sensitive() {
        let part = leaf_part(
            &[
                ("content-type", "text/plain"),
                ("content-transfer-encoding", "Base64"),
            ],
            "U3RpbGw=\n",
        );
        let item = read_leaf(&Leaf::Part(&part), true);
        assert_eq!(item.encoding, "Base64");
        assert_eq!(item.content, None);
        assert_eq!(item.content_hash, ContentHash::Missing);
    }

    #[test]
    fn test_read_leaf_unrecognized_combination_yields_null() {
        let part = leaf_part(&[("content-type", "image/png")], "binarydata");
        let item = read_leaf(&Leaf::Part(&part), true);
        assert_eq!(item.content, None);
        assert_eq!(item.content_hash, ContentHash::Missing);
    }

    #[test]
    fn test_read_leaf_plain_text_without_encoding_yields_null() {
        let part = leaf_part(&[("content-type", "text/plain")], "ordinary body");
        let item = read_leaf(&Leaf::Part(&part), true);
        assert_eq!(item.encoding, "NA");
        assert_eq!(item.content, None);
    }

    #[test]
    fn test_read_leaf_bare_text_goes_through_extraction() {
        let item = read_leaf(&Leaf::Text("<p>Hello&nbsp;World</p>"), true);
        assert_eq!(item.content_type, "NA");
        assert_eq!(item.encoding, "NA");
        assert_eq!(item.file_name, None);
        assert_eq!(item.content.as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_hashing_is_deterministic() {
        assert_eq!(hash_text("Hello World"), hash_text("Hello World"));
        assert_eq!(hash_text("Hello World"), "b10a8db164e0754105b7a99be72e3fe5");
    }

    #[test]
    fn test_hash_disabled_marks_every_item() {
        let part = leaf_part(&[("content-type", "image/png")], "x");
        let item = read_leaf(&Leaf::Part(&part), false);
        assert_eq!(item.content_hash, ContentHash::Disabled);

        let item = read_leaf(&Leaf::Text("text"), false);
        assert_eq!(item.content_hash, ContentHash::Disabled);
    }

    #[test]
    fn test_normalize_content_disabled() {
        let msg = leaf_part(&[("subject", "Hi")], "body");
        let options = NormalizeOptions {
            extract_content: false,
            hash_content: true,
        };
        let record = normalize(&msg, &options);
        assert_eq!(record.payload, Payload::Disabled);
    }

    #[test]
    fn test_normalize_raw_header_fields() {
        let msg = leaf_part(
            &[
                ("x-gmail-labels", "Inbox,Important"),
                ("date", "Thu, 04 Jan 2024 10:00:00 +0000"),
                ("subject", "Test"),
                ("message-id", "<m1@example.com>"),
                ("from", "A <a@example.com>"),
            ],
            "Test body",
        );
        let record = normalize(&msg, &NormalizeOptions::default());
        assert_eq!(record.labels.as_deref(), Some("Inbox,Important"));
        assert_eq!(record.subject.as_deref(), Some("Test"));
        assert_eq!(record.message_id.as_deref(), Some("<m1@example.com>"));
        assert_eq!(record.from, vec!["a@example.com"]);
        assert!(record.reply_to.is_empty());
        match record.payload {
            Payload::Parts(ref items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].content.as_deref(), Some("Test body"));
            }
            Payload::Disabled => panic!("payload should be extracted"),
        }
    }
}
