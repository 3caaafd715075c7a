//! MIME message parsing: building the part tree from raw message bytes.
//!
//! Part bodies are kept exactly as they appear in the archive, still
//! transfer-encoded. Decoding (or deliberately not decoding) is the
//! normalizer's concern.

use tracing::warn;

use crate::model::message::{header_param, MailMessage};
use crate::parser::header::{decode_text, unfold_headers};

/// Maximum depth for nested container descent (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 10;

/// Parse a complete raw message (headers + body) into a part tree.
///
/// Never fails: undecodable bytes fall back to Windows-1252 and a blob
/// without headers becomes a message with an empty header list.
pub fn parse_message(raw_message: &[u8]) -> MailMessage {
    // Strip the leading "From " separator line if present
    let message_bytes = skip_from_line(raw_message);
    let text = decode_text(message_bytes);
    parse_part(&text, 0)
}

/// Parse one part (headers plus body) at the given nesting depth.
fn parse_part(text: &str, depth: usize) -> MailMessage {
    let (header_text, body_text) = split_headers_body(text);

    let mut msg = MailMessage {
        headers: unfold_headers(header_text),
        ..MailMessage::default()
    };

    let content_type = msg.content_type();

    if content_type.starts_with("multipart/") {
        if depth >= MAX_DEPTH {
            warn!(depth, "Container nesting too deep, keeping part as leaf");
            msg.body = body_text.to_string();
            return msg;
        }
        let boundary = msg
            .header("content-type")
            .and_then(|ct| header_param(ct, "boundary"));
        let parts = match boundary {
            Some(ref b) => split_multipart(body_text, b),
            None => Vec::new(),
        };
        if parts.is_empty() {
            // No boundary parameter or start boundary never found:
            // the body stays a leaf, as lenient mail parsers treat it
            warn!(%content_type, "Multipart body without usable boundary");
            msg.body = body_text.to_string();
            return msg;
        }
        msg.multipart = true;
        msg.children = parts
            .into_iter()
            .map(|part| parse_part(part, depth + 1))
            .collect();
        return msg;
    }

    if content_type == "message/rfc822" {
        if depth >= MAX_DEPTH {
            warn!(depth, "Container nesting too deep, keeping part as leaf");
            msg.body = body_text.to_string();
            return msg;
        }
        msg.multipart = true;
        msg.children = vec![parse_part(body_text, depth + 1)];
        return msg;
    }

    msg.body = body_text.to_string();
    msg
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        // Find end of line
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Split a message into its header block and body at the first blank line.
///
/// A message without a blank line is all headers and has an empty body.
fn split_headers_body(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return (&text[..offset], &text[offset + line.len()..]);
        }
        offset += line.len();
    }
    (text, "")
}

/// Split a multipart body into its parts on the given boundary.
///
/// Delimiter lines are `--boundary` at line start, with trailing transport
/// padding tolerated; `--boundary--` closes the body. The newline
/// immediately preceding a delimiter belongs to the delimiter, so part
/// text does not include it. Preamble and epilogue are discarded.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let close_delimiter = format!("--{boundary}--");

    let mut parts = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let content = line.trim_end();
        if content == delimiter || content == close_delimiter {
            if let Some(start) = current_start.take() {
                let mut part = &body[start..offset];
                if let Some(stripped) = part.strip_suffix('\n') {
                    part = stripped.strip_suffix('\r').unwrap_or(stripped);
                }
                parts.push(part);
            }
            if content == close_delimiter {
                return parts;
            }
            current_start = Some(offset + line.len());
        }
        offset += line.len();
    }

    // No closing delimiter: the final part runs to the end of the body
    if let Some(start) = current_start {
        parts.push(&body[start..]);
    }
    parts
}
