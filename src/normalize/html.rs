//! HTML-to-text extraction for message bodies.

/// Extract the visible text of an HTML fragment.
///
/// Script and style blocks are removed, remaining tags stripped, common
/// HTML entities decoded, and whitespace runs collapsed to single spaces
/// with leading/trailing whitespace trimmed.
///
/// Returns `None` for empty (or whitespace-only) input; markup that
/// carries no text yields `Some("")`. Plain text without any markup
/// passes through unchanged.
pub fn html_text(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    // Remove script and style blocks entirely
    let text = remove_tag_block(html, "script");
    let text = remove_tag_block(&text, "style");

    // Strip all remaining HTML tags. Each tag becomes a separator so
    // text runs from adjacent elements do not fuse together.
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => {
                in_tag = true;
                stripped.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    let decoded = decode_entities(&stripped);

    // Collapse whitespace runs and trim
    Some(decoded.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Decode the handful of HTML entities that dominate real mail bodies.
///
/// `&amp;` is decoded last so that double-escaped sequences such as
/// `&amp;lt;` stay escaped once.
fn decode_entities(text: &str) -> String {
    let mut result = text.to_string();
    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&amp;", "&");
    result
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = after.to_ascii_lowercase().find(&close) {
            remaining = &after[end + close.len()..];
        } else {
            // No closing tag, remove rest
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}
