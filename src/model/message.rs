//! Parsed message tree: unfolded headers plus body parts.

/// A parsed email message or one body part of it.
///
/// Multipart containers keep their parts in `children` and have an empty
/// `body`. Leaf parts carry their body text exactly as it appeared in the
/// archive, still transfer-encoded; decoding is the consumer's decision.
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    /// Unfolded `(name, value)` header pairs in file order; names lowercase.
    pub headers: Vec<(String, String)>,

    /// Raw body text of a leaf part. Empty for containers.
    pub body: String,

    /// Child parts of a multipart container or embedded message.
    pub children: Vec<MailMessage>,

    /// Whether this part is a container of further parts.
    pub multipart: bool,
}

impl MailMessage {
    /// Value of the first occurrence of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, v)| v.as_str())
    }

    /// The lowercased `type/subtype` from the `Content-Type` header.
    ///
    /// Falls back to `text/plain` when the header is absent or its value
    /// is not a single `type/subtype` pair.
    pub fn content_type(&self) -> String {
        if let Some(value) = self.header("content-type") {
            let mime = value
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase();
            if mime.matches('/').count() == 1 {
                return mime;
            }
        }
        "text/plain".to_string()
    }

    /// Raw `Content-Transfer-Encoding` value, if present.
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.header("content-transfer-encoding")
    }

    /// Declared filename of the part, if any.
    ///
    /// Checks the `filename` parameter of `Content-Disposition` first,
    /// then the legacy `name` parameter of `Content-Type`.
    pub fn file_name(&self) -> Option<String> {
        if let Some(disposition) = self.header("content-disposition") {
            if let Some(name) = header_param(disposition, "filename") {
                return Some(name);
            }
        }
        self.header("content-type")
            .and_then(|ct| header_param(ct, "name"))
    }

    /// Whether this part is a multipart container (or embedded message).
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// All leaf parts of the message in depth-first encounter order.
    ///
    /// A non-multipart message is its own single leaf. Containers with no
    /// children contribute nothing. Traversal uses an explicit worklist,
    /// so deeply nested part trees cannot exhaust the call stack.
    pub fn leaves(&self) -> Vec<&MailMessage> {
        if !self.multipart {
            return vec![self];
        }

        let mut leaves = Vec::new();
        let mut stack: Vec<&MailMessage> = Vec::new();
        // Children pushed in reverse so the first child is popped first
        stack.extend(self.children.iter().rev());

        while let Some(part) = stack.pop() {
            if part.multipart {
                stack.extend(part.children.iter().rev());
            } else {
                leaves.push(part);
            }
        }
        leaves
    }
}

/// Extract a named parameter from a structured header value.
///
/// Handles quoted and unquoted forms: `filename="a.pdf"`, `name=a.pdf`.
/// Parameter names match case-insensitively.
pub fn header_param(value: &str, key: &str) -> Option<String> {
    for part in value.split(';').skip(1) {
        if let Some((k, v)) = part.split_once('=') {
            if k.trim().eq_ignore_ascii_case(key) {
                let v = v.trim();
                let v = v.strip_prefix('"').unwrap_or(v);
                let v = v.strip_suffix('"').unwrap_or(v);
                return Some(v.to_string());
            }
        }
    }
    None
}
