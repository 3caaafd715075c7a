//! Extract base64 attachments from messages to disk.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use tracing::warn;

use crate::config::ScanConfig;
use crate::error::{ExtractError, Result};
use crate::model::message::MailMessage;
use crate::parser::header::parse_date;
use crate::parser::mbox::MboxParser;
use crate::parser::mime::parse_message;

/// Decode a base64 text blob and write the binary to `path`.
///
/// Whitespace inside the blob (line wrapping) is ignored.
pub fn write_b64_file(path: impl AsRef<Path>, b64_text: &str) -> Result<()> {
    let path = path.as_ref();
    let cleaned: String = b64_text.chars().filter(|c| !c.is_whitespace()).collect();
    let data = general_purpose::STANDARD.decode(cleaned)?;
    std::fs::write(path, &data).map_err(|e| ExtractError::io(path, e))?;
    Ok(())
}

/// Extract every named base64 attachment of one message into `output_dir`.
///
/// A part qualifies when it declares a filename and a `base64` transfer
/// encoding. Name collisions are resolved with a numeric suffix. Returns
/// the paths written; fails on the first undecodable or unwritable part.
pub fn extract_attachments(message: &MailMessage, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for part in attachment_parts(message) {
        let file_name = part.file_name().unwrap_or_default();
        let path = unique_path(&output_dir.join(sanitize_filename_part(&file_name, 150)));
        write_b64_file(&path, &part.body)?;
        written.push(path);
    }

    Ok(written)
}

/// Extract attachments from every message of an MBOX archive.
///
/// Creates a subfolder per message: `{output_dir}/{date}_{subject}/`.
/// Messages without named base64 parts are skipped entirely; individual
/// attachment failures are logged and skipped.
pub fn extract_all(
    mbox_path: &Path,
    output_dir: &Path,
    config: &ScanConfig,
    progress: &dyn Fn(usize, usize),
) -> anyhow::Result<Vec<PathBuf>> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(ExtractError::InvalidPath(format!(
            "output path is not a directory: {}",
            output_dir.display()
        ))
        .into());
    }
    std::fs::create_dir_all(output_dir)?;

    let parser =
        MboxParser::new(mbox_path)?.with_limits(config.read_buffer_size, config.max_message_size);
    let mut locations = Vec::new();
    parser.locate(
        &mut |location| {
            locations.push(location);
            true
        },
        None,
    )?;

    let mut all_paths = Vec::new();
    let total = locations.len();

    for (i, location) in locations.iter().enumerate() {
        progress(i, total);

        let raw = MboxParser::read_message_at(mbox_path, location.offset, location.length)?;
        let message = parse_message(&raw);

        let parts = attachment_parts(&message);
        if parts.is_empty() {
            continue;
        }

        let subfolder = output_dir.join(message_folder_name(&message, i as u64 + 1));
        std::fs::create_dir_all(&subfolder)?;

        for part in parts {
            let file_name = part.file_name().unwrap_or_default();
            let path = unique_path(&subfolder.join(sanitize_filename_part(&file_name, 150)));
            match write_b64_file(&path, &part.body) {
                Ok(()) => all_paths.push(path),
                Err(e) => {
                    warn!(
                        file_name = %file_name,
                        error = %e,
                        "Failed to extract attachment"
                    );
                }
            }
        }
    }
    progress(total, total);

    Ok(all_paths)
}

/// Leaf parts carrying both a declared filename and base64 encoding.
fn attachment_parts(message: &MailMessage) -> Vec<&MailMessage> {
    message
        .leaves()
        .into_iter()
        .filter(|part| part.file_name().is_some() && part.transfer_encoding() == Some("base64"))
        .collect()
}

/// Generate a folder name for a message's attachments.
///
/// Falls back to the sequence number when the `Date` header is missing
/// or unparsable.
fn message_folder_name(message: &MailMessage, sequence: u64) -> String {
    let date = message
        .header("date")
        .and_then(parse_date)
        .map(|dt| dt.format("%Y%m%d_%H%M%S").to_string())
        .unwrap_or_else(|| format!("message_{sequence:05}"));
    let subject = sanitize_filename_part(message.header("subject").unwrap_or("no_subject"), 60);
    format!("{date}_{subject}")
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback, very unlikely
    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello_world");
        assert_eq!(
            sanitize_filename_part("user@example.com", 30),
            "user@example.com"
        );
        assert_eq!(sanitize_filename_part("", 10), "unknown");
        assert_eq!(sanitize_filename_part("a/b\\c:d", 10), "a_b_c_d");
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        assert_eq!(sanitize_filename_part("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_write_b64_file_ignores_whitespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.bin");
        write_b64_file(&path, "SGVs\nbG8g\nd29y\nbGQ=\n").expect("decode and write");
        let data = std::fs::read(&path).expect("read back");
        assert_eq!(data, b"Hello world");
    }

    #[test]
    fn test_write_b64_file_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.bin");
        let result = write_b64_file(&path, "!!! not base64 !!!");
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_extract_attachments_from_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let message = MailMessage {
            multipart: true,
            children: vec![
                MailMessage {
                    headers: vec![("content-type".to_string(), "text/plain".to_string())],
                    body: "cover text".to_string(),
                    ..MailMessage::default()
                },
                MailMessage {
                    headers: vec![
                        (
                            "content-type".to_string(),
                            "application/octet-stream; name=\"data.bin\"".to_string(),
                        ),
                        (
                            "content-transfer-encoding".to_string(),
                            "base64".to_string(),
                        ),
                    ],
                    body: "SGVsbG8gd29ybGQ=".to_string(),
                    ..MailMessage::default()
                },
            ],
            ..MailMessage::default()
        };

        let written = extract_attachments(&message, dir.path()).expect("extract");
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("data.bin"));
        assert_eq!(std::fs::read(&written[0]).expect("read"), b"Hello world");
    }

    #[test]
    fn test_message_folder_name_with_date() {
        let message = MailMessage {
            headers: vec![
                ("date".to_string(), "Thu, 04 Jan 2024 10:00:00 +0000".to_string()),
                ("subject".to_string(), "Quarterly report".to_string()),
            ],
            ..MailMessage::default()
        };
        assert_eq!(
            message_folder_name(&message, 7),
            "20240104_100000_Quarterly_report"
        );
    }

    #[test]
    fn test_message_folder_name_without_date() {
        let message = MailMessage::default();
        assert_eq!(message_folder_name(&message, 7), "message_00007_no_subject");
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"x").expect("write");
        let next = unique_path(&path);
        assert_eq!(next, dir.path().join("file_1.txt"));
    }
}
