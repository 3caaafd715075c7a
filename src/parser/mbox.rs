//! Streaming MBOX parser.
//!
//! Reads MBOX files line-by-line with a bounded buffer.
//! Never loads the entire file into memory. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ExtractError, Result};

/// Default size of the internal read buffer (128 KB).
const READ_BUFFER_SIZE: usize = 128 * 1024;

/// Default maximum message size in bytes (256 MB).
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Location of one message inside the MBOX file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLocation {
    /// Byte offset of the message start (points at the `From ` line).
    pub offset: u64,
    /// Total byte length of the message, headers and body.
    pub length: u64,
}

/// Streaming MBOX parser.
///
/// Reads through the file sequentially, invoking a caller-supplied callback
/// for every message boundary it finds. The parser is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
///
/// Content before the first `From ` separator is not part of any message
/// and is skipped.
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    read_buffer_size: usize,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::FileNotFound(path.clone())
            } else {
                ExtractError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            read_buffer_size: READ_BUFFER_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
        })
    }

    /// Override the read buffer and maximum message size limits.
    ///
    /// Buffer sizes below 4 KB are raised to 4 KB.
    pub fn with_limits(mut self, read_buffer_size: usize, max_message_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size.max(4096);
        self.max_message_size = max_message_size;
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Parse the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(offset, raw_bytes)` and returns `true` to
    /// continue or `false` to abort early. Messages above the size limit are
    /// truncated with a warning and still delivered.
    ///
    /// Returns the number of messages found.
    pub fn parse(
        &self,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ExtractError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.read_buffer_size, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: u64 = 0;
        let mut truncated = false;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut bytes_read: u64 = 0;
        let mut last_progress: u64 = 0;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| ExtractError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let newline_pos = memchr_newline(buf);
                let consume_len = match newline_pos {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if !message_buf.is_empty() {
                    if !message_callback(message_start, &message_buf) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_start = current_offset;
                message_buf.clear();
                message_buf.extend_from_slice(&line_buf);
                truncated = false;
            } else if !message_buf.is_empty() {
                if message_buf.len() + line_buf.len() <= self.max_message_size {
                    message_buf.extend_from_slice(&line_buf);
                } else if !truncated {
                    truncated = true;
                    warn!(
                        offset = message_start,
                        max_size = self.max_message_size,
                        "Message exceeds maximum size, truncating body"
                    );
                }
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;
            bytes_read += line_len;

            if let Some(cb) = progress_callback {
                if bytes_read - last_progress >= PROGRESS_INTERVAL {
                    cb(bytes_read, self.file_size);
                    last_progress = bytes_read;
                }
            }
        }

        // Flush last message
        if !message_buf.is_empty() && message_callback(message_start, &message_buf) {
            count += 1;
        }

        if let Some(cb) = progress_callback {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }

    /// Locate message boundaries without accumulating message bodies.
    ///
    /// Considerably cheaper than [`parse`](Self::parse) for a counting pass:
    /// uses a reusable line buffer to minimize allocations in the hot loop,
    /// and reports progress every 4 MB. The callback returns `true` to
    /// continue or `false` to abort early.
    ///
    /// Returns the number of messages found, which always matches what
    /// [`parse`](Self::parse) would deliver for the same file.
    pub fn locate(
        &self,
        location_callback: &mut dyn FnMut(MessageLocation) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ExtractError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.read_buffer_size, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_start: Option<u64> = None;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut bytes_read: u64 = 0;
        let mut last_progress: u64 = 0;

        // Reusable line buffer, avoids allocation per line
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| ExtractError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let newline_pos = memchr_newline(buf);
                let consume_len = match newline_pos {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if let Some(start) = message_start {
                    let location = MessageLocation {
                        offset: start,
                        length: current_offset - start,
                    };
                    if !location_callback(location) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_start = Some(current_offset);
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;
            bytes_read += line_len;

            if let Some(cb) = progress_callback {
                if bytes_read - last_progress >= PROGRESS_INTERVAL {
                    cb(bytes_read, self.file_size);
                    last_progress = bytes_read;
                }
            }
        }

        // Flush last message
        if let Some(start) = message_start {
            let location = MessageLocation {
                offset: start,
                length: current_offset - start,
            };
            if location_callback(location) {
                count += 1;
            }
        }

        if let Some(cb) = progress_callback {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }

    /// Read a single message at the given offset and length.
    ///
    /// Uses `seek` to jump directly to the message without scanning the file.
    pub fn read_message_at(path: impl AsRef<Path>, offset: u64, length: u64) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| ExtractError::io(path, e))?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer)
            .map_err(|e| ExtractError::io(path, e))?;
        Ok(buffer)
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
