//! Two-pass record scan over an MBOX archive.
//!
//! Pass 1 counts messages so every emitted record can carry its position
//! as `index/total`. Pass 2 streams the messages through parsing and
//! normalization in container order.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::model::record::MessageRecord;
use crate::normalize::{normalize, NormalizeOptions};
use crate::parser::mbox::MboxParser;
use crate::parser::mime::parse_message;

/// Totals reported after a scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanSummary {
    /// Number of records accepted by the callback.
    pub message_count: u64,
    /// Size of the archive in bytes.
    pub file_size: u64,
    /// Wall-clock time for both passes.
    pub elapsed: Duration,
}

/// Scan an MBOX archive, delivering one record per message.
///
/// `on_record` receives `(index, total, record)` with `index` starting at 1,
/// in container order, and returns `true` to continue or `false` to stop.
/// `progress` is reported during the counting pass as `(bytes_read, total)`.
pub fn scan_mbox(
    path: &Path,
    config: &ScanConfig,
    on_record: &mut dyn FnMut(u64, u64, MessageRecord) -> bool,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<ScanSummary> {
    let started = Instant::now();

    let parser =
        MboxParser::new(path)?.with_limits(config.read_buffer_size, config.max_message_size);
    let file_size = parser.file_size();

    info!(path = %path.display(), "Counting messages");
    let total = parser.locate(&mut |_location| true, progress)?;
    debug!(total, "Counting pass finished");

    let options = NormalizeOptions {
        extract_content: config.extract_content,
        hash_content: config.hash_content,
    };

    let mut index: u64 = 0;
    let mut aborted = false;
    let emitted = parser.parse(
        &mut |_offset, raw| {
            index += 1;
            let record = normalize(&parse_message(raw), &options);
            let keep_going = on_record(index, total, record);
            if !keep_going {
                aborted = true;
            }
            keep_going
        },
        None,
    )?;

    if !aborted && emitted != total {
        warn!(
            expected = total,
            emitted, "Message count changed between passes"
        );
    }

    Ok(ScanSummary {
        message_count: emitted,
        file_size,
        elapsed: started.elapsed(),
    })
}
