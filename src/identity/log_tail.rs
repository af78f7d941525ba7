//! Last-line extraction from an externally maintained log file.
//!
//! The file is owned by another logging subsystem and mutated concurrently,
//! so reads are a single best-effort pass over the tail of the file.

use regex::Regex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;

/// Upper bound on how much of the file end is inspected.
const MAX_TAIL_BYTES: u64 = 64 * 1024;

static REQUEST_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn request_id_pattern() -> &'static Regex {
    REQUEST_ID_PATTERN
        .get_or_init(|| Regex::new(r"\[([A-Za-z0-9_-]+)\]").expect("Invalid request id regex"))
}

/// Extract the first bracketed `[word-and-hyphen]` token from a log line.
pub fn extract_request_id(line: &str) -> Option<&str> {
    request_id_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Read the final line of `path`.
///
/// Returns `Ok(None)` for an empty file. A single trailing newline is not
/// treated as an empty final line. Lines longer than the inspected tail
/// window are truncated to the window.
pub fn read_last_line(path: &Path) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }

    let window = len.min(MAX_TAIL_BYTES);
    file.seek(SeekFrom::Start(len - window))?;
    let mut buf = Vec::with_capacity(window as usize);
    file.take(window).read_to_end(&mut buf)?;

    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
        if buf[..end].ends_with(b"\r") {
            end -= 1;
        }
    }
    let start = buf[..end]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    Ok(Some(String::from_utf8_lossy(&buf[start..end]).into_owned()))
}
