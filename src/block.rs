//! Marked-block scanning and splicing.
//!
//! Everything here is pure data work: the same functions back `sync`,
//! `show`, and `--dry-run`. A marker matches a line only when the line,
//! minus its `\n` or `\r\n` terminator, is byte-identical to the marker.
//! The first begin/end pair wins; anything after it is ordinary data.
//!
//! The local hosts file is handled as raw bytes. It may be in any
//! ASCII-compatible encoding (GBK or Latin-1 comments are common on
//! Windows), and every byte outside the block is copied through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SyncError;

pub const BEGIN_MARKER: &str = "# <-- COOL-LAB HOSTS BEGIN -->";
pub const END_MARKER: &str = "# <-- COOL-LAB HOSTS END -->";

/// Begin/end marker lines that delimit the managed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub begin: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            begin: BEGIN_MARKER.to_string(),
            end: END_MARKER.to_string(),
        }
    }
}

impl Markers {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Markers must be non-empty single lines and differ from each other.
    pub fn validate(&self) -> Result<(), SyncError> {
        for (name, m) in [("begin", &self.begin), ("end", &self.end)] {
            if m.is_empty() {
                return Err(SyncError::Config(format!("{name} marker is empty")));
            }
            if m.contains('\n') || m.contains('\r') {
                return Err(SyncError::Config(format!(
                    "{name} marker must be a single line"
                )));
            }
        }
        if self.begin == self.end {
            return Err(SyncError::Config(
                "begin and end markers must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a sync did to the hosts file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// An existing block was replaced where it stood.
    Replaced,
    /// No block existed; the new one was added at the end.
    Appended,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Replaced => f.write_str("replaced"),
            SyncAction::Appended => f.write_str("appended"),
        }
    }
}

/// Location of a block inside a text. Byte offsets; line numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Start of the begin-marker line.
    pub start: usize,
    /// End of the end-marker text, terminator excluded.
    pub content_end: usize,
    /// End of the end-marker line, terminator included when present.
    pub end: usize,
    pub begin_line: usize,
    pub end_line: usize,
    /// The begin-marker line ends in `\r\n`.
    pub crlf: bool,
}

impl BlockSpan {
    fn terminator(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }
}

/// Result of looking for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Found(BlockSpan),
    Missing,
    /// A begin marker with no end marker after it.
    Unterminated { begin_line: usize },
}

struct Line<'a> {
    start: usize,
    end: usize,
    body: &'a [u8],
    crlf: bool,
}

fn lines(text: &[u8]) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive(|&b| b == b'\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let (body, crlf) = split_terminator(raw);
        Line {
            start,
            end: offset,
            body,
            crlf,
        }
    })
}

fn split_terminator(raw: &[u8]) -> (&[u8], bool) {
    if let Some(body) = raw.strip_suffix(b"\r\n") {
        (body, true)
    } else if let Some(body) = raw.strip_suffix(b"\n") {
        (body, false)
    } else {
        (raw, false)
    }
}

/// Number of lines in `text`; a final unterminated line counts.
pub fn line_count(text: &[u8]) -> usize {
    lines(text).count()
}

/// Find the first begin marker and the first end marker after it.
pub fn scan(text: &[u8], markers: &Markers) -> Scan {
    let begin = markers.begin.as_bytes();
    let end = markers.end.as_bytes();
    let mut open: Option<(usize, usize, bool)> = None;
    for (idx, line) in lines(text).enumerate() {
        match open {
            Some((begin_line, start, crlf)) => {
                if line.body == end {
                    return Scan::Found(BlockSpan {
                        start,
                        content_end: line.start + line.body.len(),
                        end: line.end,
                        begin_line,
                        end_line: idx + 1,
                        crlf,
                    });
                }
            }
            None => {
                if line.body == begin {
                    open = Some((idx + 1, line.start, line.crlf));
                }
            }
        }
    }
    match open {
        Some((begin_line, _, _)) => Scan::Unterminated { begin_line },
        None => Scan::Missing,
    }
}

/// Strip any trailing line terminators and end with exactly one.
pub fn normalize_block(block: &str, terminator: &str) -> String {
    let body = block.trim_end_matches(['\r', '\n']);
    let mut out = String::with_capacity(body.len() + terminator.len());
    out.push_str(body);
    out.push_str(terminator);
    out
}

/// Extract the block from remote text, normalized to one trailing terminator.
pub fn extract_block(remote: &str, markers: &Markers) -> Result<String, SyncError> {
    match scan(remote.as_bytes(), markers) {
        // Both offsets sit on line boundaries, so they are char boundaries too.
        Scan::Found(span) => Ok(normalize_block(
            &remote[span.start..span.content_end],
            span.terminator(),
        )),
        Scan::Missing => Err(SyncError::MalformedSource(format!(
            "no line equal to {:?}",
            markers.begin
        ))),
        Scan::Unterminated { begin_line } => Err(SyncError::MalformedSource(format!(
            "begin marker on line {begin_line} has no matching {:?}",
            markers.end
        ))),
    }
}

/// The block currently present in a local file, markers and terminator included.
pub fn current_block<'a>(
    local: &'a [u8],
    markers: &Markers,
) -> Result<Option<&'a [u8]>, SyncError> {
    match scan(local, markers) {
        Scan::Found(span) => Ok(Some(&local[span.start..span.end])),
        Scan::Missing => Ok(None),
        Scan::Unterminated { begin_line } => Err(unterminated_target(begin_line, markers)),
    }
}

fn unterminated_target(begin_line: usize, markers: &Markers) -> SyncError {
    SyncError::TargetMalformed(format!(
        "begin marker on line {begin_line} has no matching {:?}",
        markers.end
    ))
}

/// Line ending used by the first line of `text`; `\n` when there is none.
fn line_ending_of(text: &[u8]) -> &'static [u8] {
    match text.iter().position(|&b| b == b'\n') {
        Some(i) if i > 0 && text[i - 1] == b'\r' => b"\r\n",
        _ => b"\n",
    }
}

/// New local content with `block` spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced {
    pub content: Vec<u8>,
    pub action: SyncAction,
}

/// Replace the existing block in place, or append `block` when there is none.
///
/// `block` should already be normalized. Bytes outside the old block are kept
/// as-is; the only addition is a terminator before an appended block when the
/// file does not end in one.
pub fn splice(local: &[u8], block: &str, markers: &Markers) -> Result<Spliced, SyncError> {
    let block = block.as_bytes();
    match scan(local, markers) {
        Scan::Found(span) => {
            let mut content =
                Vec::with_capacity(local.len() - (span.end - span.start) + block.len());
            content.extend_from_slice(&local[..span.start]);
            content.extend_from_slice(block);
            content.extend_from_slice(&local[span.end..]);
            Ok(Spliced {
                content,
                action: SyncAction::Replaced,
            })
        }
        Scan::Missing => {
            let mut content = Vec::with_capacity(local.len() + block.len() + 2);
            content.extend_from_slice(local);
            if !local.is_empty() && !local.ends_with(b"\n") {
                content.extend_from_slice(line_ending_of(local));
            }
            content.extend_from_slice(block);
            Ok(Spliced {
                content,
                action: SyncAction::Appended,
            })
        }
        Scan::Unterminated { begin_line } => Err(unterminated_target(begin_line, markers)),
    }
}

/// Outcome of the pure synchronization step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synced {
    pub content: Vec<u8>,
    pub block: String,
    pub action: SyncAction,
    /// The new content differs from the old.
    pub changed: bool,
}

/// (remote text, local bytes) -> new local bytes.
pub fn synchronize(remote: &str, local: &[u8], markers: &Markers) -> Result<Synced, SyncError> {
    let block = extract_block(remote, markers)?;
    let spliced = splice(local, &block, markers)?;
    let changed = spliced.content != local;
    Ok(Synced {
        content: spliced.content,
        block,
        action: spliced.action,
        changed,
    })
}
