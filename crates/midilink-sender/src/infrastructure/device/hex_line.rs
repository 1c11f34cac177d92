//! Reads control events as lines of three hex bytes, e.g. `90 3c 64`.
//!
//! Blank lines and lines starting with `#` are ignored.  Malformed lines are
//! logged and skipped so one typo does not end the session.  `00 00 00` is
//! reserved for the end-of-session marker and is rejected here; the sender
//! emits it by itself when the source closes.

use async_trait::async_trait;
use midilink_core::{ControlEvent, ControlEventSource};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

/// Why a line is not a control event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected 3 bytes, got {0}")]
    WrongLength(usize),
    #[error("{0:?} is not a hex byte")]
    BadByte(String),
    #[error("00 00 00 is reserved for ending the session")]
    Reserved,
}

/// Parses one line.  `Ok(None)` means the line carries no event.
///
/// # Errors
///
/// Returns [`LineError`] for lines that look like events but are not.
pub fn parse_event_line(line: &str) -> Result<Option<ControlEvent>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let bytes = line
        .split_whitespace()
        .map(|word| {
            let digits = word
                .strip_prefix("0x")
                .or_else(|| word.strip_prefix("0X"))
                .unwrap_or(word);
            u8::from_str_radix(digits, 16).map_err(|_| LineError::BadByte(word.to_string()))
        })
        .collect::<Result<Vec<u8>, _>>()?;
    let &[status, data1, data2] = bytes.as_slice() else {
        return Err(LineError::WrongLength(bytes.len()));
    };
    let event = ControlEvent::new(status, data1, data2);
    if event.is_shutdown() {
        return Err(LineError::Reserved);
    }
    Ok(Some(event))
}

/// [`ControlEventSource`] over any async line reader (stdin, a pipe, a file).
pub struct HexLineSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: AsyncBufRead + Unpin> HexLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ControlEventSource for HexLineSource<R> {
    async fn next_event(&mut self) -> Option<ControlEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("event input closed after {} lines", self.line_no);
                    return None;
                }
                Err(e) => {
                    warn!("event input failed: {e}");
                    return None;
                }
            };
            self.line_no += 1;
            match parse_event_line(&line) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(e) => warn!("line {}: {e}; skipped", self.line_no),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
