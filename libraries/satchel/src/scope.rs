//! Offline inspection of files copied out of the browser's storage.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::envelope::{self, FORMAT_VERSION, Header};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct ScopeReport {
    pub size: usize,
    pub header: Result<Header, String>,
    pub checksum_ok: bool,
    pub payload: Option<serde_json::Value>,
    pub cached_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ScopeReport {
    pub fn is_expired(&self, now: DateTime<Utc>) -> Option<bool> {
        self.expires_at.map(|expires_at| now > expires_at)
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Size: {} bytes ({:.2} KB)", self.size, self.size as f64 / 1024.0);

        match &self.header {
            Ok(header) => {
                let _ = writeln!(out, "Format version: {}", header.version);
                if header.version != FORMAT_VERSION {
                    let _ = writeln!(out, "  ⚠️  expected version {FORMAT_VERSION}");
                }
                let _ = writeln!(out, "Checksum: {:016x}", header.checksum);
                if self.checksum_ok {
                    let _ = writeln!(out, "  ✅ payload matches checksum");
                } else {
                    let _ = writeln!(out, "  ❌ payload does NOT match checksum");
                }
            }
            Err(e) => {
                let _ = writeln!(out, "❌ Not a satchel file: {e}");
                return out;
            }
        }

        match &self.payload {
            Some(value) => {
                let _ = writeln!(out, "Payload: {}", preview(&value.to_string()));
            }
            None => {
                let _ = writeln!(out, "Payload: not valid JSON");
            }
        }

        if let Some(cached_at) = self.cached_at {
            let _ = writeln!(out, "Cached at: {cached_at}");
        }
        if let Some(expires_at) = self.expires_at {
            let _ = writeln!(out, "Expires at: {expires_at}");
        }
        match self.is_expired(now) {
            Some(true) => {
                let _ = writeln!(out, "  ⚠️  entry has expired");
            }
            Some(false) => {
                let _ = writeln!(out, "  ✅ entry is fresh");
            }
            None => {}
        }

        out
    }
}

pub fn inspect_bytes(bytes: &[u8]) -> ScopeReport {
    let header = envelope::read_header(bytes).map_err(|e| e.to_string());
    let opened = envelope::open(bytes);
    let checksum_ok = opened.is_ok();

    // Show the payload even when the checksum fails, it is the interesting case.
    let payload = match (&header, opened) {
        (_, Ok(payload)) => serde_json::from_slice::<serde_json::Value>(payload).ok(),
        (Ok(_), Err(_)) => {
            serde_json::from_slice::<serde_json::Value>(&bytes[envelope::HEADER_LEN..]).ok()
        }
        (Err(_), Err(_)) => None,
    };

    let timestamp = |field: &str| {
        payload
            .as_ref()
            .and_then(|value| value.get(field))
            .and_then(serde_json::Value::as_i64)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    };

    ScopeReport {
        size: bytes.len(),
        cached_at: timestamp("cachedAt"),
        expires_at: timestamp("expiresAt"),
        header,
        checksum_ok,
        payload,
    }
}

pub fn inspect_file(path: &Path) -> std::io::Result<ScopeReport> {
    let bytes = std::fs::read(path)?;
    Ok(inspect_bytes(&bytes))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
