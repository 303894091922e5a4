//! The decoded bank-code → method-id table.
//!
//! A [`LutTable`] is built once per successful parse and is immutable
//! afterwards.  It owns its own key strings; nothing in it borrows the
//! source buffer.

use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};
use tracing::{debug, warn};

use crate::signature::Format;

/// Identifier of an account-number check method (0x00–0xC6 in practice).
pub type MethodId = u8;

/// Render a bank code as its lookup key: decimal, zero-padded to 8 digits.
#[inline]
pub fn bank_code_key(code: u32) -> String {
    format!("{code:08}")
}

// ── ChecksumStatus ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChecksumStatus {
    Verified,
    /// Format 1.x only; parsing continued.
    Mismatch { stored: u32, computed: u32 },
    /// Format 2.0 files carry no checksum.
    NotChecked,
}

// ── TableInfo ─────────────────────────────────────────────────────────────────

/// Header and decode statistics for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub format:           Format,
    /// Legacy info line(s), or Format 2.0 metadata lines before `DATA`.
    pub header_lines:     Vec<String>,
    /// Legacy `entry_count`, or Format 2.0 `main_office_count`.
    pub declared_entries: u32,
    /// Format 2.0 `total_count`.
    pub declared_total:   Option<u32>,
    /// Legacy records marked invalid with the 0xFF sentinel.
    pub skipped:          usize,
    /// Entries that overwrote an earlier entry with the same key.
    pub duplicates:       usize,
    /// Legacy stream ended cleanly before `entry_count` records.
    pub truncated:        bool,
    pub checksum:         ChecksumStatus,
    /// BLAKE3 of the source bytes, hex-encoded.
    pub source_digest:    String,
}

impl TableInfo {
    pub(crate) fn new(format: Format, source: &[u8]) -> Self {
        Self {
            format,
            header_lines:     Vec::new(),
            declared_entries: 0,
            declared_total:   None,
            skipped:          0,
            duplicates:       0,
            truncated:        false,
            checksum:         ChecksumStatus::NotChecked,
            source_digest:    blake3::hash(source).to_hex().to_string(),
        }
    }
}

// ── LutTable ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutTable {
    entries: BTreeMap<String, MethodId>,
    info:    TableInfo,
}

impl LutTable {
    /// Exact-match lookup.  `bank_code` must already be normalized to eight
    /// digits; no padding or trimming happens here.
    #[inline]
    pub fn lookup(&self, bank_code: &str) -> Option<MethodId> {
        self.entries.get(bank_code).copied()
    }

    pub fn contains(&self, bank_code: &str) -> bool {
        self.entries.contains_key(bank_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MethodId)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    pub fn format(&self) -> Format {
        self.info.format
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Accumulates decoded pairs in file order; later duplicates win.
pub(crate) struct TableBuilder {
    entries: BTreeMap<String, MethodId>,
    info:    TableInfo,
}

impl TableBuilder {
    pub(crate) fn new(info: TableInfo) -> Self {
        Self { entries: BTreeMap::new(), info }
    }

    pub(crate) fn info_mut(&mut self) -> &mut TableInfo {
        &mut self.info
    }

    pub(crate) fn insert(&mut self, code: u32, method: MethodId) {
        match self.entries.entry(bank_code_key(code)) {
            Entry::Vacant(e) => {
                e.insert(method);
            }
            Entry::Occupied(mut e) => {
                debug!(bank_code = %e.key(), old = *e.get(), new = method, "duplicate bank code, keeping later entry");
                e.insert(method);
                self.info.duplicates += 1;
            }
        }
    }

    pub(crate) fn finish(self) -> LutTable {
        if self.info.duplicates > 0 {
            warn!(duplicates = self.info.duplicates, "duplicate bank codes overwritten by later entries");
        }
        LutTable { entries: self.entries, info: self.info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[test]
    fn keys_are_zero_padded() {
        assert_eq!(bank_code_key(100), "00000100");
        assert_eq!(bank_code_key(10_020_030), "10020030");
        assert_eq!(bank_code_key(0), "00000000");
    }

    #[test]
    fn later_duplicate_overwrites() {
        let mut b = TableBuilder::new(TableInfo::new(Format::V1_0, b""));
        b.insert(5, 1);
        b.insert(5, 9);
        b.insert(7, 2);
        let t = b.finish();
        assert_eq!(t.len(), 2);
        assert_eq!(t.lookup("00000005"), Some(9));
        assert_eq!(t.info().duplicates, 1);
    }

    #[derive(Clone)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicates_warn_once_per_table() {
        let sink = Captured(Arc::new(Mutex::new(Vec::new())));
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let table = tracing::subscriber::with_default(subscriber, || {
            let mut b = TableBuilder::new(TableInfo::new(Format::V1_0, b""));
            for method in 0..4 {
                b.insert(5, method);
                b.insert(6, method);
            }
            b.finish()
        });
        assert_eq!(table.info().duplicates, 6);

        let logged = String::from_utf8(sink.0.lock().clone()).unwrap();
        assert_eq!(logged.lines().count(), 1, "{logged}");
        assert!(logged.contains("duplicates=6"), "{logged}");
    }

    #[test]
    fn lookup_is_exact_match() {
        let mut b = TableBuilder::new(TableInfo::new(Format::V2_0, b""));
        b.insert(100, 7);
        let t = b.finish();
        assert_eq!(t.lookup("00000100"), Some(7));
        assert_eq!(t.lookup("100"), None);
        assert_eq!(t.lookup(" 00000100"), None);
    }
}
