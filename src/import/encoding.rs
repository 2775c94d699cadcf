//! Legacy character encoding conversion (spec §4.I item 1): source text
//! columns arrive in a legacy single/double-byte encoding and are converted
//! to UTF-8 with lossy replacement of unmappable sequences. Grounded on
//! `original_source/backend/app/migrations/migrate_legacy_data.py`'s
//! `Big5ToUTF8Converter` (replace-on-error, conversion counters).

use encoding_rs::Encoding;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks how many conversions hit a replacement character, mirroring the
/// source converter's "conversion report".
pub struct EncodingConverter {
    encoding: &'static Encoding,
    converted: AtomicU64,
    replaced: AtomicU64,
}

impl EncodingConverter {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding, converted: AtomicU64::new(0), replaced: AtomicU64::new(0) }
    }

    pub fn big5() -> Self {
        Self::new(encoding_rs::BIG5)
    }

    /// Converts one legacy-encoded byte string to UTF-8, replacing
    /// unmappable sequences with U+FFFD and counting the conversion.
    pub fn convert(&self, raw: &[u8]) -> String {
        let (text, _, had_errors) = self.encoding.decode(raw);
        self.converted.fetch_add(1, Ordering::Relaxed);
        if had_errors {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
        text.into_owned()
    }

    pub fn converted_count(&self) -> u64 {
        self.converted.load(Ordering::Relaxed)
    }

    pub fn replaced_count(&self) -> u64 {
        self.replaced.load(Ordering::Relaxed)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.converted_count();
        if total == 0 {
            1.0
        } else {
            (total - self.replaced_count()) as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_ascii_converts_without_replacement() {
        let c = EncodingConverter::big5();
        let out = c.convert(b"ABC123");
        assert_eq!(out, "ABC123");
        assert_eq!(c.replaced_count(), 0);
        assert_eq!(c.converted_count(), 1);
    }

    #[test]
    fn invalid_byte_sequence_is_replaced_not_rejected() {
        let c = EncodingConverter::big5();
        let out = c.convert(&[0xff, 0xfe]);
        assert!(out.contains('\u{FFFD}'));
        assert_eq!(c.replaced_count(), 1);
    }

    #[test]
    fn success_rate_reflects_replacement_ratio() {
        let c = EncodingConverter::big5();
        c.convert(b"ok");
        c.convert(&[0xff, 0xfe]);
        assert_eq!(c.success_rate(), 0.5);
    }
}
