//! Label normalization for ledger and master text.
//!
//! Ledger exports mix full-width and half-width forms ("ＭＲＦ" vs "MRF") and
//! carry stray whitespace. Every category or asset-type label is passed through
//! `normalize_label` before it is compared against a master.

use unicode_normalization::UnicodeNormalization;

pub fn normalize_label(s: &str) -> String {
    let folded: String = s.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
