//! Normalization stage (spec §4.3 stage 4): truncate, collapse control
//! whitespace, NFKC-normalize.

use unicode_normalization::UnicodeNormalization;

/// Collapse runs of control/whitespace characters (other than a single
/// space) into one space, then apply Unicode NFKC, then truncate to
/// `max_chars` on a char boundary.
pub fn normalize(raw_text: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(raw_text);
    let nfkc: String = collapsed.nfkc().collect();
    if nfkc.chars().count() <= max_chars {
        nfkc
    } else {
        nfkc.chars().take(max_chars).collect()
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch.is_control() {
            if !in_whitespace_run {
                out.push(' ');
                in_whitespace_run = true;
            }
        } else {
            out.push(ch);
            in_whitespace_run = false;
        }
    }
    out.trim().to_string()
}
