//! Extraction stage (spec §4.3 stage 3): dispatch by file type.
//!
//! Plain text is decoded locally through the UTF-8 → UTF-16 → Latin-1 →
//! CP-1252 fallback chain; every other supported type (PDF, word
//! processors, spreadsheets, images) is delegated to the injected
//! [`Extractor`] port, which owns OCR and the heavier format parsers.

use crate::error::ExtractError;
use crate::ports::{ExtractedContent, Extractor};
use encoding_rs::{UTF_16LE, WINDOWS_1252};
use std::path::Path;

const PLAIN_TEXT_TYPES: &[&str] = &["txt", "md", "csv"];

pub async fn extract(extractor: &dyn Extractor, path: &Path, file_type: &str) -> Result<ExtractedContent, ExtractError> {
    if PLAIN_TEXT_TYPES.contains(&file_type) {
        let bytes = tokio::fs::read(path).await?;
        return Ok(ExtractedContent { raw_text: decode_text(&bytes), tables: None, page_count: None, author: None });
    }
    extractor.extract(path, file_type).await
}

/// Try UTF-8 first, then UTF-16LE (BOM or not), then Windows-1252 as the
/// catch-all legacy fallback (spec §4.3 stage 3 encoding chain).
fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if bytes.len() >= 2 && bytes.len() % 2 == 0 {
        let (text, _, had_errors) = UTF_16LE.decode(bytes);
        if !had_errors {
            return text.into_owned();
        }
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn falls_back_to_windows_1252_for_invalid_utf8() {
        // 0x93/0x94 are curly quotes in CP-1252, not valid standalone UTF-8.
        let bytes = vec![0x93, b'h', b'i', 0x94];
        let decoded = decode_text(&bytes);
        assert!(decoded.contains("hi"));
    }
}
