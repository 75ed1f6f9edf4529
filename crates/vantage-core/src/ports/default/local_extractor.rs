//! Default extractor port: filesystem-local text/PDF/spreadsheet/docx
//! extraction, with an LLM-driven OCR fallback for images and
//! text-sparse PDFs (spec §4.3 stage 3).
//!
//! No direct teacher precedent (the teacher ingests code/markdown, not
//! office documents); grounded on the spec's own dispatch-by-file_type
//! description and the pack's `lopdf`/`encoding_rs` usage
//! (`0xPlaygrounds-rig`, `Toasterson-akh-medu`).

use crate::error::ExtractError;
use crate::ports::{ExtractedContent, Extractor, Llm};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Below this character count, a PDF's extracted text is considered too
/// sparse and the OCR fallback kicks in (spec §4.3 stage 3, §8 boundary
/// behavior).
pub const OCR_MIN_CHARS_THRESHOLD: usize = 100;

pub struct LocalExtractor {
    llm: Option<Arc<dyn Llm>>,
    ocr_min_chars: usize,
}

impl LocalExtractor {
    pub fn new(llm: Option<Arc<dyn Llm>>, ocr_min_chars: usize) -> Self {
        Self { llm, ocr_min_chars }
    }

    /// UTF-8 → UTF-16 → Latin-1 → CP-1252 fallback chain (spec §4.3 stage 3).
    fn decode_text(bytes: &[u8]) -> String {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return s.to_string();
        }
        if bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            if let Ok(s) = String::from_utf16(&units) {
                return s;
            }
        }
        let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
        if !had_errors {
            return cow.into_owned();
        }
        let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        cow.into_owned()
    }

    fn extract_pdf_text(bytes: &[u8]) -> Result<(String, u32), ExtractError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Backend(e.to_string()))?;
        let page_count = doc.get_pages().len() as u32;
        let mut text = String::new();
        for (page_num, _) in doc.get_pages() {
            if let Ok(page_text) = doc.extract_text(&[page_num]) {
                text.push_str(&page_text);
                text.push('\n');
            }
        }
        Ok((text, page_count))
    }

    fn extract_xlsx(path: &Path) -> Result<String, ExtractError> {
        use calamine::Reader;
        let mut workbook: calamine::Xlsx<_> = calamine::open_workbook(path).map_err(|e| ExtractError::Backend(e.to_string()))?;
        let mut out = String::new();
        for sheet_name in workbook.sheet_names().to_owned() {
            if let Ok(range) = workbook.worksheet_range(&sheet_name) {
                let mut rows = range.rows();
                if let Some(header) = rows.next() {
                    let headers: Vec<String> = header.iter().map(|c| c.to_string()).collect();
                    out.push_str(&format!("Column headers: {}\n", headers.join(", ")));
                }
                for row in rows {
                    let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                    out.push_str(&cells.join("\t"));
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }

    fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
        use quick_xml::events::Event;
        use quick_xml::Reader;
        use std::io::{Cursor, Read};

        let cursor = Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor).map_err(|e| ExtractError::Backend(e.to_string()))?;
        let mut document_xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Backend(e.to_string()))?
            .read_to_string(&mut document_xml)
            .map_err(ExtractError::Io)?;

        let mut reader = Reader::from_str(&document_xml);
        reader.config_mut().trim_text(true);
        let mut out = String::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Text(e)) => out.push_str(&e.unescape().unwrap_or_default()),
                Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => out.push('\n'),
                Ok(Event::Eof) => break,
                Err(e) => return Err(ExtractError::Backend(e.to_string())),
                _ => {}
            }
            buf.clear();
        }
        Ok(out)
    }
}

#[async_trait]
impl Extractor for LocalExtractor {
    async fn extract(&self, path: &Path, file_type: &str) -> Result<ExtractedContent, ExtractError> {
        let ext = file_type.to_lowercase();
        match ext.as_str() {
            "txt" | "md" | "csv" => {
                let bytes = tokio::fs::read(path).await?;
                Ok(ExtractedContent { raw_text: Self::decode_text(&bytes), ..Default::default() })
            }
            "pdf" => {
                let bytes = tokio::fs::read(path).await?;
                let (text, page_count) = Self::extract_pdf_text(&bytes)?;
                if text.trim().chars().count() < self.ocr_min_chars {
                    if let Some(llm) = &self.llm {
                        let described = llm.describe_image(&bytes, "application/pdf").await;
                        if let Ok(ocr_text) = described {
                            if !ocr_text.trim().is_empty() {
                                return Ok(ExtractedContent { raw_text: ocr_text, page_count: Some(page_count), ..Default::default() });
                            }
                        }
                    }
                    return Err(ExtractError::Backend("pdf text extraction and OCR fallback both empty".into()));
                }
                Ok(ExtractedContent { raw_text: text, page_count: Some(page_count), ..Default::default() })
            }
            "xlsx" | "xls" => {
                let path = path.to_path_buf();
                let text = tokio::task::spawn_blocking(move || Self::extract_xlsx(&path))
                    .await
                    .map_err(|e| ExtractError::Backend(e.to_string()))??;
                Ok(ExtractedContent { raw_text: text, tables: None, ..Default::default() })
            }
            "docx" => {
                let bytes = tokio::fs::read(path).await?;
                let text = Self::extract_docx(&bytes)?;
                Ok(ExtractedContent { raw_text: text, ..Default::default() })
            }
            "doc" => Err(ExtractError::UnsupportedType("legacy .doc requires external conversion".into())),
            "png" | "jpg" | "jpeg" | "gif" | "webp" => {
                let bytes = tokio::fs::read(path).await?;
                let mime = format!("image/{}", if ext == "jpg" { "jpeg" } else { ext.as_str() });
                match &self.llm {
                    Some(llm) => {
                        let described = llm.describe_image(&bytes, &mime).await.map_err(|e| ExtractError::Backend(e.to_string()))?;
                        Ok(ExtractedContent { raw_text: described, ..Default::default() })
                    }
                    None => Err(ExtractError::Backend("no image-capable LLM configured".into())),
                }
            }
            other => Err(ExtractError::UnsupportedType(other.to_string())),
        }
    }
}
