use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;
use lopdf::Document;
use pdf_extract::extract_text;

use crate::error::{AppError, AppResult};
use crate::services::page_layout::page_lines;
use crate::services::table_extractor::TableExtractor;

#[derive(Debug, Clone)]
pub struct PdfProcessor {
    max_table_pages: usize,
    tables: TableExtractor,
}

#[derive(Debug)]
pub struct ExtractionResult {
    pub text: Option<String>,
    pub tables: Vec<String>,
    pub pages: usize,
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.tables.is_empty()
    }
}

impl PdfProcessor {
    pub fn new(max_table_pages: usize) -> Self {
        Self {
            max_table_pages,
            tables: TableExtractor::new(),
        }
    }

    /// Extracts text and tables from the PDF at `path`.
    ///
    /// Parsing runs on the blocking pool. A document with neither text nor
    /// tables is an [`AppError::ExtractionFailed`].
    pub async fn extract(&self, path: &Path) -> AppResult<ExtractionResult> {
        let processor = self.clone();
        let path = path.to_path_buf();

        let result = tokio::task::spawn_blocking(move || processor.extract_blocking(path))
            .await
            .map_err(|e| AppError::processing(format!("PDF extraction task failed: {}", e)))?;

        if result.is_empty() {
            tracing::warn!(pages = result.pages, "No text or tables extracted from PDF");
            return Err(AppError::ExtractionFailed);
        }
        Ok(result)
    }

    fn extract_blocking(&self, path: PathBuf) -> ExtractionResult {
        let start = Instant::now();

        let document = match Document::load(&path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("PDF structure validation failed: {}, will try text extraction anyway", e);
                None
            }
        };

        let text = self.extract_document_text(&path, document.as_ref());
        let tables = match document.as_ref() {
            Some(doc) => self.extract_document_tables(doc),
            None => Vec::new(),
        };
        let pages = document.as_ref().map(|doc| doc.get_pages().len()).unwrap_or(0);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            pages = pages,
            text_length = text.as_ref().map(|t| t.len()).unwrap_or(0),
            tables = tables.len(),
            processing_time_ms = processing_time_ms,
            "PDF processing completed"
        );

        ExtractionResult {
            text,
            tables,
            pages,
            processing_time_ms,
        }
    }

    fn extract_document_text(&self, path: &Path, document: Option<&Document>) -> Option<String> {
        // pdf-extract panics on some malformed fonts; treat that like an error.
        let extracted = match panic::catch_unwind(|| extract_text(path)) {
            Ok(Ok(text)) => {
                tracing::debug!("PDF text extraction successful, {} characters", text.len());
                Some(text)
            }
            Ok(Err(e)) => {
                tracing::warn!("PDF text extraction failed: {}, falling back to page text", e);
                None
            }
            Err(_) => {
                tracing::warn!("PDF text extraction panicked, falling back to page text");
                None
            }
        };

        let text = match extracted {
            Some(text) if !text.trim().is_empty() => text,
            _ => document.and_then(|doc| {
                let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
                match doc.extract_text(&page_numbers) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!("Page text extraction failed: {}", e);
                        None
                    }
                }
            })?,
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn extract_document_tables(&self, document: &Document) -> Vec<String> {
        let page_texts: Vec<String> = document
            .get_pages()
            .into_iter()
            .take(self.max_table_pages)
            .filter_map(|(page, page_id)| match page_lines(document, page_id) {
                Ok(lines) => Some(lines.join("\n")),
                Err(e) => {
                    tracing::warn!(page = page, error = %e, "Skipping page during table detection");
                    None
                }
            })
            .collect();

        self.tables.extract_tables(&page_texts)
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new(20)
    }
}
