// src/bill_extract.rs

use crate::heuristics::{self, ExtractionResult};
use lopdf::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};

/// File types the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillFormat {
    /// Text layer of a PDF.
    Pdf,
    /// Photo or scan, read with OCR.
    Image,
}

impl BillFormat {
    /// Decide from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, BillError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(BillFormat::Pdf),
            "jpg" | "jpeg" | "png" => Ok(BillFormat::Image),
            _ => Err(BillError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BillError {
    /// The caller should have rejected this file before calling us.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR support not compiled in; rebuild with --features ocr and install Tesseract/Leptonica")]
    OcrUnavailable,

    #[error("Extraction task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Knobs for the readers behind [`extract_bill_with`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Tesseract language model, e.g. "eng".
    pub ocr_language: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ocr_language: "eng".to_string(),
        }
    }
}

/// Read a saved bill and look for the electricity usage on it.
pub async fn extract_bill(path: &Path) -> Result<ExtractionResult, BillError> {
    extract_bill_with(path, &ExtractOptions::default()).await
}

/// Like [`extract_bill`] with explicit reader options.
///
/// Only [`BillError::UnsupportedFormat`] is returned as an error. Every
/// reader failure becomes `ExtractionResult { success: false, error }` so the
/// caller can carry on with manually entered values.
pub async fn extract_bill_with(
    path: &Path,
    opts: &ExtractOptions,
) -> Result<ExtractionResult, BillError> {
    let format = BillFormat::from_path(path)?;
    let span = info_span!("bill", path = %path.display(), format = ?format);

    async {
        match read_bill_text(path.to_path_buf(), format, opts.ocr_language.clone()).await {
            Ok(text) => {
                info!(chars = text.len(), "Bill text read");
                let result = heuristics::parse_utility_bill(&text);
                info!(
                    success = result.success,
                    electricity = ?result.electricity,
                    confidence = result.confidence,
                    "Bill parsed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Bill extraction failed; manual input will be used");
                Ok(ExtractionResult::failed(e.to_string()))
            }
        }
    }
    .instrument(span)
    .await
}

async fn read_bill_text(
    path: PathBuf,
    format: BillFormat,
    language: String,
) -> Result<String, BillError> {
    tokio::task::spawn_blocking(move || match format {
        BillFormat::Pdf => pdf_text(&path),
        BillFormat::Image => ocr::image_text(&path, &language),
    })
    .await?
}

fn pdf_text(path: &Path) -> Result<String, BillError> {
    let bytes = std::fs::read(path).map_err(|source| BillError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    pdf_text_from_mem(&bytes)
}

/// Page-by-page text runs from the PDF text layer, falling back to
/// `pdf-extract` when lopdf finds nothing.
pub fn pdf_text_from_mem(bytes: &[u8]) -> Result<String, BillError> {
    let doc = Document::load_mem(bytes).map_err(|e| BillError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!(page = page_num, error = %e, "Could not read page text"),
        }
    }

    let text = join_text_runs(&pages);
    if !text.trim().is_empty() {
        return Ok(text);
    }

    info!("No text via page walk, trying pdf-extract");
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| BillError::Pdf(e.to_string()))
}

/// Concatenate every non-empty run, each followed by a single space.
fn join_text_runs(pages: &[String]) -> String {
    let mut out = String::new();
    for run in pages.iter().flat_map(|p| p.lines()) {
        let run = run.trim();
        if run.is_empty() {
            continue;
        }
        out.push_str(run);
        out.push(' ');
    }
    out
}

#[cfg(feature = "ocr")]
mod ocr {
    use super::BillError;
    use leptess::LepTess;
    use std::path::Path;

    pub fn image_text(path: &Path, language: &str) -> Result<String, BillError> {
        let mut lt = LepTess::new(None, language)
            .map_err(|e| BillError::Ocr(format!("tesseract init: {e}")))?;
        lt.set_image(path)
            .map_err(|e| BillError::Ocr(format!("loading {}: {e}", path.display())))?;
        lt.get_utf8_text()
            .map_err(|e| BillError::Ocr(format!("recognition: {e}")))
    }
}

#[cfg(not(feature = "ocr"))]
mod ocr {
    use super::BillError;
    use std::path::Path;

    pub fn image_text(_path: &Path, _language: &str) -> Result<String, BillError> {
        Err(BillError::OcrUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(BillFormat::from_path(Path::new("bill.PDF")).unwrap(), BillFormat::Pdf);
        assert_eq!(BillFormat::from_path(Path::new("a/b/scan.JpEg")).unwrap(), BillFormat::Image);
        assert_eq!(BillFormat::from_path(Path::new("scan.png")).unwrap(), BillFormat::Image);
        assert!(matches!(
            BillFormat::from_path(Path::new("bill.docx")),
            Err(BillError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            BillFormat::from_path(Path::new("no_extension")),
            Err(BillError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_format_propagates() {
        let err = extract_bill(Path::new("statement.txt")).await.unwrap_err();
        assert!(matches!(err, BillError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_missing_pdf_degrades_to_failure() {
        let result = extract_bill(Path::new("/nonexistent/dir/bill.pdf")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.electricity, None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.unwrap().starts_with("Failed to read"));
    }

    #[cfg(not(feature = "ocr"))]
    #[tokio::test]
    async fn test_image_without_ocr_degrades_to_failure() {
        let result = extract_bill(Path::new("meter_photo.png")).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("OCR support not compiled in"));
    }

    #[test]
    fn test_garbage_bytes() {
        let result = pdf_text_from_mem(b"this is not a pdf");
        assert!(matches!(result, Err(BillError::Pdf(_))));
    }

    fn one_page_pdf(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_text_layer_is_parsed() {
        let text = pdf_text_from_mem(&one_page_pdf("Total kWh: 500")).unwrap();
        let result = heuristics::parse_utility_bill(&text);
        assert!(result.success);
        assert_eq!(result.electricity, Some(500.0));
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_pdf_bill_on_disk() {
        let path =
            std::env::temp_dir().join(format!("carbon_coach_bill_{}.pdf", std::process::id()));
        std::fs::write(&path, one_page_pdf("Total kWh: 500")).unwrap();

        let result = extract_bill(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result, ExtractionResult::found(500.0, 1.0));
    }

    #[test]
    fn test_join_text_runs() {
        let pages = vec![
            "Account 1234\nTotal kWh: 500\n".to_string(),
            "\n  Due date  \n".to_string(),
        ];
        assert_eq!(join_text_runs(&pages), "Account 1234 Total kWh: 500 Due date ");
    }
}
