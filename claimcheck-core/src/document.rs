//! Uploaded documents: run-scoped staging on disk and text extraction.
//!
//! An upload is written to a named temp file, handed to a `DocumentLoader`,
//! and the file is removed before verification starts. Removal also happens
//! on every early return because `StagedDocument` deletes on drop.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::extractor::truncate_chars;
use crate::models::RunOutcome;
use crate::pipeline::VerificationPipeline;
use crate::progress::ProgressSink;

/// Characters of extracted text echoed back as a preview.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("could not read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid UTF-8 text")]
    NotText,

    #[error("could not parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("document is empty")]
    Empty,

    #[error("document loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// File → text collaborator.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String, DocumentError>;

    fn name(&self) -> &str;
}

/// Loads UTF-8 text. Form feeds are treated as page breaks and the pages
/// are joined with single spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<String, DocumentError> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| DocumentError::NotText)?;
        Ok(join_pages(&text))
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

/// Extracts the text layer of a PDF page by page. Pages are joined with
/// single spaces; pages without text are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<String, DocumentError> {
        let doc = lopdf::Document::load(path)?;
        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            let text = doc.extract_text(&[*page_number])?;
            let text = text.trim();
            if !text.is_empty() {
                pages.push(text.to_string());
            }
        }
        tracing::debug!(pages = pages.len(), "PDF text extracted");
        Ok(pages.join(" "))
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Picks `PdfLoader` for `.pdf` files or files starting with `%PDF-`, and
/// `PlainTextLoader` for everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoLoader;

impl AutoLoader {
    pub fn is_pdf(path: &Path) -> Result<bool, DocumentError> {
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if by_extension {
            return Ok(true);
        }

        let mut header = Vec::with_capacity(PDF_MAGIC.len());
        std::fs::File::open(path)?
            .take(PDF_MAGIC.len() as u64)
            .read_to_end(&mut header)?;
        Ok(header == PDF_MAGIC)
    }
}

impl DocumentLoader for AutoLoader {
    fn load(&self, path: &Path) -> Result<String, DocumentError> {
        if Self::is_pdf(path)? {
            PdfLoader.load(path)
        } else {
            PlainTextLoader.load(path)
        }
    }

    fn name(&self) -> &str {
        "auto"
    }
}

pub fn join_pages(text: &str) -> String {
    text.split('\x0c')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An upload held in a temp file for the duration of one run.
pub struct StagedDocument {
    file: NamedTempFile,
}

impl StagedDocument {
    /// Write `bytes` to a fresh temp file. The extension of `file_name`, if
    /// any, is kept so loaders can dispatch on it.
    pub fn stage(bytes: &[u8], file_name: Option<&str>) -> Result<Self, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }

        let suffix = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("claimcheck-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), size = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temp file now, reporting any failure.
    pub fn release(self) -> Result<(), DocumentError> {
        self.file.close()?;
        Ok(())
    }
}

/// Outcome of checking one uploaded document.
#[derive(Debug)]
pub struct DocumentCheck {
    pub outcome: RunOutcome,
    /// First `PREVIEW_CHARS` characters of the extracted text.
    pub preview: String,
}

/// Stage an upload, extract its text, release the file, and run the pipeline.
///
/// Staging and loading run on the blocking pool. Document failures abort the
/// run before any claim is extracted.
pub async fn check_document(
    pipeline: &VerificationPipeline,
    loader: Arc<dyn DocumentLoader>,
    bytes: &[u8],
    file_name: Option<&str>,
    sink: &dyn ProgressSink,
) -> Result<DocumentCheck, DocumentError> {
    let bytes = bytes.to_vec();
    let file_name = file_name.map(str::to_string);
    let blocking_loader = Arc::clone(&loader);

    let text = tokio::task::spawn_blocking(move || {
        let staged = StagedDocument::stage(&bytes, file_name.as_deref())?;
        let text = blocking_loader.load(staged.path())?;
        if let Err(e) = staged.release() {
            tracing::warn!(error = %e, "Failed to remove staged upload");
        }
        Ok::<_, DocumentError>(text)
    })
    .await??;

    tracing::info!(
        loader = loader.name(),
        chars = text.chars().count(),
        "Document text extracted"
    );

    let preview = truncate_chars(&text, PREVIEW_CHARS).to_string();
    let outcome = pipeline.run(&text, sink).await;
    Ok(DocumentCheck { outcome, preview })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_join_pages_uses_single_spaces() {
        assert_eq!(join_pages("Page one.\n\x0c\nPage two.\x0c"), "Page one. Page two.");
        assert_eq!(join_pages("  single page \n"), "single page");
        assert_eq!(join_pages("\x0c\x0c"), "");
    }

    #[test]
    fn test_stage_keeps_extension_and_content() {
        let staged = StagedDocument::stage(b"hello", Some("report.txt")).unwrap();
        assert_eq!(staged.path().extension().and_then(|e| e.to_str()), Some("txt"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello");
    }

    #[test]
    fn test_stage_rejects_empty_upload() {
        assert!(matches!(
            StagedDocument::stage(b"", None),
            Err(DocumentError::Empty)
        ));
    }

    #[test]
    fn test_staged_file_removed_on_drop_and_release() {
        let dropped: PathBuf = {
            let staged = StagedDocument::stage(b"x", None).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!dropped.exists());

        let staged = StagedDocument::stage(b"y", None).unwrap();
        let released = staged.path().to_path_buf();
        staged.release().unwrap();
        assert!(!released.exists());
    }

    /// Builds a PDF with one Courier text line per page.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

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

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_pdf_loader_joins_pages_with_spaces() {
        let bytes = pdf_with_pages(&["Revenue grew 40% in 2023.", "Headcount reached 1,200."]);
        let staged = StagedDocument::stage(&bytes, Some("report.pdf")).unwrap();

        let text = PdfLoader.load(staged.path()).unwrap();
        assert_eq!(text, "Revenue grew 40% in 2023. Headcount reached 1,200.");
    }

    #[test]
    fn test_pdf_loader_rejects_garbage() {
        let staged = StagedDocument::stage(b"not a pdf at all", Some("scan.pdf")).unwrap();
        assert!(matches!(
            PdfLoader.load(staged.path()),
            Err(DocumentError::Pdf(_))
        ));
    }

    #[test]
    fn test_auto_loader_detects_pdf_by_extension_or_header() {
        let bytes = pdf_with_pages(&["Only page."]);

        let named = StagedDocument::stage(&bytes, Some("REPORT.PDF")).unwrap();
        assert!(AutoLoader::is_pdf(named.path()).unwrap());

        let unnamed = StagedDocument::stage(&bytes, None).unwrap();
        assert!(AutoLoader::is_pdf(unnamed.path()).unwrap());
        assert_eq!(AutoLoader.load(unnamed.path()).unwrap(), "Only page.");

        let text = StagedDocument::stage(b"Plain words.\x0cMore.", Some("notes.txt")).unwrap();
        assert!(!AutoLoader::is_pdf(text.path()).unwrap());
        assert_eq!(AutoLoader.load(text.path()).unwrap(), "Plain words. More.");
    }

    #[test]
    fn test_plain_text_loader_rejects_binary() {
        let staged = StagedDocument::stage(&[0xff, 0xfe, 0x00, 0x9f], Some("scan.pdf")).unwrap();
        assert!(matches!(
            PlainTextLoader.load(staged.path()),
            Err(DocumentError::NotText)
        ));
    }
}
