//! Orchestrates the extraction fallback chain for one uploaded document:
//!
//! 1. structured barcode decode (aadhaar/pan XML payloads, opaque passport
//!    barcodes),
//! 2. free text (embedded PDF text, then OCR) fed to the chat model with a
//!    strict schema prompt.
//!
//! Every stage failure except an unsupported document type is downgraded to
//! "no data from this stage" and the next attempt runs. The chain is a flat
//! sequence; the caller always gets a typed outcome.

use crate::barcode::parse_structured_payload;
use crate::error::ExtractError;
use crate::extractor::{extract_embedded_pages, join_pages, OcrEngine};
use crate::llm::{parse_model_fields, schema_prompt, ChatModel};
use crate::models::{DocType, DocumentRecord, FieldSource, UploadedDocument};
use crate::scanner::BarcodeScanner;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const INTAKE_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Result of running the chain over one document.
#[derive(Debug, Clone)]
pub enum ExtractOutcome {
    /// Stage 1 decoded a barcode payload.
    Structured(DocumentRecord),
    /// Stage 2 produced fields the model output parsed into.
    Parsed(DocumentRecord),
    /// The model answered, but its output was not JSON even after the
    /// lenient parse. The raw output is kept for diagnosis.
    Unparsed { raw_output: String, details: String },
    /// No stage produced data; a warning for the user, not a failure.
    Empty { reason: String },
}

impl ExtractOutcome {
    pub fn record(&self) -> Option<&DocumentRecord> {
        match self {
            ExtractOutcome::Structured(record) | ExtractOutcome::Parsed(record) => Some(record),
            _ => None,
        }
    }
}

pub struct DocumentPipeline<S, O, M>
where
    S: BarcodeScanner,
    O: OcrEngine,
    M: ChatModel,
{
    scanner: S,
    ocr: O,
    model: M,
}

impl<S, O, M> DocumentPipeline<S, O, M>
where
    S: BarcodeScanner + Send + Sync,
    O: OcrEngine + Send + Sync,
    M: ChatModel + Send + Sync,
{
    pub fn new(scanner: S, ocr: O, model: M) -> Self {
        Self {
            scanner,
            ocr,
            model,
        }
    }

    pub async fn extract(
        &self,
        document: &UploadedDocument,
        doc_type: DocType,
    ) -> ExtractOutcome {
        if let Some(record) = self.attempt_barcode(document, doc_type).await {
            return ExtractOutcome::Structured(record);
        }

        let text = self.attempt_text(document).await;
        if text.trim().is_empty() {
            return ExtractOutcome::Empty {
                reason: format!(
                    "no barcode and no readable text in {}",
                    document.file_name
                ),
            };
        }

        self.attempt_model(document, doc_type, &text).await
    }

    async fn attempt_barcode(
        &self,
        document: &UploadedDocument,
        doc_type: DocType,
    ) -> Option<DocumentRecord> {
        let payload = match self.scanner.decode_payload(document).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(file = %document.file_name, "no barcode region found");
                return None;
            }
            Err(error) => {
                warn!(file = %document.file_name, %error, "barcode stage failed");
                return None;
            }
        };

        match parse_structured_payload(doc_type, &payload) {
            Ok(fields) => Some(DocumentRecord::new(
                doc_type,
                FieldSource::Barcode,
                document,
                fields,
            )),
            Err(error) => {
                warn!(file = %document.file_name, %error, "structured payload rejected");
                None
            }
        }
    }

    async fn attempt_text(&self, document: &UploadedDocument) -> String {
        let embedded = match extract_embedded_pages(document) {
            Ok(pages) => pages,
            Err(error) => {
                warn!(file = %document.file_name, %error, "embedded text extraction failed");
                Vec::new()
            }
        };

        if !embedded.is_empty() {
            return join_pages(&embedded);
        }

        match self.ocr.recognize(document).await {
            Ok(pages) => join_pages(&pages),
            Err(error) => {
                warn!(file = %document.file_name, %error, "ocr stage failed");
                String::new()
            }
        }
    }

    async fn attempt_model(
        &self,
        document: &UploadedDocument,
        doc_type: DocType,
        text: &str,
    ) -> ExtractOutcome {
        let prompt = schema_prompt(doc_type, text);
        let raw_output = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(file = %document.file_name, %error, "model stage failed");
                return ExtractOutcome::Empty {
                    reason: format!("model stage failed for {}", document.file_name),
                };
            }
        };

        match parse_model_fields(doc_type, &raw_output) {
            Ok(fields) => ExtractOutcome::Parsed(DocumentRecord::new(
                doc_type,
                FieldSource::Model,
                document,
                fields,
            )),
            Err(failure) => ExtractOutcome::Unparsed {
                raw_output,
                details: failure.details,
            },
        }
    }

    /// Runs the chain over every supported file under a folder. Files that
    /// cannot be read are reported, not fatal.
    pub async fn extract_folder(
        &self,
        folder: &Path,
        doc_type: DocType,
    ) -> Result<IntakeReport, ExtractError> {
        let files = discover_document_files(folder);
        if files.is_empty() {
            return Err(ExtractError::InvalidArgument(format!(
                "no document files found in {}",
                folder.display()
            )));
        }

        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();

        for path in files {
            let file_name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    skipped.push(SkippedFile {
                        path,
                        reason: "path has no file name".to_string(),
                    });
                    continue;
                }
            };

            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let document = UploadedDocument::new(file_name, bytes);
                    let outcome = self.extract(&document, doc_type).await;
                    outcomes.push(FileOutcome { path, outcome });
                }
                Err(error) => skipped.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(IntakeReport { outcomes, skipped })
    }
}

pub struct FileOutcome {
    pub path: PathBuf,
    pub outcome: ExtractOutcome,
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IntakeReport {
    pub outcomes: Vec<FileOutcome>,
    pub skipped: Vec<SkippedFile>,
}

pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                INTAKE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageText;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeScanner {
        payload: Option<String>,
        fail: bool,
    }

    #[async_trait]
    impl BarcodeScanner for FakeScanner {
        async fn decode_payload(
            &self,
            _document: &UploadedDocument,
        ) -> Result<Option<String>, ExtractError> {
            if self.fail {
                return Err(ExtractError::BarcodeDecode("service down".to_string()));
            }
            Ok(self.payload.clone())
        }
    }

    #[derive(Default)]
    struct FakeOcr {
        text: Option<String>,
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        async fn recognize(
            &self,
            _document: &UploadedDocument,
        ) -> Result<Vec<PageText>, ExtractError> {
            match &self.text {
                Some(text) => Ok(vec![PageText {
                    number: 1,
                    text: text.clone(),
                }]),
                None => Err(ExtractError::OcrFailed("nothing readable".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct FakeModel {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, _prompt: &str) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ExtractError::ModelCall("offline".to_string())),
            }
        }
    }

    fn image_doc() -> UploadedDocument {
        UploadedDocument::new("card.jpg", vec![0xff, 0xd8, 0xff, 0xe0])
    }

    #[tokio::test]
    async fn decodable_barcode_short_circuits_the_model() {
        let scanner = FakeScanner {
            payload: Some(r#"<Data uid="1234" name="Asha" gender="F" dob="01/01/1990"/>"#.to_string()),
            fail: false,
        };
        let model = FakeModel {
            reply: Some("{\"Name\": \"ignored\"}".to_string()),
            calls: AtomicUsize::new(0),
        };
        let pipeline = DocumentPipeline::new(scanner, FakeOcr::default(), model);

        let outcome = pipeline.extract(&image_doc(), DocType::Aadhaar).await;
        let record = outcome.record().expect("structured record");
        assert_eq!(record.source, FieldSource::Barcode);
        assert_eq!(record.field("Aadhaar Number"), Some("1234"));
        assert_eq!(pipeline.model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_payload_falls_through_to_the_model() {
        let scanner = FakeScanner {
            payload: Some("not xml at all".to_string()),
            fail: false,
        };
        let ocr = FakeOcr {
            text: Some("Name: Ravi Kumar  PAN: ABCDE1234F".to_string()),
        };
        let model = FakeModel {
            reply: Some("{\"Name\": \"Ravi Kumar\", \"PAN Number\": \"ABCDE1234F\"}".to_string()),
            calls: AtomicUsize::new(0),
        };
        let pipeline = DocumentPipeline::new(scanner, ocr, model);

        let outcome = pipeline.extract(&image_doc(), DocType::Pan).await;
        let record = outcome.record().expect("model record");
        assert_eq!(record.source, FieldSource::Model);
        assert_eq!(record.field("Name"), Some("Ravi Kumar"));
    }

    #[tokio::test]
    async fn scanner_failure_is_downgraded_not_fatal() {
        let scanner = FakeScanner {
            payload: None,
            fail: true,
        };
        let ocr = FakeOcr {
            text: Some("passport text".to_string()),
        };
        let model = FakeModel {
            reply: Some("{\"Passport Number\": \"N1234567\"}".to_string()),
            calls: AtomicUsize::new(0),
        };
        let pipeline = DocumentPipeline::new(scanner, ocr, model);

        let outcome = pipeline.extract(&image_doc(), DocType::Passport).await;
        assert!(outcome.record().is_some());
    }

    #[tokio::test]
    async fn no_text_anywhere_yields_empty_outcome() {
        let pipeline =
            DocumentPipeline::new(FakeScanner::default(), FakeOcr::default(), FakeModel::default());

        let outcome = pipeline.extract(&image_doc(), DocType::Aadhaar).await;
        assert!(matches!(outcome, ExtractOutcome::Empty { .. }));
        assert_eq!(pipeline.model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_transport_failure_downgrades_to_empty() {
        let ocr = FakeOcr {
            text: Some("some card text".to_string()),
        };
        let pipeline = DocumentPipeline::new(FakeScanner::default(), ocr, FakeModel::default());

        let outcome = pipeline.extract(&image_doc(), DocType::Pan).await;
        assert!(matches!(outcome, ExtractOutcome::Empty { .. }));
        assert_eq!(pipeline.model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unparseable_model_output_keeps_the_raw_text() {
        let ocr = FakeOcr {
            text: Some("some card text".to_string()),
        };
        let model = FakeModel {
            reply: Some("I am sorry, I cannot help with that.".to_string()),
            calls: AtomicUsize::new(0),
        };
        let pipeline = DocumentPipeline::new(FakeScanner::default(), ocr, model);

        let outcome = pipeline.extract(&image_doc(), DocType::Pan).await;
        match outcome {
            ExtractOutcome::Unparsed { raw_output, .. } => {
                assert!(raw_output.contains("cannot help"));
            }
            other => panic!("expected Unparsed, got {other:?}"),
        }
    }

    #[test]
    fn discovery_is_recursive_and_filters_extensions() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("mkdir");

        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").expect("write");
        fs::write(nested.join("b.JPG"), b"\xff\xd8").expect("write");
        fs::write(nested.join("notes.txt"), b"skip me").expect("write");

        let files = discover_document_files(dir.path());
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn folder_extraction_requires_at_least_one_file() {
        let dir = tempdir().expect("tempdir");
        let pipeline =
            DocumentPipeline::new(FakeScanner::default(), FakeOcr::default(), FakeModel::default());

        let result = pipeline.extract_folder(dir.path(), DocType::Aadhaar).await;
        assert!(matches!(result, Err(ExtractError::InvalidArgument(_))));
    }
}
