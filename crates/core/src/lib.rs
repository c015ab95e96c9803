pub mod barcode;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod quiz;
pub mod reconcile;
pub mod save;
pub mod scanner;
pub mod schema;
pub mod stores;

pub use barcode::parse_structured_payload;
pub use error::{ExtractError, SaveError};
pub use extractor::{
    extract_embedded_pages, join_pages, HttpOcrEngine, OcrEngine, PageText,
};
pub use llm::{
    parse_model_fields, schema_prompt, strip_code_fences, ChatModel, HttpChatModel,
    ModelParseFailure,
};
pub use models::{
    DocType, DocumentFormat, DocumentRecord, FieldSource, QuizQuestion, UploadedDocument,
};
pub use quiz::{
    grade, normalize_quiz_text, parse_quiz, parse_student_answers, quiz_prompt, BlockDefect,
    DroppedBlock, ParsedQuiz, QuestionResult, QuizOutcome, QuizReport, Verdict,
};
pub use reconcile::{
    discover_document_files, DocumentPipeline, ExtractOutcome, FileOutcome, IntakeReport,
    SkippedFile,
};
pub use save::{build_save_payload, save_payload, IdentityStore, SavePayload};
pub use scanner::{BarcodeScanner, HttpBarcodeScanner};
pub use schema::{canonical_fields, ColumnSpec, IDENTITY_COLUMNS, SAVE_COLUMNS};
pub use stores::{HttpEmployeeStore, InMemoryEmployeeStore};
