use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document type: {0}")]
    UnsupportedDocType(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("barcode decode failed: {0}")]
    BarcodeDecode(String),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("model call failed: {0}")]
    ModelCall(String),

    #[error("structured payload error: {0}")]
    Payload(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("duplicate {column} found: a saved record already carries this value")]
    DuplicateIdentity { column: &'static str },

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("save rejected: {0}")]
    Rejected(String),
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
