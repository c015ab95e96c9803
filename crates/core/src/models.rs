use crate::error::ExtractError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared type of an uploaded identity document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Aadhaar,
    Pan,
    Passport,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Aadhaar => "aadhaar",
            DocType::Pan => "pan",
            DocType::Passport => "passport",
        }
    }

    /// Rank used when the same logical field could come from several
    /// uploaded documents: aadhaar beats pan beats passport.
    pub fn priority(&self) -> u8 {
        match self {
            DocType::Aadhaar => 0,
            DocType::Pan => 1,
            DocType::Passport => 2,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = ExtractError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "aadhaar" => Ok(DocType::Aadhaar),
            "pan" => Ok(DocType::Pan),
            "passport" => Ok(DocType::Passport),
            other => Err(ExtractError::UnsupportedDocType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Image,
}

/// Raw bytes of an uploaded document plus enough metadata to route it.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let format = sniff_format(&file_name, &bytes);
        Self {
            file_name,
            format,
            bytes,
        }
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

fn sniff_format(file_name: &str, bytes: &[u8]) -> DocumentFormat {
    let by_extension = file_name
        .rsplit('.')
        .next()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if by_extension || bytes.starts_with(b"%PDF") {
        DocumentFormat::Pdf
    } else {
        DocumentFormat::Image
    }
}

/// Which extraction stage produced a record's fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Barcode,
    Model,
}

/// Reconciled fields for one uploaded document. Keys are the canonical
/// schema names for the document type, values are extracted-or-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub record_id: Uuid,
    pub doc_type: DocType,
    pub source: FieldSource,
    pub file_name: String,
    pub checksum: String,
    pub extracted_at: DateTime<Utc>,
    pub fields: BTreeMap<String, Option<String>>,
}

impl DocumentRecord {
    pub fn new(
        doc_type: DocType,
        source: FieldSource,
        document: &UploadedDocument,
        fields: BTreeMap<String, Option<String>>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            doc_type,
            source,
            file_name: document.file_name.clone(),
            checksum: document.checksum(),
            extracted_at: Utc::now(),
            fields,
        }
    }

    /// Non-empty value for a field key, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|value| value.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// One multiple-choice question parsed out of model-generated quiz text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    /// Exactly four options keyed "1" through "4".
    pub options: BTreeMap<String, String>,
    /// Option key of the correct answer.
    pub answer: String,
    pub explanation: String,
}
