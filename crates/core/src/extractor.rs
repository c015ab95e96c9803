//! Free-text extraction from uploaded documents.
//!
//! Text PDFs are read directly via their embedded text layer. Scanned PDFs
//! and images go to an external OCR endpoint, which rasterizes multi-page
//! PDFs per page and returns one text block per page.

use crate::error::ExtractError;
use crate::models::{DocumentFormat, UploadedDocument};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads the embedded text layer of a PDF, page by page. Images have no
/// embedded text and yield an empty list so the caller falls through to OCR.
pub fn extract_embedded_pages(
    document: &UploadedDocument,
) -> Result<Vec<PageText>, ExtractError> {
    if document.format != DocumentFormat::Pdf {
        return Ok(Vec::new());
    }

    let pdf = Document::load_mem(&document.bytes)
        .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in pdf.get_pages() {
        let text = pdf
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(PageText {
                number: page_no,
                text,
            });
        }
    }

    Ok(pages)
}

#[async_trait]
pub trait OcrEngine {
    async fn recognize(&self, document: &UploadedDocument)
        -> Result<Vec<PageText>, ExtractError>;
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    file_base64: String,
    file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    pages: Option<Vec<OcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
}

pub struct HttpOcrEngine {
    client: Arc<Client>,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpOcrEngine {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    async fn recognize(
        &self,
        document: &UploadedDocument,
    ) -> Result<Vec<PageText>, ExtractError> {
        let request = OcrRequest {
            file_base64: STANDARD.encode(&document.bytes),
            file_name: document.file_name.clone(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ExtractError::OcrFailed(format!(
                "ocr request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: OcrResponse = response.json().await?;
        let pages = payload_to_pages(&payload, &document.file_name)?;

        if pages.is_empty() {
            return Err(ExtractError::OcrFailed(format!(
                "ocr response has no readable text: {}",
                document.file_name
            )));
        }

        Ok(pages)
    }
}

fn payload_to_pages(payload: &OcrResponse, file_name: &str) -> Result<Vec<PageText>, ExtractError> {
    if let Some(listed) = &payload.pages {
        let listed = listed
            .iter()
            .filter_map(|page| {
                let text = page.text.as_ref().map(|value| value.trim().to_string());
                text.and_then(|normalized| {
                    if normalized.is_empty() {
                        None
                    } else {
                        Some(PageText {
                            number: page.page.unwrap_or(1),
                            text: normalized,
                        })
                    }
                })
            })
            .collect::<Vec<_>>();

        if !listed.is_empty() {
            return Ok(listed);
        }
    }

    if let Some(raw_text) = &payload.text {
        let pages = raw_text
            .split('\u{000c}')
            .enumerate()
            .filter_map(|(index, chunk)| {
                let normalized = chunk.trim().to_string();
                if normalized.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: (index + 1) as u32,
                        text: normalized,
                    })
                }
            })
            .collect::<Vec<_>>();

        if !pages.is_empty() {
            return Ok(pages);
        }
    }

    Err(ExtractError::OcrFailed(format!(
        "ocr response was empty for {file_name}"
    )))
}

#[cfg(test)]
mod tests {
    use super::{extract_embedded_pages, join_pages, payload_to_pages, OcrPage, OcrResponse, PageText};
    use crate::models::UploadedDocument;

    #[test]
    fn ocr_pages_keep_only_nonempty_text() {
        let response = OcrResponse {
            pages: Some(vec![
                OcrPage {
                    page: Some(2),
                    text: Some("  ".to_string()),
                },
                OcrPage {
                    page: Some(3),
                    text: Some("Page 3".to_string()),
                },
            ]),
            text: None,
        };

        let pages = payload_to_pages(&response, "x.pdf").expect("response should parse");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 3);
        assert_eq!(pages[0].text, "Page 3");
    }

    #[test]
    fn ocr_fallback_text_splits_on_form_feed() {
        let response = OcrResponse {
            pages: None,
            text: Some("First\u{000C}Second\n".to_string()),
        };

        let pages = payload_to_pages(&response, "x.pdf").expect("response should parse");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].text, "First");
        assert_eq!(pages[1].number, 2);
    }

    #[test]
    fn empty_ocr_response_is_an_error() {
        let response = OcrResponse {
            pages: None,
            text: None,
        };
        assert!(payload_to_pages(&response, "x.pdf").is_err());
    }

    #[test]
    fn images_have_no_embedded_text() {
        let image = UploadedDocument::new("card.png", vec![0x89, 0x50, 0x4e, 0x47]);
        let pages = extract_embedded_pages(&image).expect("images short-circuit");
        assert!(pages.is_empty());
    }

    #[test]
    fn broken_pdf_is_a_parse_error() {
        let pdf = UploadedDocument::new("broken.pdf", b"%PDF-1.4\n%broken".to_vec());
        assert!(extract_embedded_pages(&pdf).is_err());
    }

    #[test]
    fn joined_pages_skip_blank_text() {
        let pages = vec![
            PageText {
                number: 1,
                text: "first".to_string(),
            },
            PageText {
                number: 2,
                text: "   ".to_string(),
            },
            PageText {
                number: 3,
                text: "third".to_string(),
            },
        ];
        assert_eq!(join_pages(&pages), "first\nthird");
    }
}
