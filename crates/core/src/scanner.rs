//! Seam for the external QR/barcode decoding service. The decoder itself
//! (region location, PDF rasterization) lives behind an HTTP endpoint; the
//! pipeline only consumes the decoded payload string.

use crate::error::ExtractError;
use crate::models::UploadedDocument;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[async_trait]
pub trait BarcodeScanner {
    /// Returns the first decodable payload in the document, or `None` when
    /// no QR/barcode region was found.
    async fn decode_payload(
        &self,
        document: &UploadedDocument,
    ) -> Result<Option<String>, ExtractError>;
}

#[derive(Debug, Clone, Serialize)]
struct DecodeRequest {
    file_base64: String,
    file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DecodeResponse {
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    payloads: Option<Vec<String>>,
}

impl DecodeResponse {
    fn first_payload(self) -> Option<String> {
        let single = self.payload.filter(|value| !value.trim().is_empty());
        single.or_else(|| {
            self.payloads
                .unwrap_or_default()
                .into_iter()
                .find(|value| !value.trim().is_empty())
        })
    }
}

pub struct HttpBarcodeScanner {
    client: Arc<Client>,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBarcodeScanner {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl BarcodeScanner for HttpBarcodeScanner {
    async fn decode_payload(
        &self,
        document: &UploadedDocument,
    ) -> Result<Option<String>, ExtractError> {
        let request = DecodeRequest {
            file_base64: STANDARD.encode(&document.bytes),
            file_name: document.file_name.clone(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ExtractError::BarcodeDecode(format!(
                "decode request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let decoded: DecodeResponse = response.json().await?;
        Ok(decoded.first_payload())
    }
}
