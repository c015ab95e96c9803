//! Hosted chat-model seam plus the schema prompt and the lenient parse of
//! whatever the model sends back.

use crate::error::ExtractError;
use crate::models::DocType;
use crate::schema::canonical_fields;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait ChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractError>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct HttpChatModel {
    client: Arc<Client>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpChatModel {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ExtractError::ModelCall(format!(
                "chat request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string());

        content.filter(|text| !text.is_empty()).ok_or_else(|| {
            ExtractError::ModelCall("chat response carried no message content".to_string())
        })
    }
}

/// Strict-JSON prompt naming the exact fields required for the doc type.
pub fn schema_prompt(doc_type: DocType, raw_text: &str) -> String {
    let mut schema = Map::new();
    for field in canonical_fields(doc_type) {
        schema.insert((*field).to_string(), Value::String("string or null".to_string()));
    }
    let schema = serde_json::to_string_pretty(&Value::Object(schema))
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a strict JSON generator for document parsing.\n\n\
         Task:\n\
         Extract information from the provided {doc_type} text and return ONLY a valid JSON object.\n\n\
         Required fields:\n{schema}\n\n\
         Text:\n{raw_text}\n\n\
         Rules:\n\
         1. Return only valid JSON (no extra text, no markdown, no explanations).\n\
         2. JSON must start with {{ and end with }}.\n\
         3. If a field is missing, set its value to null.\n\
         4. Do not include any fields outside the required list."
    )
}

/// Removes markdown code-fence wrappers (```json ... ```) the model tends
/// to add despite the rules.
pub fn strip_code_fences(raw: &str) -> Result<String, ExtractError> {
    let fence_re = Regex::new(r"(?i)```(?:json)?")?;
    Ok(fence_re.replace_all(raw, "").trim().to_string())
}

/// What went wrong while turning model output into fields.
#[derive(Debug, Clone)]
pub struct ModelParseFailure {
    pub details: String,
}

/// Parses model output into the declared schema keys, verbatim. The parse
/// is lenient (json5) because the model does not reliably emit strict JSON:
/// trailing commas and unquoted keys are tolerated. Null, missing, and
/// blank values all map to `None`.
pub fn parse_model_fields(
    doc_type: DocType,
    raw_output: &str,
) -> Result<BTreeMap<String, Option<String>>, ModelParseFailure> {
    let cleaned = strip_code_fences(raw_output).map_err(|error| ModelParseFailure {
        details: error.to_string(),
    })?;

    let value: Value = json5::from_str(&cleaned).map_err(|error| ModelParseFailure {
        details: error.to_string(),
    })?;

    let object = value.as_object().ok_or_else(|| ModelParseFailure {
        details: "model output is not a JSON object".to_string(),
    })?;

    let mut fields = BTreeMap::new();
    for field in canonical_fields(doc_type) {
        let extracted = object
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        fields.insert((*field).to_string(), extracted);
    }

    Ok(fields)
}
