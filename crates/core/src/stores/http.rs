use crate::error::SaveError;
use crate::save::{IdentityStore, SavePayload};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// REST-backed employee record store.
///
/// Expects `GET {base}/employees?column=..&value=..` answering
/// `{"exists": bool}` and `POST {base}/employees` answering
/// `{"employee_id": n}`.
pub struct HttpEmployeeStore {
    client: Arc<Client>,
    base: Url,
}

impl HttpEmployeeStore {
    pub fn new(endpoint: &str) -> Result<Self, SaveError> {
        let mut base = Url::parse(endpoint)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self {
            client: Arc::new(Client::new()),
            base,
        })
    }

    fn employees_url(&self) -> Result<Url, SaveError> {
        Ok(self.base.join("employees")?)
    }
}

#[async_trait]
impl IdentityStore for HttpEmployeeStore {
    async fn identity_exists(&self, column: &str, value: &str) -> Result<bool, SaveError> {
        let response = self
            .client
            .get(self.employees_url()?)
            .query(&[("column", column), ("value", value)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SaveError::BackendResponse {
                backend: "employee-store".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        Ok(body
            .pointer("/exists")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn insert_record(&self, payload: &SavePayload) -> Result<u64, SaveError> {
        let body = Value::Object(
            payload
                .iter()
                .map(|(column, value)| ((*column).to_string(), Value::String(value.clone())))
                .collect::<serde_json::Map<String, Value>>(),
        );

        let response = self
            .client
            .post(self.employees_url()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SaveError::BackendResponse {
                backend: "employee-store".to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        body.pointer("/employee_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| SaveError::BackendResponse {
                backend: "employee-store".to_string(),
                details: "response carried no employee_id".to_string(),
            })
    }
}
