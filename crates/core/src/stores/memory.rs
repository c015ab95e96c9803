use crate::error::SaveError;
use crate::save::{IdentityStore, SavePayload};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process store for tests and offline runs. Ids start at 1.
#[derive(Default)]
pub struct InMemoryEmployeeStore {
    records: Mutex<Vec<SavePayload>>,
}

impl InMemoryEmployeeStore {
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for InMemoryEmployeeStore {
    async fn identity_exists(&self, column: &str, value: &str) -> Result<bool, SaveError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .any(|record| record.get(column).is_some_and(|existing| existing == value)))
    }

    async fn insert_record(&self, payload: &SavePayload) -> Result<u64, SaveError> {
        let mut records = self.records.lock().await;
        records.push(payload.clone());
        Ok(records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_matches_column_and_value_exactly() {
        let store = InMemoryEmployeeStore::default();
        let mut payload = SavePayload::new();
        payload.insert("pan_number", "ABCDE1234F".to_string());
        store.insert_record(&payload).await.expect("insert");

        assert!(store
            .identity_exists("pan_number", "ABCDE1234F")
            .await
            .expect("lookup"));
        assert!(!store
            .identity_exists("pan_number", "ZZZZZ9999Z")
            .await
            .expect("lookup"));
        assert!(!store
            .identity_exists("aadhaar_number", "ABCDE1234F")
            .await
            .expect("lookup"));
    }
}
