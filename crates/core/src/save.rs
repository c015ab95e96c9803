//! Builds the database save payload from accumulated document records and
//! runs the duplicate-identity check before insertion.

use crate::error::SaveError;
use crate::models::DocumentRecord;
use crate::schema::{IDENTITY_COLUMNS, SAVE_COLUMNS};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Database column name to value; only columns with a non-empty value
/// appear.
pub type SavePayload = BTreeMap<&'static str, String>;

/// Resolves each database column from the accumulated records.
///
/// Records are scanned in doc-type priority order (aadhaar, then pan, then
/// passport; stable within a type), and within a record the column's alias
/// list is checked in order. The first non-empty value wins; whitespace-only
/// values never do.
pub fn build_save_payload(records: &[DocumentRecord]) -> SavePayload {
    let mut ordered: Vec<&DocumentRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.doc_type.priority());

    let mut payload = SavePayload::new();

    for spec in SAVE_COLUMNS {
        'column: for record in &ordered {
            for alias in spec.aliases {
                if let Some(value) = record.field(alias) {
                    payload.insert(spec.column, value.to_string());
                    break 'column;
                }
            }
        }
    }

    payload
}

#[async_trait]
pub trait IdentityStore {
    /// Whether a saved record already carries `value` in `column`.
    async fn identity_exists(&self, column: &str, value: &str) -> Result<bool, SaveError>;

    /// Inserts the payload and returns the assigned employee id.
    async fn insert_record(&self, payload: &SavePayload) -> Result<u64, SaveError>;
}

/// Rejects the save when any identity number already exists, then inserts.
/// Each identity column rejects with its own message.
pub async fn save_payload<S>(store: &S, payload: &SavePayload) -> Result<u64, SaveError>
where
    S: IdentityStore + Send + Sync,
{
    if payload.is_empty() {
        return Err(SaveError::Rejected(
            "payload has no non-empty fields".to_string(),
        ));
    }

    for &column in IDENTITY_COLUMNS {
        if let Some(value) = payload.get(column) {
            if store.identity_exists(column, value).await? {
                return Err(SaveError::DuplicateIdentity { column });
            }
        }
    }

    store.insert_record(payload).await
}
