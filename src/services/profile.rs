use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::student::{STUDENTS_COLLECTION, StudentProfile};
use crate::store::{DocumentStore, Filter, StoreError};
use crate::utils::identity::email_to_number;
use crate::utils::profile_cache::ProfileCache;

/// Resolves a login identity to the student record behind it
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    cache: ProfileCache,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Cached lookup. `Ok(None)` when the email carries no digits or no
    /// student has that number.
    pub async fn load_by_email(&self, email: &str) -> Result<Option<StudentProfile>, StoreError> {
        let digits = email_to_number(email);
        if digits.is_empty() {
            return Ok(None);
        }
        self.load_by_number(&digits).await
    }

    pub async fn load_by_number(&self, digits: &str) -> Result<Option<StudentProfile>, StoreError> {
        if let Some(profile) = self.cache.get(digits).await {
            debug!(number = digits, "profile cache hit");
            return Ok(Some(profile));
        }

        let docs = self
            .store
            .find(STUDENTS_COLLECTION, &[Filter::eq("number", digits)])
            .await?;
        let Some(doc) = docs.into_iter().next() else {
            return Ok(None);
        };

        let mut profile: StudentProfile = match serde_json::from_value(doc.body.into()) {
            Ok(p) => p,
            Err(e) => {
                warn!(number = digits, id = %doc.id, error = %e, "unreadable student record");
                return Ok(None);
            }
        };
        if profile.number.as_deref().is_none_or(str::is_empty) {
            profile.number = Some(digits.to_string());
        }

        self.cache.insert(digits, profile.clone()).await;
        Ok(Some(profile))
    }

    pub async fn forget(&self, digits: &str) {
        self.cache.invalidate(digits).await;
    }
}
