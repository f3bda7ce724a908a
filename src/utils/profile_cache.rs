use moka::future::Cache;

use crate::model::student::StudentProfile;

/// Student profiles keyed by numeric identifier.
///
/// Entries live for the login session: no TTL, dropped on logout. One cache
/// per application instance, handed to whoever needs it.
#[derive(Clone)]
pub struct ProfileCache {
    inner: Cache<String, StudentProfile>,
}

impl ProfileCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub async fn get(&self, number: &str) -> Option<StudentProfile> {
        self.inner.get(number).await
    }

    pub async fn insert(&self, number: &str, profile: StudentProfile) {
        self.inner.insert(number.to_string(), profile).await;
    }

    /// Forget one student (logout)
    pub async fn invalidate(&self, number: &str) {
        self.inner.invalidate(number).await;
    }
}
