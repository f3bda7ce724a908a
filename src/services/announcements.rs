use crate::model::announcement::{ANNOUNCEMENTS_COLLECTION, Announcement};
use crate::store::{DocumentStore, StoreError};

pub const ANNOUNCEMENT_LIMIT: usize = 25;

/// Newest first by `date`, capped at [`ANNOUNCEMENT_LIMIT`]
pub async fn latest(store: &dyn DocumentStore) -> Result<Vec<Announcement>, StoreError> {
    let docs = store.find(ANNOUNCEMENTS_COLLECTION, &[]).await?;

    let mut items: Vec<Announcement> = docs
        .into_iter()
        .filter_map(|doc| {
            let mut a: Announcement = serde_json::from_value(doc.body.into()).ok()?;
            a.id = doc.id;
            Some(a)
        })
        .collect();

    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.truncate(ANNOUNCEMENT_LIMIT);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn newest_first_and_capped() {
        let store = MemoryDocumentStore::new();
        for i in 0..30 {
            let body = json!({
                "title": format!("Notice {i}"),
                "message": "Campus closed",
                "date": format!("2025-09-{:02}", i % 28 + 1),
                "priority": "high"
            });
            store
                .insert(ANNOUNCEMENTS_COLLECTION, &format!("n{i:02}"), body.as_object().cloned().unwrap())
                .unwrap();
        }

        let items = latest(&store).await.unwrap();
        assert_eq!(items.len(), ANNOUNCEMENT_LIMIT);
        assert_eq!(items[0].date, "2025-09-28");
        assert!(items.windows(2).all(|w| w[0].date >= w[1].date));
        assert_eq!(items[0].extra.get("priority"), Some(&json!("high")));
        assert!(items[0].extra.get("id").is_none());
    }
}
