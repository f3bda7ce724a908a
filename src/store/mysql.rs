use super::{Body, Document, DocumentStore, Expect, Filter, MergePatch, StoreError};
use crate::utils::clock::Clock;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::MySqlPool;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::debug;

/// All collections share one table: `(collection, id)` primary key, a JSON
/// body and a version counter bumped on every write.
pub struct MySqlDocumentStore {
    pool: MySqlPool,
    clock: Arc<dyn Clock>,
}

impl MySqlDocumentStore {
    pub fn new(pool: MySqlPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection VARCHAR(64) NOT NULL,
                id VARCHAR(191) NOT NULL,
                body JSON NOT NULL,
                version BIGINT UNSIGNED NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn into_body(collection: &str, id: &str, value: Value) -> Result<Body, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: format!("expected object, found {}", other),
        }),
    }
}

/// `$."field"` so field names with dots or dashes stay one key
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

#[async_trait]
impl DocumentStore for MySqlDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (Json<Value>, u64)>(
            r#"
            SELECT body, version
            FROM documents
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(Json(body), version)| {
            Ok(Document {
                id: id.to_string(),
                version,
                body: into_body(collection, id, body)?,
            })
        })
        .transpose()
    }

    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT id, body, version FROM documents WHERE collection = ?");
        for _ in filters {
            sql.push_str(" AND JSON_EXTRACT(body, ?) = CAST(? AS JSON)");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query_as::<_, (String, Json<Value>, u64)>(&sql).bind(collection);
        for filter in filters {
            query = query
                .bind(json_path(&filter.field))
                .bind(filter.value.to_string());
        }

        let mut rows = query.fetch(&self.pool);
        let mut docs = Vec::new();
        while let Some((id, Json(body), version)) = rows.try_next().await? {
            let body = into_body(collection, &id, body)?;
            docs.push(Document { id, version, body });
        }

        debug!(collection, matched = docs.len(), "find");
        Ok(docs)
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &MergePatch,
        expect: Expect,
    ) -> Result<u64, StoreError> {
        let conflict = || StoreError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let mut tx = self.pool.begin().await?;

        // Row lock holds the read-modify-write together
        let current = sqlx::query_as::<_, (Json<Value>, u64)>(
            r#"
            SELECT body, version
            FROM documents
            WHERE collection = ? AND id = ?
            FOR UPDATE
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if !expect.admits(current.as_ref().map(|(_, v)| *v)) {
            return Err(conflict());
        }

        let new_version = match current {
            Some((Json(body), version)) => {
                let mut body = into_body(collection, id, body)?;
                patch.apply(&mut body, self.clock.now());

                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = ?, version = ?
                    WHERE collection = ? AND id = ? AND version = ?
                    "#,
                )
                .bind(Json(Value::Object(body)))
                .bind(version + 1)
                .bind(collection)
                .bind(id)
                .bind(version)
                .execute(&mut *tx)
                .await?;
                version + 1
            }
            None => {
                let mut body = Body::new();
                patch.apply(&mut body, self.clock.now());

                let inserted = sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, body, version)
                    VALUES (?, ?, ?, 1)
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(Json(Value::Object(body)))
                .execute(&mut *tx)
                .await;

                if let Err(e) = inserted {
                    // Lost a race to create the same document
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.code().as_deref() == Some("23000") {
                            return Err(conflict());
                        }
                    }
                    return Err(e.into());
                }
                1
            }
        };

        tx.commit().await?;
        Ok(new_version)
    }
}
