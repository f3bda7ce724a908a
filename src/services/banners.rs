use serde_json::Value;

use crate::model::banner::{BANNERS_COLLECTION, Banner, BannerDoc};
use crate::store::{DocumentStore, StoreError};

const DEFAULT_ORDER: f64 = 999.0;

fn is_active(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "TRUE",
        _ => false,
    }
}

fn order_of(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(DEFAULT_ORDER),
        Value::String(s) => s.trim().parse().unwrap_or(DEFAULT_ORDER),
        _ => DEFAULT_ORDER,
    }
}

/// Sheet exports sometimes wrap links as `<url href=...>https://...</url>`
pub fn clean_url(raw: &str) -> String {
    let mut out = raw.replace("</url>", "");
    while let Some(start) = out.find("<url") {
        match out[start..].find('>') {
            Some(end) => out.replace_range(start..start + end + 1, ""),
            None => break,
        }
    }
    out.trim().to_string()
}

/// Active banners, lowest `order` first
pub async fn active_banners(store: &dyn DocumentStore) -> Result<Vec<Banner>, StoreError> {
    let docs = store.find(BANNERS_COLLECTION, &[]).await?;

    let mut banners: Vec<Banner> = docs
        .into_iter()
        .filter_map(|doc| {
            let raw: BannerDoc = match serde_json::from_value(doc.body.into()) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "skipping malformed banner");
                    return None;
                }
            };
            if !is_active(&raw.is_active) {
                return None;
            }
            Some(Banner {
                id: doc.id,
                title: raw.title.unwrap_or_default(),
                image_url: clean_url(raw.image_url.as_deref().unwrap_or("")),
                link: clean_url(raw.link.as_deref().unwrap_or("")),
                order: order_of(&raw.order),
            })
        })
        .collect();

    banners.sort_by(|a, b| a.order.total_cmp(&b.order));
    Ok(banners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn strips_url_wrappers() {
        assert_eq!(
            clean_url("<url id=\"x\">https://abs.in/a.png</url>"),
            "https://abs.in/a.png"
        );
        assert_eq!(clean_url(" https://plain "), "https://plain");
        assert_eq!(clean_url("<url broken"), "<url broken");
    }

    #[tokio::test]
    async fn filters_and_orders() {
        let store = MemoryDocumentStore::new();
        let put = |id: &str, v: Value| {
            store
                .insert(BANNERS_COLLECTION, id, v.as_object().cloned().unwrap())
                .unwrap();
        };
        put("a", json!({"title": "Late", "isActive": true}));
        put("b", json!({"title": "First", "isActive": "TRUE", "order": "1", "imageUrl": "<url>https://x/1.png</url>"}));
        put("c", json!({"title": "Hidden", "isActive": false, "order": 0}));
        put("d", json!({"title": "Second", "isActive": true, "order": 2}));
        put("e", json!({"title": "Lowercase", "isActive": "true", "order": 0}));

        let banners = active_banners(&store).await.unwrap();
        let titles: Vec<_> = banners.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Late"]);
        assert_eq!(banners[0].image_url, "https://x/1.png");
        assert_eq!(banners[2].order, 999.0);
    }
}
