use crate::model::result::{RESULTS_COLLECTION, ResultResponse, ResultSheet, SubjectMark};
use crate::store::{DocumentStore, StoreError};

/// `"ComputerNetworks"` → `"Computer Networks"`
pub fn format_subject_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() && !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        out.push(c);
    }
    out.trim().to_string()
}

/// `Ok(None)` when no sheet has been published for this student yet
pub async fn result_for(store: &dyn DocumentStore, number: &str) -> Result<Option<ResultResponse>, StoreError> {
    let Some(doc) = store.get(RESULTS_COLLECTION, number.trim()).await? else {
        return Ok(None);
    };

    let sheet: ResultSheet = serde_json::from_value(doc.body.into()).map_err(|e| StoreError::Malformed {
        collection: RESULTS_COLLECTION.to_string(),
        id: number.to_string(),
        reason: e.to_string(),
    })?;

    Ok(Some(ResultResponse {
        exam_type: sheet.exam_type,
        total_marks: sheet.total,
        subjects: sheet
            .marks
            .into_iter()
            .map(|(subject, mark)| SubjectMark {
                subject: format_subject_name(&subject),
                mark,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn splits_camel_case() {
        assert_eq!(format_subject_name("ComputerNetworks"), "Computer Networks");
        assert_eq!(format_subject_name("maths"), "maths");
        assert_eq!(format_subject_name("DBMS"), "D B M S");
        assert_eq!(format_subject_name(""), "");
    }

    #[tokio::test]
    async fn reads_sheet() {
        let store = MemoryDocumentStore::new();
        store
            .insert(
                RESULTS_COLLECTION,
                "9820012345",
                json!({"marks": {"ComputerNetworks": 78, "Practical": "A", "Viva": null}, "ExamType": "Mid Term", "Marks": 412})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .unwrap();

        let r = result_for(&store, "9820012345").await.unwrap().unwrap();
        assert_eq!(r.exam_type.as_deref(), Some("Mid Term"));
        assert_eq!(r.total_marks, Some(412.0));
        assert_eq!(r.subjects[0].subject, "Computer Networks");
        assert_eq!(r.subjects[0].mark, json!(78));
        assert_eq!(r.subjects[2].mark, serde_json::Value::Null);

        assert!(result_for(&store, "000").await.unwrap().is_none());
    }
}
