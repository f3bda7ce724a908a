use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub const RESULTS_COLLECTION: &str = "results";

/// Stored result sheet. Field casing follows the imported spreadsheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSheet {
    #[serde(default)]
    pub marks: Map<String, Value>,
    #[serde(rename = "ExamType", default)]
    pub exam_type: Option<String>,
    #[serde(rename = "Marks", default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    #[schema(example = "Computer Networks")]
    pub subject: String,
    /// Number, text grade, or null when not yet entered
    #[schema(value_type = Object)]
    pub mark: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub exam_type: Option<String>,
    pub total_marks: Option<f64>,
    pub subjects: Vec<SubjectMark>,
}
