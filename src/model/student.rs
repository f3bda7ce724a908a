use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const STUDENTS_COLLECTION: &str = "students";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "number": "9820012345",
        "name": "Asha Patil",
        "branch": "Bhiwandi",
        "course": "BSc IT",
        "batch": "Morning",
        "year": "2025"
    })
)]
pub struct StudentProfile {
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "9820012345")]
    pub number: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "Asha Patil")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "Bhiwandi")]
    pub branch: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "BSc IT")]
    pub course: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "Morning")]
    pub batch: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "2025")]
    pub year: Option<String>,
}

impl StudentProfile {
    /// Branch, course, batch and year, when every one of them is filled in
    pub fn cohort(&self) -> Option<(&str, &str, &str, &str)> {
        fn filled(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        Some((
            filled(&self.branch)?,
            filled(&self.course)?,
            filled(&self.batch)?,
            filled(&self.year)?,
        ))
    }
}

/// Student sheets are imported by hand; numbers and years often arrive as
/// JSON numbers rather than strings.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
