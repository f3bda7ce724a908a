use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const LECTURES_COLLECTION: &str = "lectures";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LectureSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    #[schema(example = "Data Structures")]
    pub subject: String,
    #[serde(default)]
    #[schema(example = "Prof. Kulkarni")]
    pub faculty: String,
    #[serde(default)]
    #[schema(example = "10:00")]
    pub start: String,
    #[serde(default)]
    #[schema(example = "11:30")]
    pub end: String,
    #[serde(default)]
    #[schema(example = "Offline")]
    pub mode: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    #[schema(example = "2025-10-28")]
    pub date: String,
}
