use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

pub const ATTENDANCE_COLLECTION: &str = "studentattendance";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PunchType {
    In,
    Out,
}

/// Where the student stood when punching. Never mutated after capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoSnapshot {
    #[schema(example = 19.4189)]
    pub lat: f64,
    #[schema(example = 72.8182)]
    pub lng: f64,
    /// Reported accuracy radius in meters
    #[serde(rename = "acc", default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 12.5)]
    pub accuracy: Option<f64>,
    /// Distance from the branch center in whole meters
    #[serde(rename = "distM", default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 40)]
    pub dist_m: Option<f64>,
}

/// Canonical view of one student's day, whatever shape it was stored in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub has_in: bool,
    pub has_out: bool,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub in_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub out_at: Option<DateTime<Utc>>,
    pub in_at_ms: Option<i64>,
    pub out_at_ms: Option<i64>,
    pub duration_min: Option<i64>,
    pub in_photo: Option<String>,
    pub out_photo: Option<String>,
    pub in_loc: Option<GeoSnapshot>,
    pub out_loc: Option<GeoSnapshot>,
}

impl DayEntry {
    /// Best known punch-in instant in millis: client shadow first, then the
    /// server timestamp
    pub fn in_millis(&self) -> Option<i64> {
        self.in_at_ms.or_else(|| self.in_at.map(|t| t.timestamp_millis()))
    }

    pub fn out_millis(&self) -> Option<i64> {
        self.out_at_ms.or_else(|| self.out_at.map(|t| t.timestamp_millis()))
    }
}

/// Today's status as seen by the punch guards and the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    #[schema(example = "2025-10-28")]
    pub date_key: String,
    pub has_in: bool,
    pub has_out: bool,
    pub duration_min: Option<i64>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub in_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub out_at: Option<DateTime<Utc>>,
}

impl DayStatus {
    pub fn from_entry(date_key: &str, entry: Option<&DayEntry>) -> Self {
        match entry {
            Some(d) => Self {
                date_key: date_key.to_string(),
                has_in: d.has_in,
                has_out: d.has_out,
                duration_min: d.duration_min,
                in_at: d.in_at,
                out_at: d.out_at,
            },
            None => Self {
                date_key: date_key.to_string(),
                has_in: false,
                has_out: false,
                duration_min: None,
                in_at: None,
                out_at: None,
            },
        }
    }
}

/// One entry of the append-only `logs` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchLog {
    pub date_key: String,
    #[serde(rename = "type")]
    pub punch_type: PunchType,
    /// RFC 3339 instant the event was recorded
    pub at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<GeoSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub last_action: Option<PunchType>,
    pub last_action_at: Option<String>,
    #[serde(default)]
    pub total_days: i64,
}
