//! Reads attendance documents that store days either nested
//! (`{"days": {"2025-10-28": {...}}}`) or as dot-flattened top-level keys
//! (`{"days.2025-10-28.hasIn": true}`), producing one canonical view.
//! Nested values win over flattened ones for the same field.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::model::attendance::{AttendanceSummary, DayEntry, DayStatus, GeoSnapshot, PunchLog, PunchType};
use crate::store::Body;

/// Canonical days in the order their keys were first encountered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayMap {
    entries: Vec<(String, DayEntry)>,
}

impl DayMap {
    pub fn get(&self, date_key: &str) -> Option<&DayEntry> {
        self.entries
            .iter()
            .find(|(dk, _)| dk == date_key)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DayEntry)> {
        self.entries.iter().map(|(dk, d)| (dk.as_str(), d))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(dk, _)| dk.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for DayMap {
    type Item = (String, DayEntry);
    type IntoIter = std::vec::IntoIter<(String, DayEntry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Fields collected so far for one day. `None` means "not seen yet", which
/// lets the flattened pass fill gaps without overriding nested values.
#[derive(Debug, Default)]
struct PartialDay {
    has_in: Option<bool>,
    has_out: Option<bool>,
    in_at: Option<Option<DateTime<Utc>>>,
    out_at: Option<Option<DateTime<Utc>>>,
    in_at_ms: Option<i64>,
    out_at_ms: Option<i64>,
    duration_min: Option<i64>,
    in_photo: Option<String>,
    out_photo: Option<String>,
    in_loc: Option<GeoSnapshot>,
    out_loc: Option<GeoSnapshot>,
}

impl PartialDay {
    /// Route one known field; unknown names and null values are ignored.
    /// Value fields already set are kept; flags are ORed across shapes.
    fn absorb(&mut self, field: &str, value: &Value) {
        if value.is_null() {
            return;
        }
        match field {
            "hasIn" => raise(&mut self.has_in, truthy(value)),
            "hasOut" => raise(&mut self.has_out, truthy(value)),
            "inAt" => fill(&mut self.in_at, Some(parse_timestamp(value))),
            "outAt" => fill(&mut self.out_at, Some(parse_timestamp(value))),
            "inAtMs" => fill(&mut self.in_at_ms, as_integer(value)),
            "outAtMs" => fill(&mut self.out_at_ms, as_integer(value)),
            "durationMin" => fill(&mut self.duration_min, as_integer(value)),
            "inPhoto" => fill(&mut self.in_photo, value.as_str().map(str::to_string)),
            "outPhoto" => fill(&mut self.out_photo, value.as_str().map(str::to_string)),
            "inLoc" => fill(&mut self.in_loc, serde_json::from_value(value.clone()).ok()),
            "outLoc" => fill(&mut self.out_loc, serde_json::from_value(value.clone()).ok()),
            _ => {}
        }
    }

    /// Flags are implied by the presence of the matching timestamp
    fn finish(self) -> DayEntry {
        DayEntry {
            has_in: self.has_in.unwrap_or(false) || self.in_at.is_some(),
            has_out: self.has_out.unwrap_or(false) || self.out_at.is_some(),
            in_at: self.in_at.flatten(),
            out_at: self.out_at.flatten(),
            in_at_ms: self.in_at_ms,
            out_at_ms: self.out_at_ms,
            duration_min: self.duration_min,
            in_photo: self.in_photo,
            out_photo: self.out_photo,
            in_loc: self.in_loc,
            out_loc: self.out_loc,
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn raise(flag: &mut Option<bool>, value: bool) {
    *flag = Some(flag.unwrap_or(false) || value);
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

/// Accepts RFC 3339 strings, epoch millis, and exported timestamp objects
/// (`{"seconds": .., "nanoseconds": ..}`, also with leading underscores).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(_) => as_integer(value).and_then(DateTime::from_timestamp_millis),
        Value::Object(obj) => {
            let seconds = obj.get("seconds").or_else(|| obj.get("_seconds"))?.as_i64()?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

/// Build the canonical date-key → [`DayEntry`] map from a raw record
pub fn normalize_days(body: &Body) -> DayMap {
    let mut partials: Vec<(String, PartialDay)> = Vec::new();

    fn slot<'a>(partials: &'a mut Vec<(String, PartialDay)>, dk: &str) -> &'a mut PartialDay {
        let idx = match partials.iter().position(|(k, _)| k == dk) {
            Some(i) => i,
            None => {
                partials.push((dk.to_string(), PartialDay::default()));
                partials.len() - 1
            }
        };
        &mut partials[idx].1
    }

    // nested first so it takes precedence
    if let Some(Value::Object(days)) = body.get("days") {
        for (dk, day) in days {
            let partial = slot(&mut partials, dk);
            if let Value::Object(fields) = day {
                for (field, value) in fields {
                    partial.absorb(field, value);
                }
            }
        }
    }

    for (key, value) in body {
        let Some(rest) = key.strip_prefix("days.") else {
            continue;
        };
        let Some((dk, field)) = rest.split_once('.') else {
            continue;
        };
        // days.<date>.<field>.<more> is deeper than anything we route
        if dk.is_empty() || field.is_empty() || field.contains('.') {
            continue;
        }
        slot(&mut partials, dk).absorb(field, value);
    }

    DayMap {
        entries: partials
            .into_iter()
            .map(|(dk, partial)| (dk, partial.finish()))
            .collect(),
    }
}

/// Status of a single day; all flags false when the day is absent
pub fn read_day(body: &Body, date_key: &str) -> DayStatus {
    let days = normalize_days(body);
    DayStatus::from_entry(date_key, days.get(date_key))
}

fn summary_field<'a>(body: &'a Body, field: &str) -> Option<&'a Value> {
    let nested = body
        .get("summary")
        .and_then(Value::as_object)
        .and_then(|s| s.get(field))
        .filter(|v| !v.is_null());
    nested.or_else(|| body.get(&format!("summary.{}", field)).filter(|v| !v.is_null()))
}

/// Summary fields, nested object first, then `summary.<field>` keys
pub fn read_summary(body: &Body) -> AttendanceSummary {
    AttendanceSummary {
        last_action: summary_field(body, "lastAction")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<PunchType>().ok()),
        last_action_at: summary_field(body, "lastActionAt").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            other => parse_timestamp(other).map(crate::store::server_timestamp),
        }),
        total_days: summary_field(body, "totalDays").and_then(as_integer).unwrap_or(0),
    }
}

/// Punch log entries; malformed entries are skipped
pub fn read_logs(body: &Body) -> Vec<PunchLog> {
    body.get("logs")
        .and_then(Value::as_array)
        .map(|logs| {
            logs.iter()
                .filter_map(|v| serde_json::from_value::<PunchLog>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Everything the portal reads from one attendance document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceRecord {
    pub days: DayMap,
    pub logs: Vec<PunchLog>,
    pub summary: AttendanceSummary,
    pub name: Option<String>,
    pub meta: Map<String, Value>,
}

impl AttendanceRecord {
    pub fn from_body(body: &Body) -> Self {
        Self {
            days: normalize_days(body),
            logs: read_logs(body),
            summary: read_summary(body),
            name: body.get("name").and_then(Value::as_str).map(str::to_string),
            meta: body
                .get("meta")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
