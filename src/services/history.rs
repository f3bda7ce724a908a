use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::normalizer::DayMap;
use crate::utils::date_key::DayCalendar;

/// Placeholder shown for a day with neither punch recorded
pub const NO_PUNCH: &str = "\u{2014}";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    #[schema(example = "2025-10-28")]
    pub date_key: String,
    #[schema(example = "09:32")]
    pub in_time: Option<String>,
    #[schema(example = "17:05")]
    pub out_time: Option<String>,
    pub duration_min: Option<i64>,
    #[schema(example = "Done")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthSection {
    #[schema(example = "2025-10")]
    pub month: String,
    #[schema(example = "October 2025")]
    pub title: String,
    pub days: Vec<HistoryRow>,
}

fn status_label(has_in: bool, has_out: bool) -> &'static str {
    match (has_in, has_out) {
        (true, true) => "Done",
        (true, false) => "IN only",
        _ => NO_PUNCH,
    }
}

/// Groups days by month, newest month and newest day first. Keys that are
/// not real dates are dropped.
pub fn build_history(days: &DayMap, calendar: &DayCalendar) -> Vec<MonthSection> {
    let clock = |ms: Option<i64>| {
        ms.and_then(DateTime::from_timestamp_millis)
            .map(|t| calendar.clock_time(t))
    };

    let mut dated: Vec<(NaiveDate, HistoryRow)> = days
        .iter()
        .filter_map(|(key, entry)| {
            let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?;
            Some((
                date,
                HistoryRow {
                    date_key: key.to_string(),
                    in_time: clock(entry.in_millis()),
                    out_time: clock(entry.out_millis()),
                    duration_min: entry.duration_min,
                    status: status_label(entry.has_in, entry.has_out).to_string(),
                },
            ))
        })
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut sections: Vec<MonthSection> = Vec::new();
    for (date, row) in dated {
        let month = date.format("%Y-%m").to_string();
        match sections.last_mut() {
            Some(section) if section.month == month => section.days.push(row),
            _ => sections.push(MonthSection {
                month,
                title: date.format("%B %Y").to_string(),
                days: vec![row],
            }),
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::normalizer::normalize_days;
    use serde_json::json;

    #[test]
    fn groups_by_month_newest_first() {
        let body = json!({
            "days": {
                "2025-09-30": {"hasIn": true, "inAtMs": 1759203000000i64},
                "2025-10-28": {
                    "hasIn": true, "hasOut": true,
                    "inAtMs": 1761624000000i64, "outAtMs": 1761645600000i64,
                    "durationMin": 360
                },
                "2025-10-02": {"hasIn": false},
                "not-a-date": {"hasIn": true}
            }
        });
        let days = normalize_days(body.as_object().unwrap());
        let sections = build_history(&days, &DayCalendar::default());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].month, "2025-10");
        assert_eq!(sections[0].title, "October 2025");
        assert_eq!(sections[0].days[0].date_key, "2025-10-28");
        assert_eq!(sections[0].days[0].in_time.as_deref(), Some("09:30"));
        assert_eq!(sections[0].days[0].out_time.as_deref(), Some("15:30"));
        assert_eq!(sections[0].days[0].status, "Done");
        assert_eq!(sections[0].days[1].status, NO_PUNCH);
        assert_eq!(sections[1].title, "September 2025");
        assert_eq!(sections[1].days[0].status, "IN only");
        assert_eq!(sections[1].days[0].out_time, None);
    }
}
