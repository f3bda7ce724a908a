use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// India Standard Time, the zone every student's "day" is anchored to by default
pub const DEFAULT_DAY_OFFSET_MINUTES: i32 = 330;

/// Computes `YYYY-MM-DD` keys in one fixed reference zone, so every student
/// shares the same day boundary whatever their device reports.
#[derive(Debug, Clone, Copy)]
pub struct DayCalendar {
    offset: FixedOffset,
}

impl DayCalendar {
    pub fn new(offset_minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(offset_minutes * 60).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date_key(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d").to_string()
    }

    /// Date key `days` calendar days after `at` (negative goes back)
    pub fn date_key_plus_days(&self, at: DateTime<Utc>, days: i64) -> String {
        self.date_key(at + Duration::days(days))
    }

    /// `HH:MM` wall-clock time in the reference zone
    pub fn clock_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H:%M").to_string()
    }
}

impl Default for DayCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_DAY_OFFSET_MINUTES).unwrap_or(Self { offset: Utc.fix() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_boundary_follows_reference_zone() {
        let cal = DayCalendar::default();
        // 2025-10-28 19:00 UTC is already 00:30 on the 29th in IST
        let late_utc = Utc.with_ymd_and_hms(2025, 10, 28, 19, 0, 0).unwrap();
        assert_eq!(cal.date_key(late_utc), "2025-10-29");

        let early_utc = Utc.with_ymd_and_hms(2025, 10, 28, 18, 0, 0).unwrap();
        assert_eq!(cal.date_key(early_utc), "2025-10-28");
    }

    #[test]
    fn utc_calendar() {
        let cal = DayCalendar::new(0).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(cal.date_key(at), "2025-12-31");
        assert_eq!(cal.date_key_plus_days(at, 1), "2026-01-01");
        assert_eq!(cal.clock_time(at), "23:59");
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert!(DayCalendar::new(24 * 60).is_none());
    }
}
