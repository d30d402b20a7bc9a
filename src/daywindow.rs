//! # Daily Window
//! `[start_of_day, end_of_day)` for one calendar date in a fixed UTC offset.
//! The job aggregates exactly one such window per run.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub offset: FixedOffset,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_day(day: NaiveDate, offset: FixedOffset) -> Self {
        // A fixed offset has no gaps or folds: local midnight maps to exactly one instant.
        let start = (day.and_time(NaiveTime::MIN) - offset_delta(offset)).and_utc();
        Self {
            day,
            offset,
            start,
            end: start + Duration::days(1),
        }
    }

    /// Window for the current calendar date as seen in `offset`.
    pub fn today(offset: FixedOffset) -> Self {
        Self::containing(Utc::now(), offset)
    }

    /// Window of the local calendar date that `instant` falls on.
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::for_day(instant.with_timezone(&offset).date_naive(), offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn offset_delta(offset: FixedOffset) -> Duration {
    Duration::seconds(offset.local_minus_utc() as i64)
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, `+HH`, `Z` or `UTC`.
pub fn parse_offset(s: &str) -> Result<FixedOffset> {
    let t = s.trim();
    if t.eq_ignore_ascii_case("z") || t.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("zero offset"));
    }
    let (sign, rest) = match t.chars().next() {
        Some('+') => (1, &t[1..]),
        Some('-') => (-1, &t[1..]),
        _ => bail!("utc offset must start with '+' or '-': {t:?}"),
    };
    let digits: String = match rest.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => format!("{h}{m}"),
        Some(_) => bail!("malformed utc offset: {t:?}"),
        None => rest.to_string(),
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
        bail!("malformed utc offset: {t:?}");
    }
    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = if digits.len() == 4 { digits[2..].parse()? } else { 0 };
    if hours > 23 || minutes > 59 {
        bail!("utc offset out of range: {t:?}");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("utc offset out of range: {t:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_one_local_day() {
        let off = parse_offset("+02:00").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let w = DayWindow::for_day(day, off);
        assert_eq!(w.start.to_rfc3339(), "2024-04-30T22:00:00+00:00");
        assert_eq!(w.end.to_rfc3339(), "2024-05-01T22:00:00+00:00");
        assert!(w.contains(w.start));
        assert!(!w.contains(w.end));
    }

    #[test]
    fn containing_uses_local_calendar_date() {
        let off = parse_offset("-05:00").unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap();
        let w = DayWindow::containing(instant, off);
        assert_eq!(w.day, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(w.contains(instant));
    }

    #[test]
    fn offset_parsing_variants() {
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("+0530").unwrap().local_minus_utc(), 5 * 3600 + 1800);
        assert_eq!(parse_offset("-03").unwrap().local_minus_utc(), -3 * 3600);
        assert!(parse_offset("02:00").is_err());
        assert!(parse_offset("+25:00").is_err());
        assert!(parse_offset("+2:0").is_err());
    }
}
