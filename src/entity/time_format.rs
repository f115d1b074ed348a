//! Lenient date and clock-time parsing for stored and incoming records

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Parse a calendar date, optionally carrying a time of day
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`, RFC 3339 timestamps and naive
/// `YYYY-MM-DDTHH:MM[:SS]` values. Timestamps keep their wall-clock date.
pub fn parse_calendar_date(s: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some((date, None));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some((date, None));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        let naive = dt.naive_local();
        return Some((naive.date(), Some(naive.time())));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some((dt.date(), Some(dt.time())));
        }
    }

    None
}

/// Parse a clock time such as `14:30`, `14:30:00`, `18h` or `9h15`
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim().to_lowercase();

    for format in ["%H:%M", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(&s, format) {
            return Some(time);
        }
    }

    let s = s.trim_end_matches("rs").trim_end_matches('r');
    let (hours, minutes) = s.split_once('h')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = if minutes.trim().is_empty() {
        0
    } else {
        minutes.trim().parse().ok()?
    };
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Serde adapter for `Option<NaiveTime>` stored as `HH:MM`
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_clock_time(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", s))),
        }
    }
}

/// Serde adapter for `NaiveDate` that tolerates full timestamps
pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_calendar_date(&raw)
            .map(|(date, _)| date)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

/// Serde adapter for `Option<NaiveDate>` that tolerates full timestamps
pub mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_calendar_date(&s)
                .map(|(date, _)| Some(date))
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", s))),
        }
    }
}
