// src/dates.rs
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Madrid;

type Strategy = fn(&DateParser, &str) -> Option<DateTime<FixedOffset>>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("iso8601", DateParser::parse_iso),
    ("day_first", DateParser::parse_day_first),
    ("fallback", DateParser::parse_fallback),
];

// tried against the value with a trailing Z rewritten as +00:00
const ISO_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];

const ISO_LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateParser {
    tz: Tz,
}

impl Default for DateParser {
    fn default() -> Self {
        DateParser::new(DEFAULT_TIMEZONE)
    }
}

impl DateParser {
    pub fn new(tz: Tz) -> Self {
        DateParser { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn parse(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        STRATEGIES.iter().find_map(|(name, strategy)| {
            let parsed = strategy(self, value);
            if parsed.is_some() {
                tracing::trace!(strategy = name, value, "parsed date cell");
            }
            parsed
        })
    }

    /// Resolve a wall-clock time in the business timezone. Ambiguous times
    /// (DST fall-back) take the earlier instant; skipped ones fail.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&dt.offset().fix()))
    }

    fn parse_iso(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        if !(value.contains('-') && value.contains('T')) {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt);
        }

        let with_offset = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
            Some(rest) => format!("{rest}+00:00"),
            None => value.to_string(),
        };
        if let Some(dt) = ISO_OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(&with_offset, format).ok())
        {
            return Some(dt);
        }

        ISO_LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .and_then(|naive| self.localize(naive))
    }

    fn parse_day_first(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let mut parts = value.split_whitespace();
        let date_part = parts.next()?;
        let time_part = parts.next();
        if parts.next().is_some() {
            return None;
        }

        let date = parse_dmy(date_part)?;
        let time = match time_part {
            Some(t) => parse_hms(t)?,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };

        self.localize(date.and_time(time))
    }

    fn parse_fallback(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt);
        }

        let naive = FALLBACK_DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .or_else(|| {
                FALLBACK_DATE_FORMATS
                    .iter()
                    .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .filter(|naive| naive.year() >= 1000)?;

        self.localize(naive)
    }
}

// D/M/Y, D-M-Y or D.M.Y; two-digit years below 50 are 20xx, the rest 19xx
fn parse_dmy(value: &str) -> Option<NaiveDate> {
    let separator = value.chars().find(|c| matches!(c, '/' | '-' | '.'))?;
    let fields: Vec<&str> = value.split(separator).collect();
    let [day, month, year] = fields.as_slice() else {
        return None;
    };

    let day = digits(day, 2)?;
    let month = digits(month, 2)?;
    let year = match year.len() {
        2 => {
            let short = digits(year, 2)? as i32;
            if short < 50 {
                2000 + short
            } else {
                1900 + short
            }
        }
        4 => digits(year, 4)? as i32,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_hms(value: &str) -> Option<NaiveTime> {
    let fields: Vec<&str> = value.split(':').collect();
    let (hour, minute, second) = match fields.as_slice() {
        [h, m] => (digits(h, 2)?, digits(m, 2)?, 0),
        [h, m, s] => (digits(h, 2)?, digits(m, 2)?, digits(s, 2)?),
        _ => return None,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn digits(value: &str, max_len: usize) -> Option<u32> {
    if value.is_empty() || value.len() > max_len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
