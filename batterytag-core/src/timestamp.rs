use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Rendered in place of a timestamp that was never recorded.
pub const UNAVAILABLE: &str = "Date not available";

const SENTINEL: &str = "0000000000";
const SEPARATORS: &[char] = &['-', ':', '.', '/', 'T', 'Z', ' '];

/// A record timestamp as stored on the tag.
///
/// The canonical form is ten digits, `YYMMDDHHMM`, in UTC with the year
/// relative to 2000. Older records carry RFC 3339 text instead, and an
/// all-zero value means the time is unknown. The raw string is kept verbatim
/// so a decode/encode cycle never rewrites what was on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(at: DateTime<Utc>) -> Self {
        Timestamp(format!(
            "{:02}{:02}{:02}{:02}{:02}",
            at.year().rem_euclid(100),
            at.month(),
            at.day(),
            at.hour(),
            at.minute()
        ))
    }

    /// The all-zero sentinel.
    pub fn unknown() -> Self {
        Timestamp(SENTINEL.to_string())
    }

    /// Wraps a raw value without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Timestamp(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for blank values and for values whose digits are all zero once
    /// separators are ignored (`0000000000`, `00-00-00 00:00`, `0`).
    pub fn is_unknown(&self) -> bool {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return true;
        }
        let mut saw_digit = false;
        for ch in trimmed.chars() {
            if ch == '0' {
                saw_digit = true;
            } else if ch.is_ascii_digit() || !SEPARATORS.contains(&ch) {
                return false;
            }
        }
        saw_digit
    }

    /// Interprets the value as a UTC instant.
    ///
    /// The numeric form is tried first, then the legacy RFC 3339 text form.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        if self.is_unknown() {
            return None;
        }
        let raw = self.0.trim();
        parse_numeric(raw).or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Medium date and short time in `tz`, e.g. `Jan 1, 2025, 12:00 PM`.
    ///
    /// The pattern is fixed to US English regardless of the host locale.
    ///
    /// Never fails: unknown values render as [`UNAVAILABLE`] and anything
    /// unparseable comes back unchanged.
    pub fn display_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.render(tz, "%b %-d, %Y, %-I:%M %p")
    }

    /// [`display_in`](Self::display_in) for the host's local zone.
    pub fn display_local(&self) -> String {
        self.display_in(&Local)
    }

    /// `yyyy-MM-dd HH:mm` in `tz`, as used by the printable report.
    pub fn compact_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.render(tz, "%Y-%m-%d %H:%M")
    }

    fn render<Tz>(&self, tz: &Tz, pattern: &str) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if self.is_unknown() {
            return UNAVAILABLE.to_string();
        }
        match self.to_utc() {
            Some(at) => at.with_timezone(tz).format(pattern).to_string(),
            None => self.0.clone(),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_utc(at)
    }
}

fn parse_numeric(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |at: usize| raw[at..at + 2].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(2000 + field(0)? as i32, field(2)?, field(4)?)?;
    let time = date.and_hms_opt(field(6)?, field(8)?, 0)?;
    Some(Utc.from_utc_datetime(&time))
}
