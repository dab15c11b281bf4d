//! Pure functions turning raw content fields into display strings: absolute
//! and relative dates, and reading-time estimates.

use crate::post::TextBlock;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;

/// The assumed reading speed for [`reading_time_minutes`].
pub const WORDS_PER_MINUTE: usize = 200;

const MINUTES_IN_HOUR: i64 = 60;
const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// Parses a CMS timestamp. Accepted forms are RFC 3339
/// (`2021-03-25T10:00:00Z`), RFC 3339 with a colon-less offset
/// (`2021-03-25T10:00:00+0000`, which is what the CMS sends), and bare dates
/// (`2021-03-25`, taken as midnight UTC).
pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, InvalidDate> {
    let input = timestamp.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
        return Ok(date_time.with_timezone(&Utc));
    }
    if let Ok(date_time) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(date_time.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(InvalidDate::Malformed(timestamp.to_owned()))
}

/// Formats a timestamp as `DD Mon YYYY` (e.g., `25 Mar 2021`) in UTC.
pub fn format_date(timestamp: &str) -> Result<String, InvalidDate> {
    Ok(parse_timestamp(timestamp)?.format("%d %b %Y").to_string())
}

/// Formats the "last edited" note shown under a post's header, e.g.
/// `* edited 25 Mar 2021, at 10:00`.
pub fn format_updated_at(timestamp: &str) -> Result<String, InvalidDate> {
    Ok(format!(
        "* edited {}",
        parse_timestamp(timestamp)?.format("%d %b %Y, at %H:%M")
    ))
}

/// Describes the distance between `timestamp` and `now` in words, e.g.
/// `3 days ago` or `in about 2 hours`.
pub fn format_relative_date(
    timestamp: &str,
    now: DateTime<Utc>,
) -> Result<String, InvalidDate> {
    let seconds = (now - parse_timestamp(timestamp)?).num_seconds();
    let distance = distance_in_words(seconds.abs());
    Ok(match seconds < 0 {
        true => format!("in {}", distance),
        false => format!("{} ago", distance),
    })
}

fn distance_in_words(seconds: i64) -> String {
    let minutes = div_round(seconds, 60);
    match minutes {
        0 => String::from("less than a minute"),
        1 => String::from("1 minute"),
        m if m < 45 => format!("{} minutes", m),
        m if m < 90 => String::from("about 1 hour"),
        m if m < MINUTES_IN_DAY => {
            format!("about {} hours", div_round(m, MINUTES_IN_HOUR))
        }
        m if m < 2520 => String::from("1 day"),
        m if m < MINUTES_IN_MONTH => {
            format!("{} days", div_round(m, MINUTES_IN_DAY))
        }
        m if m < MINUTES_IN_TWO_MONTHS => {
            format!("about {}", plural(div_round(m, MINUTES_IN_MONTH), "month"))
        }
        m => {
            let months = m / MINUTES_IN_MONTH;
            if months < 12 {
                return format!("{} months", div_round(m, MINUTES_IN_MONTH));
            }
            let years = months / 12;
            match months % 12 {
                r if r < 3 => format!("about {}", plural(years, "year")),
                r if r < 9 => format!("over {}", plural(years, "year")),
                _ => format!("almost {}", plural(years + 1, "year")),
            }
        }
    }
}

fn div_round(n: i64, d: i64) -> i64 {
    (n + d / 2) / d
}

fn plural(n: i64, unit: &str) -> String {
    match n {
        1 => format!("1 {}", unit),
        _ => format!("{} {}s", n, unit),
    }
}

/// Estimates the minutes needed to read `blocks`: the whitespace-separated
/// word count over all blocks divided by [`WORDS_PER_MINUTE`], rounded up.
/// No words means zero minutes.
pub fn reading_time_minutes<'a>(
    blocks: impl IntoIterator<Item = &'a TextBlock>,
) -> u32 {
    let words: usize = blocks
        .into_iter()
        .map(|block| block.text.split_whitespace().count())
        .sum();
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Returned when a timestamp is missing or can't be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidDate {
    /// There was no timestamp to format.
    Missing,

    /// The timestamp isn't in any of the formats [`parse_timestamp`] accepts.
    Malformed(String),
}

impl fmt::Display for InvalidDate {
    /// Displays an [`InvalidDate`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidDate::Missing => write!(f, "missing timestamp"),
            InvalidDate::Malformed(input) => {
                write!(f, "invalid timestamp `{}`", input)
            }
        }
    }
}

impl std::error::Error for InvalidDate {}

#[cfg(test)]
mod test {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 25, 10, 0, 0).unwrap()
    }

    fn words(n: usize) -> TextBlock {
        TextBlock::paragraph(vec!["word"; n].join(" "))
    }

    #[test]
    fn test_format_date() -> Result<(), InvalidDate> {
        assert_eq!("25 Mar 2021", format_date("2021-03-25T10:00:00Z")?);
        assert_eq!("25 Mar 2021", format_date("2021-03-25T10:00:00+0000")?);
        assert_eq!("01 Jan 2020", format_date("2020-01-01")?);
        Ok(())
    }

    #[test]
    fn test_format_date_uses_utc() -> Result<(), InvalidDate> {
        assert_eq!("24 Mar 2021", format_date("2021-03-25T01:00:00+0300")?);
        Ok(())
    }

    #[test]
    fn test_format_date_invalid() {
        assert_eq!(
            Err(InvalidDate::Malformed(String::from("yesterday"))),
            format_date("yesterday")
        );
        assert_eq!(
            Err(InvalidDate::Malformed(String::new())),
            format_date("")
        );
    }

    #[test]
    fn test_format_updated_at() -> Result<(), InvalidDate> {
        assert_eq!(
            "* edited 25 Mar 2021, at 19:25",
            format_updated_at("2021-03-25T19:25:28+0000")?
        );
        Ok(())
    }

    #[test]
    fn test_format_relative_date() -> Result<(), InvalidDate> {
        let cases = [
            ("2021-03-25T09:59:45Z", "less than a minute ago"),
            ("2021-03-25T09:59:00Z", "1 minute ago"),
            ("2021-03-25T09:30:00Z", "30 minutes ago"),
            ("2021-03-25T09:00:00Z", "about 1 hour ago"),
            ("2021-03-25T05:00:00Z", "about 5 hours ago"),
            ("2021-03-24T10:00:00Z", "1 day ago"),
            ("2021-03-22T10:00:00Z", "3 days ago"),
            ("2021-02-20T10:00:00Z", "about 1 month ago"),
            ("2020-11-25T10:00:00Z", "4 months ago"),
            ("2020-02-20T10:00:00Z", "about 1 year ago"),
            ("2019-09-25T10:00:00Z", "over 1 year ago"),
            ("2019-05-01T10:00:00Z", "almost 2 years ago"),
            ("2021-03-25T12:00:00Z", "in about 2 hours"),
        ];
        for (timestamp, wanted) in cases.iter() {
            assert_eq!(
                *wanted,
                format_relative_date(timestamp, now())?,
                "timestamp: {}",
                timestamp
            );
        }
        Ok(())
    }

    #[test]
    fn test_format_relative_date_invalid() {
        assert_eq!(
            Err(InvalidDate::Malformed(String::from("soon"))),
            format_relative_date("soon", now())
        );
    }

    #[test]
    fn test_reading_time_minutes() {
        assert_eq!(0, reading_time_minutes(&[]));
        assert_eq!(0, reading_time_minutes(&[TextBlock::paragraph("")]));
        assert_eq!(0, reading_time_minutes(&[TextBlock::paragraph("  \n ")]));
        assert_eq!(1, reading_time_minutes(&[words(1)]));
        assert_eq!(1, reading_time_minutes(&[words(200)]));
        assert_eq!(2, reading_time_minutes(&[words(201)]));
        assert_eq!(2, reading_time_minutes(&[words(150), words(150)]));
    }
}
