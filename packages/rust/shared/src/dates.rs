//! Ordinal date normalization ("1st August 2017" → calendar date).
//!
//! Seed pages print their date as `<weekday> <ordinal day> <month name> <year>`.
//! [`DateNormalizer`] turns the last three tokens into a midnight timestamp in
//! a configured reference zone. The zone is resolved once from configuration
//! and passed in at construction; nothing here reads global state.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{Result, SeedError};

/// Zone used when the configuration does not name one.
pub const DEFAULT_TIME_ZONE: &str = "Africa/Lagos";

/// Ordinal day tokens; index + 1 is the cardinal day.
const DAY_ORDINALS: [&str; 31] = [
    "1st", "2nd", "3rd", "4th", "5th", "6th", "7th", "8th", "9th", "10th", "11th", "12th",
    "13th", "14th", "15th", "16th", "17th", "18th", "19th", "20th", "21st", "22nd", "23rd",
    "24th", "25th", "26th", "27th", "28th", "29th", "30th", "31st",
];

/// Lowercase month names. `match` and `octomber` are misspellings that
/// already appear in stored display dates and are still accepted.
const MONTH_NAMES: [(&str, u32); 14] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("match", 3),
    ("octomber", 10),
];

/// Resolve a zone identifier, falling back to UTC if it cannot be loaded.
pub fn resolve_time_zone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(zone) => zone,
        Err(_) => {
            warn!(zone = name, "unknown time zone, falling back to UTC");
            chrono_tz::UTC
        }
    }
}

/// Look up a lowercase ordinal day token (`"21st"` → 21).
pub fn ordinal_day(token: &str) -> Option<u32> {
    DAY_ORDINALS
        .iter()
        .position(|ordinal| *ordinal == token)
        .map(|index| index as u32 + 1)
}

/// Look up a lowercase month name (`"august"` → 8).
pub fn month_number(token: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, number)| *number)
}

/// Converts ordinal-day date strings into calendar dates in a fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    zone: Tz,
}

impl DateNormalizer {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Parse `"<ordinal day> <month name> <year>"`, case-insensitive, commas ignored.
    pub fn normalize(&self, raw: &str) -> Result<DateTime<Tz>> {
        let value = raw.to_lowercase().replace(',', "");
        let tokens: Vec<&str> = value.split_whitespace().collect();

        let [day_token, month_token, year_token] = tokens.as_slice() else {
            return Err(SeedError::MalformedDate {
                value: raw.to_string(),
            });
        };

        let day = ordinal_day(day_token).ok_or_else(|| SeedError::InvalidDay {
            token: day_token.to_string(),
        })?;
        let month = month_number(month_token).ok_or_else(|| SeedError::InvalidMonth {
            token: month_token.to_string(),
        })?;
        let year: i32 = year_token.parse().map_err(|_| SeedError::InvalidYear {
            token: year_token.to_string(),
        })?;

        self.midnight(year, month, day)
            .ok_or_else(|| SeedError::InvalidDay {
                token: day_token.to_string(),
            })
    }

    /// Midnight of the given calendar day in the reference zone.
    ///
    /// When midnight falls in a daylight-saving gap the first instant after
    /// the gap is used, so the local calendar day never changes. Returns
    /// `None` when the day does not exist (e.g. 30 February).
    pub fn midnight(&self, year: i32, month: u32, day: u32) -> Option<DateTime<Tz>> {
        let local = NaiveDate::from_ymd_opt(year, month, day)?.and_time(NaiveTime::MIN);
        self.zone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                let after_gap = local + TimeDelta::hours(1);
                self.zone.from_local_datetime(&after_gap).earliest()
            })
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(resolve_time_zone(DEFAULT_TIME_ZONE))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn english_ordinal(n: u32) -> String {
        let suffix = match (n % 10, n % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        format!("{n}{suffix}")
    }

    #[test]
    fn every_ordinal_maps_to_its_day() {
        let normalizer = DateNormalizer::default();
        for n in 1..=31 {
            let raw = format!("{} January 2020", english_ordinal(n));
            let date = normalizer.normalize(&raw).expect("valid ordinal");
            assert_eq!(date.day(), n, "{raw}");
        }
    }

    #[test]
    fn unknown_ordinals_are_invalid_days() {
        let normalizer = DateNormalizer::default();
        for token in ["32nd", "0th", "1th", "11st", "first", "1"] {
            let err = normalizer
                .normalize(&format!("{token} January 2020"))
                .unwrap_err();
            assert!(
                matches!(&err, SeedError::InvalidDay { token: t } if t == token),
                "{token}: {err}"
            );
        }
    }

    #[test]
    fn month_names_are_case_insensitive() {
        let normalizer = DateNormalizer::default();
        let names = [
            "JANUARY", "February", "march", "April", "MAY", "June", "july", "AuGuSt",
            "September", "October", "november", "December",
        ];
        for (index, name) in names.iter().enumerate() {
            let date = normalizer
                .normalize(&format!("1st {name} 2017"))
                .expect("valid month");
            assert_eq!(date.month(), index as u32 + 1, "{name}");
        }
    }

    #[test]
    fn legacy_misspellings_still_resolve() {
        let normalizer = DateNormalizer::default();
        assert_eq!(normalizer.normalize("2nd Match 2018").unwrap().month(), 3);
        assert_eq!(normalizer.normalize("3rd Octomber 2018").unwrap().month(), 10);
    }

    #[test]
    fn unknown_month_names_the_token() {
        let normalizer = DateNormalizer::default();
        let err = normalizer.normalize("1st Smarch 2017").unwrap_err();
        match err {
            SeedError::InvalidMonth { token } => assert_eq!(token, "smarch"),
            other => panic!("expected InvalidMonth, got {other}"),
        }
    }

    #[test]
    fn commas_and_spacing_are_ignored() {
        let normalizer = DateNormalizer::default();
        let date = normalizer.normalize("  1st   August, 2017 ").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2017, 8, 1));
    }

    #[test]
    fn wrong_token_count_is_malformed() {
        let normalizer = DateNormalizer::default();
        assert!(matches!(
            normalizer.normalize("1st August"),
            Err(SeedError::MalformedDate { .. })
        ));
        assert!(matches!(
            normalizer.normalize("Tuesday 1st August 2017"),
            Err(SeedError::MalformedDate { .. })
        ));
        assert!(matches!(
            normalizer.normalize(""),
            Err(SeedError::MalformedDate { .. })
        ));
    }

    #[test]
    fn bad_year_and_impossible_day() {
        let normalizer = DateNormalizer::default();
        assert!(matches!(
            normalizer.normalize("1st August twenty"),
            Err(SeedError::InvalidYear { .. })
        ));
        assert!(matches!(
            normalizer.normalize("30th February 2020"),
            Err(SeedError::InvalidDay { .. })
        ));
    }

    #[test]
    fn dates_use_the_configured_zone() {
        let lagos = DateNormalizer::new(resolve_time_zone("Africa/Lagos"));
        let date = lagos.normalize("1st August 2017").unwrap();
        assert_eq!(date.timezone(), chrono_tz::Africa::Lagos);
        assert_eq!(date.to_rfc3339(), "2017-08-01T00:00:00+01:00");
    }

    #[test]
    fn midnight_in_a_dst_gap_keeps_the_calendar_day() {
        // Sao Paulo skipped 2018-11-04 00:00..01:00 local time.
        let sao_paulo = DateNormalizer::new(chrono_tz::America::Sao_Paulo);
        let date = sao_paulo.normalize("4th November 2018").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2018, 11, 4));
        assert_eq!(date.to_rfc3339(), "2018-11-04T01:00:00-02:00");

        let next = sao_paulo.normalize("5th November 2018").unwrap();
        assert_eq!(next.to_rfc3339(), "2018-11-05T00:00:00-02:00");
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        assert_eq!(resolve_time_zone("Mars/Olympus_Mons"), chrono_tz::UTC);
        assert_eq!(resolve_time_zone("Africa/Lagos"), chrono_tz::Africa::Lagos);
    }
}
