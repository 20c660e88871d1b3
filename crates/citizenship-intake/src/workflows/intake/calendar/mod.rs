//! Gregorian ⇄ Bikram-Sambat conversion.
//!
//! Conversion counts days from a fixed anchor (BS 2000-01-01 = AD 1943-04-14)
//! through a month-length table, so both directions are exact and inverse to
//! each other for every day the table covers.

mod table;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use table::MONTH_LENGTHS;

pub const FIRST_BS_YEAR: u16 = 2000;
pub const LAST_BS_YEAR: u16 = FIRST_BS_YEAR + MONTH_LENGTHS.len() as u16 - 1;

/// `NaiveDate::num_days_from_ce` of AD 1943-04-14, the first day of BS 2000.
const ANCHOR_DAYS_FROM_CE: i32 = 709_404;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("expected a YYYY-MM-DD date, found '{input}'")]
    Malformed { input: String },
    #[error("date component '{component}' in '{input}' is not a number")]
    NonNumeric { component: String, input: String },
    #[error("BS year {year} is outside the supported range {}-{}", FIRST_BS_YEAR, LAST_BS_YEAR)]
    YearOutOfRange { year: u16 },
    #[error("BS month {month} must be between 1 and 12")]
    InvalidMonth { month: u8 },
    #[error("BS {year}-{month:02} has {max} days, day {day} does not exist")]
    InvalidDay { year: u16, month: u8, day: u8, max: u8 },
    #[error("'{input}' is not a valid Gregorian date")]
    InvalidAdDate { input: String },
    #[error("AD {date} falls outside the convertible BS era")]
    OutOfRange { date: NaiveDate },
}

/// A validated Bikram-Sambat calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BsDate {
    year: u16,
    month: u8,
    day: u8,
}

impl BsDate {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, CalendarError> {
        let max = days_in_month(year, month)?;
        if day == 0 || day > max {
            return Err(CalendarError::InvalidDay {
                year,
                month,
                day,
                max,
            });
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl fmt::Display for BsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for BsDate {
    type Err = CalendarError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        let parts: Vec<&str> = input.split('-').collect();
        let [year, month, day] = parts.as_slice() else {
            return Err(CalendarError::Malformed {
                input: input.to_string(),
            });
        };

        let numeric = |component: &&str| {
            component
                .parse::<u16>()
                .map_err(|_| CalendarError::NonNumeric {
                    component: component.to_string(),
                    input: input.to_string(),
                })
        };
        let year = numeric(year)?;
        // Oversized components saturate so `BsDate::new` reports them.
        let month = u8::try_from(numeric(month)?).unwrap_or(u8::MAX);
        let day = u8::try_from(numeric(day)?).unwrap_or(u8::MAX);

        BsDate::new(year, month, day)
    }
}

impl Serialize for BsDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BsDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Number of days in a BS month, or the reason the month is not in the table.
pub fn days_in_month(year: u16, month: u8) -> Result<u8, CalendarError> {
    let months = year_row(year)?;
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth { month });
    }
    Ok(months[usize::from(month - 1)])
}

fn year_row(year: u16) -> Result<&'static [u8; 12], CalendarError> {
    year.checked_sub(FIRST_BS_YEAR)
        .and_then(|index| MONTH_LENGTHS.get(usize::from(index)))
        .ok_or(CalendarError::YearOutOfRange { year })
}

fn year_length(row: &[u8; 12]) -> i32 {
    row.iter().map(|&days| i32::from(days)).sum()
}

/// Convert a Gregorian date to its Bikram-Sambat equivalent.
pub fn to_bs(date: NaiveDate) -> Result<BsDate, CalendarError> {
    let mut remaining = date.num_days_from_ce() - ANCHOR_DAYS_FROM_CE;
    if remaining < 0 {
        return Err(CalendarError::OutOfRange { date });
    }

    for (index, row) in MONTH_LENGTHS.iter().enumerate() {
        let length = year_length(row);
        if remaining >= length {
            remaining -= length;
            continue;
        }
        for (month_index, &days) in row.iter().enumerate() {
            let days = i32::from(days);
            if remaining < days {
                return Ok(BsDate {
                    year: FIRST_BS_YEAR + index as u16,
                    month: month_index as u8 + 1,
                    day: remaining as u8 + 1,
                });
            }
            remaining -= days;
        }
    }

    Err(CalendarError::OutOfRange { date })
}

/// Convert a Bikram-Sambat date to its Gregorian equivalent.
pub fn to_ad(date: BsDate) -> Result<NaiveDate, CalendarError> {
    let row = year_row(date.year)?;
    let preceding_years: i32 = MONTH_LENGTHS[..usize::from(date.year - FIRST_BS_YEAR)]
        .iter()
        .map(year_length)
        .sum();
    let preceding_months: i32 = row[..usize::from(date.month - 1)]
        .iter()
        .map(|&days| i32::from(days))
        .sum();
    let offset = preceding_years + preceding_months + i32::from(date.day) - 1;

    NaiveDate::from_num_days_from_ce_opt(ANCHOR_DAYS_FROM_CE + offset).ok_or(
        CalendarError::YearOutOfRange { year: date.year },
    )
}

/// Parse a Gregorian `YYYY-MM-DD` string, the shape a date input produces.
pub fn parse_ad(raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CalendarError::InvalidAdDate {
        input: raw.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn bs(year: u16, month: u8, day: u8) -> BsDate {
        BsDate::new(year, month, day).expect("valid BS date")
    }

    #[test]
    fn anchors_convert_both_ways() {
        let anchors = [
            (bs(2000, 1, 1), ad(1943, 4, 14)),
            (bs(2057, 1, 1), ad(2000, 4, 13)),
            (bs(2070, 1, 1), ad(2013, 4, 14)),
            (bs(2081, 1, 1), ad(2024, 4, 13)),
            (bs(2082, 1, 1), ad(2025, 4, 14)),
        ];
        for (bs_date, ad_date) in anchors {
            assert_eq!(to_ad(bs_date).expect("to ad"), ad_date, "{bs_date}");
            assert_eq!(to_bs(ad_date).expect("to bs"), bs_date, "{ad_date}");
        }
    }

    #[test]
    fn round_trips_every_day_in_the_era() {
        let first = ad(1943, 4, 14);
        let last = to_ad(bs(LAST_BS_YEAR, 12, 30)).expect("last day converts");
        assert_eq!(last, ad(2034, 4, 13));

        let mut day = first;
        let mut previous: Option<BsDate> = None;
        while day <= last {
            let converted = to_bs(day).expect("in range");
            assert_eq!(to_ad(converted).expect("back to ad"), day);
            if let Some(previous) = previous {
                assert!(converted > previous, "BS dates must advance with AD dates");
            }
            previous = Some(converted);
            day = day.succ_opt().expect("next day");
        }
    }

    #[test]
    fn rejects_dates_outside_the_table() {
        assert_eq!(
            to_bs(ad(1943, 4, 13)),
            Err(CalendarError::OutOfRange {
                date: ad(1943, 4, 13)
            })
        );
        assert_eq!(
            to_bs(ad(2034, 4, 14)),
            Err(CalendarError::OutOfRange {
                date: ad(2034, 4, 14)
            })
        );
        assert_eq!(
            BsDate::new(1999, 12, 1),
            Err(CalendarError::YearOutOfRange { year: 1999 })
        );
    }

    #[test]
    fn validates_month_and_day_against_the_table() {
        assert_eq!(
            BsDate::new(2081, 13, 1),
            Err(CalendarError::InvalidMonth { month: 13 })
        );
        // Baisakh 2000 has 30 days.
        assert!(matches!(
            BsDate::new(2000, 1, 31),
            Err(CalendarError::InvalidDay { max: 30, .. })
        ));
        assert!(BsDate::new(2000, 2, 32).is_ok());
        assert!(matches!(
            BsDate::new(2000, 2, 0),
            Err(CalendarError::InvalidDay { .. })
        ));
    }

    #[test]
    fn parses_and_formats_zero_padded() {
        let parsed: BsDate = "2081-1-5".parse().expect("parses");
        assert_eq!(parsed, bs(2081, 1, 5));
        assert_eq!(parsed.to_string(), "2081-01-05");
        assert_eq!(" 2057-01-01 ".parse::<BsDate>(), Ok(bs(2057, 1, 1)));
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        assert!(matches!(
            "2081-01".parse::<BsDate>(),
            Err(CalendarError::Malformed { .. })
        ));
        assert!(matches!(
            "2081-01-01-01".parse::<BsDate>(),
            Err(CalendarError::Malformed { .. })
        ));
        assert!(matches!(
            "20x1-01-01".parse::<BsDate>(),
            Err(CalendarError::NonNumeric { .. })
        ));
        assert!(matches!(
            "2081-300-01".parse::<BsDate>(),
            Err(CalendarError::InvalidMonth { .. })
        ));
        assert!(matches!(
            "".parse::<BsDate>(),
            Err(CalendarError::Malformed { .. })
        ));
    }

    #[test]
    fn serde_uses_the_string_form() {
        let json = serde_json::to_string(&bs(2081, 4, 9)).expect("serializes");
        assert_eq!(json, "\"2081-04-09\"");
        let back: BsDate = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, bs(2081, 4, 9));
        assert!(serde_json::from_str::<BsDate>("\"2081-04-40\"").is_err());
    }

    #[test]
    fn parse_ad_accepts_date_input_values() {
        assert_eq!(parse_ad("2004-06-15"), Ok(ad(2004, 6, 15)));
        assert!(matches!(
            parse_ad("2023-02-29"),
            Err(CalendarError::InvalidAdDate { .. })
        ));
        assert!(parse_ad("").is_err());
    }
}
