use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::{MarketDataError, MarketDataResult};

/// Lookback ending now, in the `100d` / `6mo` / `1y` / `ytd` / `max` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

/// Earliest timestamp requested for `Period::Max` (1900-01-01).
const MAX_LOOKBACK_TS: i64 = -2_208_988_800;

impl Period {
    /// Start of the window that ends at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> MarketDataResult<DateTime<Utc>> {
        let start = match *self {
            Period::Days(n) => {
                chrono::Duration::try_days(i64::from(n)).and_then(|d| now.checked_sub_signed(d))
            }
            Period::Weeks(n) => {
                chrono::Duration::try_weeks(i64::from(n)).and_then(|d| now.checked_sub_signed(d))
            }
            Period::Months(n) => now.checked_sub_months(Months::new(n)),
            Period::Years(n) => n
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
            Period::YearToDate => Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).single(),
            Period::Max => Utc.timestamp_opt(MAX_LOOKBACK_TS, 0).single(),
        };
        start.ok_or_else(|| MarketDataError::PeriodOutOfRange(self.to_string()))
    }
}

impl FromStr for Period {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        match raw.as_str() {
            "ytd" => return Ok(Period::YearToDate),
            "max" => return Ok(Period::Max),
            _ => {}
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| MarketDataError::InvalidPeriod(s.to_string()))?;
        let (digits, unit) = raw.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| MarketDataError::InvalidPeriod(s.to_string()))?;
        if n == 0 {
            return Err(MarketDataError::InvalidPeriod(s.to_string()));
        }

        match unit {
            "d" => Ok(Period::Days(n)),
            "wk" => Ok(Period::Weeks(n)),
            "mo" => Ok(Period::Months(n)),
            "y" => Ok(Period::Years(n)),
            _ => Err(MarketDataError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Weeks(n) => write!(f, "{n}wk"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
            Period::YearToDate => f.write_str("ytd"),
            Period::Max => f.write_str("max"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_units() {
        assert_eq!("100d".parse::<Period>().unwrap(), Period::Days(100));
        assert_eq!("2wk".parse::<Period>().unwrap(), Period::Weeks(2));
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::Months(6));
        assert_eq!(" 1Y ".parse::<Period>().unwrap(), Period::Years(1));
        assert_eq!("ytd".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("MAX".parse::<Period>().unwrap(), Period::Max);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "d", "100", "0d", "10h", "-5d", "abc"] {
            assert!(bad.parse::<Period>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn window_starts() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(
            Period::Days(100).start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 21, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Period::Months(3).start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Period::YearToDate.start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(Period::Max.start(now).unwrap().year() == 1900);
    }

    #[test]
    fn oversized_periods_are_errors() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let huge: Period = "4000000000d".parse().unwrap();
        assert!(matches!(
            huge.start(now),
            Err(MarketDataError::PeriodOutOfRange(p)) if p == "4000000000d"
        ));
        assert!(Period::Weeks(u32::MAX).start(now).is_err());
        assert!(Period::Years(u32::MAX).start(now).is_err());
        assert!(Period::Months(u32::MAX).start(now).is_err());
    }

    #[test]
    fn display_round_trips_notation() {
        assert_eq!(Period::Days(100).to_string(), "100d");
        assert_eq!(Period::Months(6).to_string(), "6mo");
    }
}
