//! Legacy calendar date conversion (spec §4.I): the source system stores
//! dates as `local_era_year * 10000 + month * 100 + day` (local era year =
//! Gregorian year - 1911), either as a 6/7-digit integer or a parseable
//! string of the same shape. Grounded on
//! `original_source/backend/app/migrations/migrate_legacy_data.py`'s
//! era-year-plus-1911 conversion.

use crate::error::{CoreError, Result};
use chrono::NaiveDate;

const ERA_OFFSET: i32 = 1911;

/// Converts a legacy-era date (integer or numeric string, 6 or 7 digits) to
/// a proleptic Gregorian date.
pub fn convert_legacy_date(raw: &str) -> Result<NaiveDate> {
    let digits = raw.trim();
    let value: i64 = digits.parse().map_err(|_| CoreError::validation(format!("not a legacy date: {raw}")))?;
    if !(10000..=9999999).contains(&value) {
        return Err(CoreError::validation(format!("legacy date out of range: {raw}")));
    }
    let day = (value % 100) as u32;
    let month = ((value / 100) % 100) as u32;
    let era_year = (value / 10000) as i32;
    let year = era_year + ERA_OFFSET;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| CoreError::validation(format!("invalid legacy date: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_digit_form_converts_correctly() {
        // era year 112 (= 2023), month 5, day 1
        let d = convert_legacy_date("1120501").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
    }

    #[test]
    fn short_era_year_still_parses() {
        // era year 99 (= 2010), month 1, day 15
        let d = convert_legacy_date("990115").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2010, 1, 15).unwrap());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(convert_legacy_date("99").is_err());
    }

    #[test]
    fn nonsense_date_is_rejected() {
        assert!(convert_legacy_date("1121399").is_err());
    }
}
