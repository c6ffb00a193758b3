//! Serial date conversion.
//!
//! Excel stores dates and times as fractional day counts ("serial" values).
//! Two base date systems exist:
//! - `Excel1900` (default on Windows; carries the Lotus 1-2-3 leap-year bug)
//! - `Excel1904` (default on older Mac versions)
//!
//! The 1904 system is offset from the 1900 system by exactly 1462 days. That
//! shift is applied **only inside this module**: callers convert through
//! [`serial_from_datetime`] / [`datetime_from_serial`] with the workbook's
//! [`DateSystem`] and must never adjust elsewhere, otherwise the shift gets
//! applied twice on one of the load/save paths.

use chrono::{Duration as TimeDelta, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Day offset between the 1900 and 1904 date systems.
pub const EXCEL_1904_EPOCH_SHIFT_DAYS: i64 = 1462;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Excel workbook date system used to interpret serial date values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DateSystem {
    #[serde(rename = "excel1900")]
    #[default]
    Excel1900,
    #[serde(rename = "excel1904")]
    Excel1904,
}

/// Base date of the 1900 serial system.
///
/// Serial 0 maps to 1899-12-30 (OADate convention), which keeps serials ≥ 61
/// aligned with Excel despite the phantom 1900-02-29 the Lotus bug inserted
/// at serial 60.
fn serial_base() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("constant date is valid")
}

/// Convert a date-time to a serial day count in the given date system.
pub fn serial_from_datetime(dt: NaiveDateTime, system: DateSystem) -> f64 {
    let days = (dt.date() - serial_base()).num_days() as f64;
    let millis = (dt.time() - chrono::NaiveTime::MIN).num_milliseconds() as f64;
    let serial = days + millis / MILLIS_PER_DAY;
    match system {
        DateSystem::Excel1900 => serial,
        DateSystem::Excel1904 => serial - EXCEL_1904_EPOCH_SHIFT_DAYS as f64,
    }
}

/// Convert a serial day count back to a date-time.
///
/// Returns `None` when the serial is not representable (NaN, infinite, or out
/// of chrono's date range).
pub fn datetime_from_serial(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let serial = match system {
        DateSystem::Excel1900 => serial,
        DateSystem::Excel1904 => serial + EXCEL_1904_EPOCH_SHIFT_DAYS as f64,
    };

    let days = serial.floor();
    let frac = serial - days;
    if days < i32::MIN as f64 || days > i32::MAX as f64 {
        return None;
    }

    let mut date = serial_base().checked_add_signed(TimeDelta::days(days as i64))?;
    // Round the fractional day to whole milliseconds; serials produced by
    // `serial_from_datetime` round-trip exactly at this precision.
    let mut millis = (frac * MILLIS_PER_DAY).round() as i64;
    if millis >= MILLIS_PER_DAY as i64 {
        date = date.checked_add_signed(TimeDelta::days(1))?;
        millis = 0;
    }
    let time = chrono::NaiveTime::MIN + TimeDelta::milliseconds(millis);
    Some(NaiveDateTime::new(date, time))
}

/// Fractional-day count for an elapsed duration.
///
/// Durations are anchored at a fixed reference, not at the workbook epoch, so
/// no date-system shift applies.
pub fn days_from_duration(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Inverse of [`days_from_duration`], rounded to whole milliseconds.
pub fn duration_from_days(days: f64) -> TimeDelta {
    TimeDelta::milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

/// Serial value written for a duration cell.
pub fn serial_from_duration(duration: TimeDelta) -> f64 {
    days_from_duration(duration)
}

/// Duration decoded from a duration-formatted cell's serial value.
pub fn duration_from_serial(serial: f64) -> TimeDelta {
    duration_from_days(serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn serial_1900_known_values() {
        // 1900-03-01 is serial 61 in the 1900 system (past the phantom leap day).
        assert_eq!(
            serial_from_datetime(dt(1900, 3, 1, 0, 0, 0), DateSystem::Excel1900),
            61.0
        );
        // 2020-01-01 is serial 43831.
        assert_eq!(
            serial_from_datetime(dt(2020, 1, 1, 0, 0, 0), DateSystem::Excel1900),
            43831.0
        );
    }

    #[test]
    fn serial_1904_is_shifted_by_1462_days() {
        let moment = dt(2020, 1, 1, 12, 0, 0);
        let s1900 = serial_from_datetime(moment, DateSystem::Excel1900);
        let s1904 = serial_from_datetime(moment, DateSystem::Excel1904);
        assert_eq!(s1900 - s1904, EXCEL_1904_EPOCH_SHIFT_DAYS as f64);
    }

    #[test]
    fn datetime_roundtrip_both_systems() {
        let moment = dt(1987, 6, 5, 13, 45, 30);
        for system in [DateSystem::Excel1900, DateSystem::Excel1904] {
            let serial = serial_from_datetime(moment, system);
            assert_eq!(datetime_from_serial(serial, system), Some(moment));
        }
    }

    #[test]
    fn time_fraction_is_encoded() {
        let serial = serial_from_datetime(dt(2020, 1, 1, 6, 0, 0), DateSystem::Excel1900);
        assert_eq!(serial, 43831.25);
    }

    #[test]
    fn non_finite_serials_are_rejected() {
        assert_eq!(datetime_from_serial(f64::NAN, DateSystem::Excel1900), None);
        assert_eq!(
            datetime_from_serial(f64::INFINITY, DateSystem::Excel1900),
            None
        );
    }

    #[test]
    fn duration_roundtrip() {
        let d = TimeDelta::hours(26) + TimeDelta::minutes(30);
        let serial = serial_from_duration(d);
        assert!((serial - 1.104166666).abs() < 1e-6);
        assert_eq!(duration_from_serial(serial), d);
    }
}
