use chrono::{Datelike, Duration, NaiveDate};

/// Days off that are not weekends. Workbook exports leave them blank.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

impl<T: HolidayCalendar + ?Sized> HolidayCalendar for &T {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        (**self).is_holiday(date)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Public holidays of metropolitan France.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrenchHolidays;

const FIXED_HOLIDAYS: [(u32, u32); 8] = [
    (1, 1),
    (5, 1),
    (5, 8),
    (7, 14),
    (8, 15),
    (11, 1),
    (11, 11),
    (12, 25),
];

impl HolidayCalendar for FrenchHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        if FIXED_HOLIDAYS.contains(&(date.month(), date.day())) {
            return true;
        }
        let Some(easter) = easter_sunday(date.year()) else {
            return false;
        };
        // Easter Monday, Ascension, Whit Monday
        [1, 39, 50]
            .into_iter()
            .any(|offset| easter + Duration::days(offset) == date)
    }
}

/// Gregorian computus.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
        assert_eq!(easter_sunday(2019), Some(date(2019, 4, 21)));
    }

    #[test]
    fn test_french_holidays() {
        let calendar = FrenchHolidays;
        assert!(calendar.is_holiday(date(2024, 1, 1)));
        assert!(calendar.is_holiday(date(2024, 7, 14)));
        assert!(calendar.is_holiday(date(2024, 4, 1)));
        assert!(calendar.is_holiday(date(2024, 5, 9)));
        assert!(calendar.is_holiday(date(2024, 5, 20)));
        assert!(!calendar.is_holiday(date(2024, 3, 31)));
        assert!(!calendar.is_holiday(date(2024, 1, 2)));
        assert!(!NoHolidays.is_holiday(date(2024, 1, 1)));
    }
}
