use chrono::{Months, NaiveDate};

use crate::{
    store::entities::TaskEntity,
    utils::time::{format_date_long_fr, month_end, month_start, week_start},
};

/// Range of dates a report covers. Every bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    /// From the last Sunday through today.
    Week,
    /// From the first of the month through today.
    Month,
    /// From the same day six months ago through today.
    SixMonths,
    Custom { start: NaiveDate, end: NaiveDate },
    All,
}

impl Period {
    /// `None` means unbounded.
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            Period::Today => Some((today, today)),
            Period::Week => Some((week_start(today), today)),
            Period::Month => Some((month_start(today), today)),
            Period::SixMonths => Some((
                today
                    .checked_sub_months(Months::new(6))
                    .unwrap_or(NaiveDate::MIN),
                today,
            )),
            Period::Custom { start, end } => Some((start, end)),
            Period::All => None,
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.bounds(today) {
            Some((start, end)) => start <= date && date <= end,
            None => true,
        }
    }

    /// Human readable description of the range, in French like the rest of the exports.
    pub fn label(&self, today: NaiveDate, tasks: &[TaskEntity]) -> String {
        let range = |start: NaiveDate, end: NaiveDate| {
            format!(
                "Du {} au {}",
                format_date_long_fr(start),
                format_date_long_fr(end)
            )
        };
        match *self {
            Period::Today => format_date_long_fr(today),
            Period::Month => range(month_start(today), month_end(today)),
            Period::Week | Period::SixMonths | Period::Custom { .. } => match self.bounds(today) {
                Some((start, end)) => range(start, end),
                None => format_date_long_fr(today),
            },
            Period::All => {
                let start = tasks.iter().map(|v| v.date).min();
                let end = tasks.iter().map(|v| v.date).max();
                match start.zip(end) {
                    Some((start, end)) => range(start, end),
                    None => "Toute la période".into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::Period;
    use crate::store::entities::{TaskEntity, TaskId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bounds() {
        // Wednesday
        let today = date(2024, 8, 14);
        assert_eq!(Period::Week.bounds(today), Some((date(2024, 8, 11), today)));
        assert_eq!(Period::Month.bounds(today), Some((date(2024, 8, 1), today)));
        assert_eq!(
            Period::SixMonths.bounds(today),
            Some((date(2024, 2, 14), today))
        );
        assert_eq!(Period::All.bounds(today), None);
    }

    #[test]
    fn test_custom_is_inclusive() {
        let period = Period::Custom {
            start: date(2024, 1, 10),
            end: date(2024, 1, 12),
        };
        let today = date(2024, 8, 14);
        assert!(period.contains(date(2024, 1, 10), today));
        assert!(period.contains(date(2024, 1, 12), today));
        assert!(!period.contains(date(2024, 1, 13), today));
        assert!(!period.contains(date(2024, 1, 9), today));
    }

    #[test]
    fn test_future_dates_are_outside_month() {
        let today = date(2024, 8, 14);
        assert!(!Period::Month.contains(date(2024, 8, 15), today));
        assert!(Period::All.contains(date(2030, 1, 1), today));
    }

    #[test]
    fn test_labels() {
        let today = date(2024, 1, 15);
        assert_eq!(Period::Today.label(today, &[]), "lundi 15 janvier 2024");
        assert_eq!(
            Period::Month.label(today, &[]),
            "Du lundi 1 janvier 2024 au mercredi 31 janvier 2024"
        );
        assert_eq!(Period::All.label(today, &[]), "Toute la période");

        let tasks = [
            TaskEntity::new(TaskId(1), date(2024, 1, 3), "a".into(), "A".into()),
            TaskEntity::new(TaskId(2), date(2023, 12, 29), "b".into(), "A".into()),
        ];
        assert_eq!(
            Period::All.label(today, &tasks),
            "Du vendredi 29 décembre 2023 au mercredi 3 janvier 2024"
        );
    }
}
