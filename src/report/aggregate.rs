use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::{
    report::period::Period,
    store::entities::{Settings, TaskEntity},
    utils::percentage::{seconds_percentage, Percentage},
};

pub const TOP_TASKS: usize = 3;

pub const CHART_COLORS: [(u8, u8, u8); 10] = [
    (0x19, 0x76, 0xD2),
    (0xE5, 0x39, 0x35),
    (0x43, 0xA0, 0x47),
    (0xFB, 0x8C, 0x00),
    (0x8E, 0x24, 0xAA),
    (0x00, 0xAC, 0xC1),
    (0x39, 0x49, 0xAB),
    (0xC0, 0xCA, 0x33),
    (0x7B, 0x1F, 0xA2),
    (0x00, 0x89, 0x7B),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub das: String,
    pub seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// In the order categories first appear in the input.
    pub categories: Vec<CategoryTotal>,
    pub total: u64,
    pub work_days: usize,
    /// Negative when less than the expected time was worked.
    pub overtime: i64,
    pub top_tasks: Vec<TaskEntity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlice {
    pub das: String,
    pub seconds: u64,
    pub percentage: Percentage,
    pub color: (u8, u8, u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodaySummary {
    pub tasks: Vec<TaskEntity>,
    pub categories: Vec<CategoryTotal>,
    pub total: u64,
    /// Never negative.
    pub overtime: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub tasks: Vec<TaskEntity>,
    pub total: u64,
}

/// Aggregates `tasks` in a single pass.
pub fn summarize<'a>(
    tasks: impl IntoIterator<Item = &'a TaskEntity>,
    expected_daily_seconds: i64,
) -> Report {
    let mut index = HashMap::<&str, usize>::new();
    let mut days = HashSet::<NaiveDate>::new();
    let mut report = Report::default();
    let mut top = Vec::<&TaskEntity>::with_capacity(TOP_TASKS + 1);

    for task in tasks {
        let position = *index.entry(task.das.as_str()).or_insert_with(|| {
            report.categories.push(CategoryTotal {
                das: task.das.clone(),
                seconds: 0,
            });
            report.categories.len() - 1
        });
        report.categories[position].seconds += task.elapsed_time;
        report.total += task.elapsed_time;
        days.insert(task.date);
        push_top(&mut top, task);
    }

    report.work_days = days.len();
    report.overtime = report.total as i64 - report.work_days as i64 * expected_daily_seconds;
    report.top_tasks = top.into_iter().cloned().collect();
    report
}

/// Equal elapsed times keep their input order.
fn push_top<'a>(top: &mut Vec<&'a TaskEntity>, task: &'a TaskEntity) {
    let position = top
        .iter()
        .position(|v| v.elapsed_time < task.elapsed_time)
        .unwrap_or(top.len());
    if position < TOP_TASKS {
        top.insert(position, task);
        top.truncate(TOP_TASKS);
    }
}

pub fn report(
    tasks: &[TaskEntity],
    period: &Period,
    today: NaiveDate,
    settings: &Settings,
) -> Report {
    summarize(
        tasks.iter().filter(|v| period.contains(v.date, today)),
        settings.expected_daily_seconds(),
    )
}

/// Categories missing from the configured list are colored by their report position.
pub fn chart_slices(report: &Report, das_list: &[String]) -> Vec<ChartSlice> {
    report
        .categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let color_index = das_list
                .iter()
                .position(|v| *v == category.das)
                .unwrap_or(i);
            ChartSlice {
                das: category.das.clone(),
                seconds: category.seconds,
                percentage: seconds_percentage(category.seconds, report.total),
                color: CHART_COLORS[color_index % CHART_COLORS.len()],
            }
        })
        .collect()
}

pub fn today_summary(tasks: &[TaskEntity], today: NaiveDate, settings: &Settings) -> TodaySummary {
    let tasks = tasks
        .iter()
        .filter(|v| v.date == today)
        .cloned()
        .collect::<Vec<_>>();
    let report = summarize(&tasks, settings.expected_daily_seconds());
    let overtime = (report.total as i64 - settings.expected_daily_seconds()).max(0) as u64;
    TodaySummary {
        tasks,
        categories: report.categories,
        total: report.total,
        overtime,
    }
}

/// Newest date first, tasks of a day in store order.
pub fn history(tasks: &[TaskEntity]) -> Vec<DayGroup> {
    let mut groups = Vec::<DayGroup>::new();
    let mut index = HashMap::<NaiveDate, usize>::new();
    for task in tasks {
        let position = *index.entry(task.date).or_insert_with(|| {
            groups.push(DayGroup {
                date: task.date,
                tasks: Vec::new(),
                total: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[position];
        group.total += task.elapsed_time;
        group.tasks.push(task.clone());
    }
    groups.sort_by(|a, b| b.date.cmp(&a.date));
    groups
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::store::entities::{Settings, TaskEntity, TaskId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: i64, date: NaiveDate, das: &str, elapsed: u64) -> TaskEntity {
        let mut task = TaskEntity::new(TaskId(id), date, format!("task {id}"), das.into());
        task.elapsed_time = elapsed;
        task
    }

    fn sample() -> Vec<TaskEntity> {
        let today = date(2024, 8, 14);
        vec![
            task(1, today, "A", 3600),
            task(2, today, "A", 1800),
            task(3, today, "B", 900),
        ]
    }

    #[test]
    fn test_category_totals() {
        let report = summarize(&sample(), 8 * 3600);
        assert_eq!(
            report.categories,
            vec![
                CategoryTotal {
                    das: "A".into(),
                    seconds: 5400
                },
                CategoryTotal {
                    das: "B".into(),
                    seconds: 900
                },
            ]
        );
        assert_eq!(report.total, 6300);
        assert_eq!(report.work_days, 1);
        assert_eq!(report.overtime, 6300 - 8 * 3600);
    }

    #[test]
    fn test_category_sum_equals_total_for_every_period() {
        let today = date(2024, 8, 14);
        let tasks = vec![
            task(1, today, "A", 100),
            task(2, date(2024, 8, 12), "B", 200),
            task(3, date(2024, 8, 2), "A", 300),
            task(4, date(2024, 5, 20), "C", 400),
            task(5, date(2023, 1, 1), "B", 500),
            task(6, date(2024, 8, 20), "A", 600),
        ];
        let settings = Settings::default();
        let periods = [
            Period::Today,
            Period::Week,
            Period::Month,
            Period::SixMonths,
            Period::Custom {
                start: date(2024, 8, 2),
                end: date(2024, 8, 12),
            },
            Period::All,
        ];
        let expected_totals = [100, 300, 600, 1000, 500, 2100];
        for (period, expected) in periods.iter().zip(expected_totals) {
            let report = report(&tasks, period, today, &settings);
            let sum: u64 = report.categories.iter().map(|v| v.seconds).sum();
            assert_eq!(sum, report.total, "{period:?}");
            assert_eq!(report.total, expected, "{period:?}");
        }
    }

    #[test]
    fn test_work_days_and_negative_overtime() {
        let tasks = vec![
            task(1, date(2024, 8, 12), "A", 3600),
            task(2, date(2024, 8, 12), "A", 3600),
            task(3, date(2024, 8, 13), "B", 3600),
        ];
        let report = summarize(&tasks, 2 * 3600);
        assert_eq!(report.work_days, 2);
        assert_eq!(report.overtime, -3600);
    }

    #[test]
    fn test_top_tasks_stable_ties() {
        let day = date(2024, 8, 14);
        let tasks = vec![
            task(1, day, "A", 10),
            task(2, day, "A", 50),
            task(3, day, "A", 50),
            task(4, day, "A", 20),
            task(5, day, "A", 50),
        ];
        let report = summarize(&tasks, 0);
        let ids = report.top_tasks.iter().map(|v| v.id.0).collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 3, 5]);
    }

    #[test]
    fn test_chart_slices() {
        let report = summarize(&sample(), 0);
        let das_list = vec!["B".to_string(), "A".to_string()];
        let slices = chart_slices(&report, &das_list);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].das, "A");
        assert_eq!(slices[0].color, CHART_COLORS[1]);
        assert_eq!(slices[1].color, CHART_COLORS[0]);
        assert_eq!(slices[0].percentage.to_string(), "86%");
        assert_eq!(slices[1].percentage.to_string(), "14%");
    }

    #[test]
    fn test_today_summary_clamps_overtime() {
        let today = date(2024, 8, 14);
        let mut tasks = sample();
        tasks.push(task(4, date(2024, 8, 13), "C", 40_000));
        let settings = Settings::default();

        let summary = today_summary(&tasks, today, &settings);
        assert_eq!(summary.tasks.len(), 3);
        assert_eq!(summary.total, 6300);
        assert_eq!(summary.overtime, 0);

        tasks.push(task(5, today, "C", 8 * 3600));
        let summary = today_summary(&tasks, today, &settings);
        assert_eq!(summary.overtime, 6300);
    }

    #[test]
    fn test_history_newest_first() {
        let tasks = vec![
            task(1, date(2024, 8, 12), "A", 10),
            task(2, date(2024, 8, 14), "A", 20),
            task(3, date(2024, 8, 12), "B", 30),
        ];
        let groups = history(&tasks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, date(2024, 8, 14));
        assert_eq!(groups[0].total, 20);
        assert_eq!(groups[1].total, 40);
        let ids = groups[1].tasks.iter().map(|v| v.id.0).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3]);
    }
}
