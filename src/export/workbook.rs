//! Spreadsheet layout, independent from the file format it is written to.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::{
    export::holidays::HolidayCalendar,
    store::entities::{Settings, TaskEntity},
    utils::time::{format_seconds, is_weekend, month_end, month_name_fr, weekday_short_fr},
};

pub const TITLE_FONT_SIZE: u8 = 15;
pub const HEADER_FILL: u32 = 0x90EE90;
pub const CATEGORY_FILL: u32 = 0xE3F2FD;
pub const TOTAL_FILL: u32 = 0x000000;
pub const TOTAL_FONT_COLOR: u32 = 0xFFFFFF;
pub const DAY_OFF_FILL: u32 = 0xF5F5F5;
pub const LABEL_COLUMN_WIDTH: f64 = 15.;
pub const DAY_COLUMN_WIDTH: f64 = 12.;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
}

/// Colors are `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub bold: bool,
    pub font_size: Option<u8>,
    pub font_color: Option<u32>,
    pub fill: Option<u32>,
    pub border: bool,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: String,
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    /// Every row has one cell per column.
    pub rows: Vec<Vec<Cell>>,
    pub column_widths: Vec<f64>,
}

impl SheetLayout {
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|v| v.get(column))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookLayout {
    pub sheets: Vec<SheetLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Title,
    Blank,
    Header,
    Category,
    TableGap,
    Total,
    Overtime,
    SummaryTitle,
    Summary,
}

fn style_for(kind: RowKind, column: usize, day_off: bool) -> CellStyle {
    let mut style = CellStyle::default();
    match kind {
        RowKind::Title => {
            style.bold = true;
            style.font_size = Some(TITLE_FONT_SIZE);
            style.align = Align::Left;
        }
        RowKind::Header => {
            style.bold = true;
            style.font_color = Some(0x000000);
            style.fill = Some(HEADER_FILL);
            style.border = true;
        }
        RowKind::Category => {
            style.fill = Some(CATEGORY_FILL);
            style.border = true;
        }
        RowKind::TableGap => style.border = true,
        RowKind::Total => {
            style.bold = true;
            style.font_color = Some(TOTAL_FONT_COLOR);
            style.fill = Some(TOTAL_FILL);
            style.border = true;
        }
        RowKind::Overtime => {
            style.bold = true;
            style.border = true;
        }
        RowKind::SummaryTitle | RowKind::Summary => {
            style.bold = true;
            if column == 0 {
                style.align = Align::Left;
            }
        }
        RowKind::Blank => {}
    }
    // The total row keeps its black fill on days off
    if day_off && matches!(kind, RowKind::Category | RowKind::TableGap | RowKind::Overtime) {
        style.fill = Some(DAY_OFF_FILL);
    }
    style
}

/// Per day and per category sums for one month.
struct MonthTotals<'a> {
    by_category: HashMap<(NaiveDate, &'a str), u64>,
    by_day: HashMap<NaiveDate, u64>,
}

impl<'a> MonthTotals<'a> {
    fn collect(tasks: &'a [TaskEntity], year: i32, month: u32) -> Self {
        let mut totals = Self {
            by_category: HashMap::new(),
            by_day: HashMap::new(),
        };
        for task in tasks
            .iter()
            .filter(|v| v.date.year() == year && v.date.month() == month)
        {
            *totals
                .by_category
                .entry((task.date, task.das.as_str()))
                .or_default() += task.elapsed_time;
            *totals.by_day.entry(task.date).or_default() += task.elapsed_time;
        }
        totals
    }

    fn category(&self, date: NaiveDate, das: &str) -> u64 {
        self.by_category.get(&(date, das)).copied().unwrap_or(0)
    }

    fn day(&self, date: NaiveDate) -> u64 {
        self.by_day.get(&date).copied().unwrap_or(0)
    }
}

fn non_zero(seconds: u64) -> String {
    if seconds > 0 {
        format_seconds(seconds as i64)
    } else {
        String::new()
    }
}

/// Categories in the order they were first used.
pub fn categories(tasks: &[TaskEntity]) -> Vec<&str> {
    let mut categories = Vec::<&str>::new();
    for task in tasks {
        if !categories.contains(&task.das.as_str()) {
            categories.push(&task.das);
        }
    }
    categories
}

pub fn build_month_sheet(
    tasks: &[TaskEntity],
    settings: &Settings,
    first_day: NaiveDate,
    holidays: &impl HolidayCalendar,
) -> SheetLayout {
    let dates = first_day
        .iter_days()
        .take_while(|v| *v <= month_end(first_day))
        .collect::<Vec<_>>();
    let day_off = dates
        .iter()
        .map(|v| is_weekend(*v) || holidays.is_holiday(*v))
        .collect::<Vec<_>>();
    let working_dates = || {
        dates
            .iter()
            .zip(&day_off)
            .filter(|(_, off)| !**off)
            .map(|(date, _)| *date)
    };
    let totals = MonthTotals::collect(tasks, first_day.year(), first_day.month());
    let categories = categories(tasks);
    let expected = settings.expected_daily_seconds();
    let name = format!("{} {}", month_name_fr(first_day.month()), first_day.year());

    // Day columns show `off_value` on weekends and holidays
    let per_day = |value: &dyn Fn(NaiveDate) -> String, off_value: &str| {
        dates
            .iter()
            .zip(&day_off)
            .map(|(date, off)| {
                if *off {
                    off_value.to_string()
                } else {
                    value(*date)
                }
            })
            .collect::<Vec<_>>()
    };

    let mut rows = Vec::<(RowKind, Vec<String>)>::new();
    rows.push((
        RowKind::Title,
        vec![format!("Export des heures - {name} - {}", settings.employee_name)],
    ));
    rows.push((RowKind::Blank, vec![]));

    let mut header = vec!["DAS".to_string()];
    header.extend(dates.iter().map(|v| {
        format!(
            "{}. {:02}/{:02}",
            weekday_short_fr(v.weekday()),
            v.day(),
            v.month()
        )
    }));
    rows.push((RowKind::Header, header));

    for das in &categories {
        let mut row = vec![das.to_string()];
        row.extend(per_day(
            &|date: NaiveDate| non_zero(totals.category(date, das)),
            "",
        ));
        rows.push((RowKind::Category, row));
    }
    rows.push((RowKind::TableGap, vec![]));

    let mut total = vec!["Total".to_string()];
    total.extend(per_day(&|date: NaiveDate| non_zero(totals.day(date)), ""));
    rows.push((RowKind::Total, total));

    let mut overtime = vec!["Heures supp".to_string()];
    overtime.extend(per_day(
        &|date: NaiveDate| {
            let diff = totals.day(date) as i64 - expected;
            if diff != 0 {
                format_seconds(diff)
            } else {
                String::new()
            }
        },
        "00:00:00",
    ));
    rows.push((RowKind::Overtime, overtime));

    rows.push((RowKind::Blank, vec![]));
    rows.push((RowKind::Blank, vec![]));
    rows.push((RowKind::SummaryTitle, vec!["Totaux du mois".into()]));

    let month_overtime: i64 = working_dates()
        .map(|date| (totals.day(date) as i64 - expected).max(0))
        .sum();
    rows.push((
        RowKind::Summary,
        vec![
            "Total heures supplémentaires".into(),
            format_seconds(month_overtime),
        ],
    ));
    for das in &categories {
        let seconds: u64 = working_dates().map(|date| totals.category(date, das)).sum();
        rows.push((
            RowKind::Summary,
            vec![format!("Total {das}"), format_seconds(seconds as i64)],
        ));
    }

    let width = dates.len() + 1;
    let rows = rows
        .into_iter()
        .map(|(kind, mut values)| {
            values.resize(width, String::new());
            values
                .into_iter()
                .enumerate()
                .map(|(column, value)| {
                    let off = column > 0 && day_off[column - 1];
                    Cell {
                        value,
                        style: style_for(kind, column, off),
                    }
                })
                .collect()
        })
        .collect();

    let mut column_widths = vec![LABEL_COLUMN_WIDTH];
    column_widths.resize(width, DAY_COLUMN_WIDTH);

    SheetLayout {
        name,
        rows,
        column_widths,
    }
}

/// One sheet per month of `year`.
pub fn build_workbook(
    tasks: &[TaskEntity],
    settings: &Settings,
    year: i32,
    holidays: &impl HolidayCalendar,
) -> WorkbookLayout {
    let sheets = (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
        .map(|first_day| build_month_sheet(tasks, settings, first_day, holidays))
        .collect();
    WorkbookLayout { sheets }
}
