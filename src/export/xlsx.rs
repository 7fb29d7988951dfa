use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook};

use crate::export::workbook::{Align, CellStyle, WorkbookLayout};

fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new().set_align(FormatAlign::VerticalCenter);
    format = match style.align {
        Align::Left => format.set_align(FormatAlign::Left),
        Align::Center => format.set_align(FormatAlign::Center),
    };
    if style.bold {
        format = format.set_bold();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill));
    }
    if style.border {
        format = format
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::Black);
    }
    format
}

/// Serializes the layout into an `.xlsx` document.
pub fn render(layout: &WorkbookLayout) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    for sheet in &layout.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .with_context(|| format!("Invalid sheet name {}", sheet.name))?;
        for (column, width) in sheet.column_widths.iter().enumerate() {
            worksheet.set_column_width(column as u16, *width)?;
        }
        for (row, cells) in sheet.rows.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                let format = to_format(&cell.style);
                if cell.value.is_empty() {
                    worksheet.write_blank(row as u32, column as u16, &format)?;
                } else {
                    worksheet.write_string_with_format(
                        row as u32,
                        column as u16,
                        &cell.value,
                        &format,
                    )?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        export::{holidays::FrenchHolidays, workbook::build_workbook},
        store::entities::{Settings, TaskEntity, TaskId},
    };

    #[test]
    fn test_render_zip_container() {
        let mut task = TaskEntity::new(
            TaskId(1),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            "Audit".into(),
            "Support".into(),
        );
        task.elapsed_time = 4000;
        let layout = build_workbook(&[task], &Settings::default(), 2024, &FrenchHolidays);

        let bytes = render(&layout).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
