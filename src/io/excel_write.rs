use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Table, TableColumn, Workbook};

use crate::error::{Result, ToolError};
use crate::flatten::WorkbookData;
use crate::io::write_atomically;
use crate::model::CellValue;

/// Writes the provided workbook data to the given path. Text cells are
/// written as strings so codes such as `uqc` or `pos` keep their form.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let sheet_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(value) => {
                        worksheet.write_string(sheet_row, col_idx as u16, value)?;
                    }
                    CellValue::Number(value) => {
                        let number = value.to_f64().ok_or_else(|| ToolError::InvalidLiteral {
                            column: table.columns[col_idx].clone(),
                            value: value.to_string(),
                        })?;
                        worksheet.write_number(sheet_row, col_idx as u16, number)?;
                    }
                }
            }
        }

        let columns: Vec<TableColumn> = table
            .columns
            .iter()
            .map(|header| TableColumn::new().set_header(header))
            .collect();
        let mut excel_table = Table::new();
        excel_table.set_autofilter(true).set_columns(&columns);

        let col_end = (table.columns.len() as u16).saturating_sub(1);
        let row_end = if table.rows.is_empty() {
            0
        } else {
            table.rows.len() as u32
        };
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
        worksheet.autofit();
    }

    let buffer = workbook_writer.save_to_buffer()?;
    write_atomically(path, &buffer)
}
