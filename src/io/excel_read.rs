use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use rust_decimal::Decimal;

use crate::error::{Result, ToolError};
use crate::flatten::{ReturnTables, SheetTable};
use crate::model::{CellValue, parse_decimal};
use crate::schema::{B2B_SHEET, B2CS_SHEET, DOC_ISSUE_SHEET, HSN_SHEET};

/// Date layout of invoice dates in the portal JSON.
const PORTAL_DATE_FORMAT: &str = "%d-%m-%Y";

/// Reads the four record group sheets from a workbook following the
/// conventions produced by the [`excel_write`](crate::io::excel_write)
/// module. A missing sheet yields an empty table.
pub fn read_tables(path: &Path) -> Result<ReturnTables> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let mut tables = ReturnTables::default();
    for (name, table) in [
        (B2B_SHEET, &mut tables.b2b),
        (B2CS_SHEET, &mut tables.b2cs),
        (HSN_SHEET, &mut tables.hsn),
        (DOC_ISSUE_SHEET, &mut tables.doc_issue),
    ] {
        if let Some(sheet) = read_optional_sheet(&mut workbook, name)? {
            *table = sheet;
        }
    }

    Ok(tables)
}

fn read_optional_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Option<SheetTable>> {
    match workbook.worksheet_range(name) {
        None => Ok(None),
        Some(range) => {
            let range = range.map_err(ToolError::from)?;
            range_to_table(name, &range).map(Some)
        }
    }
}

fn range_to_table(name: &str, range: &calamine::Range<DataType>) -> Result<SheetTable> {
    let headers: Vec<String> = match range.rows().next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_string(Some(cell)).trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut table = SheetTable::new(name);
    let mut positions = Vec::with_capacity(headers.len());
    for header in &headers {
        if header.is_empty() {
            positions.push(None);
            continue;
        }
        if table.column_index(header).is_some() {
            return Err(ToolError::InvalidWorkbook(format!(
                "duplicate column '{header}' in sheet '{name}'"
            )));
        }
        positions.push(Some(table.ensure_column(header)));
    }

    for row in range.rows().skip(1) {
        let mut cells = vec![CellValue::Empty; table.columns.len()];
        for (col_idx, cell) in row.iter().enumerate() {
            let Some(Some(position)) = positions.get(col_idx) else {
                continue;
            };
            cells[*position] = cell_to_value(cell, &table.columns[*position])?;
        }
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        table.rows.push(cells);
    }

    Ok(table)
}

fn cell_to_value(cell: &DataType, column: &str) -> Result<CellValue> {
    Ok(match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(value) if value.trim().is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Int(value) => CellValue::Number(Decimal::from(*value)),
        // `f64` display is the shortest representation that round trips,
        // which keeps values such as 0.1 free of binary noise.
        DataType::Float(value) => CellValue::Number(parse_decimal(&value.to_string(), column)?),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::DateTime(_) | DataType::DateTimeIso(_) => match cell.as_date() {
            Some(date) => CellValue::Text(date.format(PORTAL_DATE_FORMAT).to_string()),
            None => {
                return Err(ToolError::InvalidLiteral {
                    column: column.to_string(),
                    value: cell_to_string(Some(cell)),
                });
            }
        },
        other => CellValue::Text(cell_to_string(Some(other))),
    })
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
