//! Grouping and summation of the B2CS and HSN summary tables.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, ToolError};
use crate::flatten::{ReturnTables, SheetTable};
use crate::model::CellValue;
use crate::schema::{self, FieldRole, SummarySchema};

/// Aggregates the summary groups of `tables`. B2B and Doc Issue rows are
/// returned untouched.
pub fn aggregate_returns(tables: ReturnTables) -> Result<ReturnTables> {
    Ok(ReturnTables {
        b2cs: aggregate(&tables.b2cs, &schema::B2CS)?,
        hsn: aggregate(&tables.hsn, &schema::HSN)?,
        ..tables
    })
}

/// Collapses rows sharing the schema's key tuple into one row.
///
/// Sum columns are added up, every other column keeps the value of the first
/// row of its group. Groups come out in ascending key order and the column
/// order of `table` is kept. When the schema declares a serial column it is
/// renumbered 1..N in output order.
pub fn aggregate(table: &SheetTable, schema: &SummarySchema) -> Result<SheetTable> {
    let key_positions: Vec<Option<usize>> = schema
        .key_columns()
        .map(|column| table.column_index(column))
        .collect();
    let roles: Vec<FieldRole> = table
        .columns
        .iter()
        .map(|column| schema.role_of(column))
        .collect();

    let mut groups: BTreeMap<Vec<CellValue>, Vec<CellValue>> = BTreeMap::new();
    for row in &table.rows {
        let key: Vec<CellValue> = key_positions
            .iter()
            .map(|idx| idx.and_then(|idx| row.get(idx)).cloned().unwrap_or_default())
            .collect();

        match groups.get_mut(&key) {
            Some(merged) => accumulate(merged, row, &roles, &table.columns)?,
            None => {
                groups.insert(key, row.clone());
            }
        }
    }

    let mut rows: Vec<Vec<CellValue>> = groups.into_values().collect();
    if let Some(idx) = schema.serial_column().and_then(|c| table.column_index(c)) {
        for (position, row) in rows.iter_mut().enumerate() {
            row[idx] = CellValue::Number((position as u64 + 1).into());
        }
    }

    debug!(
        sheet = %table.sheet_name,
        input_rows = table.rows.len(),
        output_rows = rows.len(),
        "aggregated summary table"
    );

    Ok(SheetTable {
        sheet_name: table.sheet_name.clone(),
        columns: table.columns.clone(),
        rows,
    })
}

fn accumulate(
    merged: &mut [CellValue],
    row: &[CellValue],
    roles: &[FieldRole],
    columns: &[String],
) -> Result<()> {
    for (idx, role) in roles.iter().enumerate() {
        if *role != FieldRole::Sum {
            continue;
        }
        let incoming = row.get(idx).unwrap_or(&CellValue::Empty);
        let next = match (&merged[idx], incoming) {
            (current, CellValue::Empty) => current.clone(),
            (CellValue::Empty, CellValue::Number(value)) => CellValue::Number(*value),
            (CellValue::Number(lhs), CellValue::Number(rhs)) => CellValue::Number(
                lhs.checked_add(*rhs)
                    .ok_or_else(|| ToolError::Arithmetic(columns[idx].clone()))?,
            ),
            (CellValue::Text(value), _) | (_, CellValue::Text(value)) => {
                return Err(ToolError::InvalidLiteral {
                    column: columns[idx].clone(),
                    value: value.clone(),
                });
            }
        };
        merged[idx] = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn num(value: Decimal) -> CellValue {
        CellValue::Number(value)
    }

    fn b2cs_row(rt: Decimal, pos: &str, txval: Decimal) -> [(&'static str, CellValue); 5] {
        [
            ("sply_ty", CellValue::text("INTRA")),
            ("rt", num(rt)),
            ("typ", CellValue::text("OE")),
            ("pos", CellValue::text(pos)),
            ("txval", num(txval)),
        ]
    }

    fn b2cs_table(rows: &[(Decimal, &str, Decimal)]) -> SheetTable {
        let mut table = SheetTable::new(schema::B2CS_SHEET);
        for (rt, pos, txval) in rows {
            table.push_record(b2cs_row(*rt, pos, *txval));
        }
        table
    }

    fn hsn_table() -> SheetTable {
        let mut table = SheetTable::new(schema::HSN_SHEET);
        for (num_value, code, uqc, desc, qty) in [
            (7, "8471", "NOS", "Laptops", dec!(2)),
            (8, "8471", "NOS", "Notebooks", dec!(3)),
            (9, "9983", "NA", "Services", dec!(1)),
        ] {
            table.push_record([
                ("num", num(num_value.into())),
                ("hsn_sc", CellValue::text(code)),
                ("desc", CellValue::text(desc)),
                ("uqc", CellValue::text(uqc)),
                ("qty", num(qty)),
                ("rt", num(dec!(18))),
            ]);
        }
        table
    }

    #[test]
    fn sums_values_of_the_same_key() {
        let table = b2cs_table(&[
            (dec!(18), "27", dec!(5)),
            (dec!(18), "27", dec!(10)),
            (dec!(18), "27", dec!(7)),
        ]);

        let aggregated = aggregate(&table, &schema::B2CS).unwrap();

        assert_eq!(aggregated.rows.len(), 1);
        assert_eq!(aggregated.cell(&aggregated.rows[0], "txval"), &num(dec!(22)));
    }

    #[test]
    fn keeps_column_order_and_sorts_groups_by_key() {
        let table = b2cs_table(&[
            (dec!(18), "29", dec!(1)),
            (dec!(5), "27", dec!(2)),
            (dec!(18), "27", dec!(3)),
            (dec!(18), "29", dec!(4)),
        ]);

        let aggregated = aggregate(&table, &schema::B2CS).unwrap();

        assert_eq!(aggregated.columns, table.columns);
        let summary: Vec<_> = aggregated
            .rows
            .iter()
            .map(|row| {
                (
                    aggregated.cell(row, "rt").clone(),
                    aggregated.cell(row, "pos").clone(),
                    aggregated.cell(row, "txval").clone(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (num(dec!(5)), CellValue::text("27"), num(dec!(2))),
                (num(dec!(18)), CellValue::text("27"), num(dec!(3))),
                (num(dec!(18)), CellValue::text("29"), num(dec!(5))),
            ]
        );
    }

    #[test]
    fn keys_are_unique_after_aggregation() {
        let table = b2cs_table(&[
            (dec!(18), "27", dec!(1)),
            (dec!(18.0), "27", dec!(1)),
            (dec!(12), "27", dec!(1)),
            (dec!(12), "24", dec!(1)),
            (dec!(12), "27", dec!(1)),
        ]);

        let aggregated = aggregate(&table, &schema::B2CS).unwrap();

        let keys: Vec<Vec<CellValue>> = aggregated
            .rows
            .iter()
            .map(|row| {
                schema::B2CS
                    .key_columns()
                    .map(|column| aggregated.cell(row, column).clone())
                    .collect()
            })
            .collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn hsn_groups_are_renumbered_densely() {
        let aggregated = aggregate(&hsn_table(), &schema::HSN).unwrap();

        assert_eq!(aggregated.rows.len(), 2);
        let serials: Vec<_> = aggregated
            .rows
            .iter()
            .map(|row| aggregated.cell(row, "num").clone())
            .collect();
        assert_eq!(serials, vec![num(dec!(1)), num(dec!(2))]);

        let first = &aggregated.rows[0];
        assert_eq!(aggregated.cell(first, "qty"), &num(dec!(5)));
        assert_eq!(aggregated.cell(first, "desc"), &CellValue::text("Laptops"));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let once = aggregate(&hsn_table(), &schema::HSN).unwrap();
        let twice = aggregate(&once, &schema::HSN).unwrap();
        assert_eq!(once, twice);

        let b2cs = b2cs_table(&[(dec!(18), "27", dec!(5)), (dec!(18), "27", dec!(10))]);
        let once = aggregate(&b2cs, &schema::B2CS).unwrap();
        assert_eq!(aggregate(&once, &schema::B2CS).unwrap(), once);
    }

    #[test]
    fn empty_cells_do_not_contribute_to_sums() {
        let mut table = SheetTable::new(schema::B2CS_SHEET);
        table.push_record(b2cs_row(dec!(18), "27", dec!(5)));
        table.push_record([
            ("sply_ty", CellValue::text("INTRA")),
            ("rt", num(dec!(18))),
            ("typ", CellValue::text("OE")),
            ("pos", CellValue::text("27")),
            ("csamt", num(dec!(1.5))),
        ]);

        let aggregated = aggregate(&table, &schema::B2CS).unwrap();

        let row = &aggregated.rows[0];
        assert_eq!(aggregated.cell(row, "txval"), &num(dec!(5)));
        assert_eq!(aggregated.cell(row, "csamt"), &num(dec!(1.5)));
    }

    #[test]
    fn empty_table_stays_empty() {
        let table = SheetTable::new(schema::HSN_SHEET);
        let aggregated = aggregate(&table, &schema::HSN).unwrap();
        assert!(aggregated.is_empty());
    }

    #[test]
    fn text_in_a_sum_column_is_rejected() {
        let mut table = b2cs_table(&[(dec!(18), "27", dec!(5))]);
        table.push_record([
            ("sply_ty", CellValue::text("INTRA")),
            ("rt", num(dec!(18))),
            ("typ", CellValue::text("OE")),
            ("pos", CellValue::text("27")),
            ("txval", CellValue::text("ten")),
        ]);

        let err = aggregate(&table, &schema::B2CS).unwrap_err();
        assert!(matches!(err, ToolError::InvalidLiteral { column, .. } if column == "txval"));
    }
}
