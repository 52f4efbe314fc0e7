//! Concatenation of flattened returns.

use crate::flatten::{ReturnTables, SheetTable};
use crate::model::CellValue;

impl SheetTable {
    /// Appends the rows of `other`, aligning them on column names. Columns
    /// unknown to `self` are added after the existing ones.
    pub fn append(&mut self, other: SheetTable) {
        let positions: Vec<usize> = other
            .columns
            .iter()
            .map(|column| self.ensure_column(column))
            .collect();
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, CellValue::Empty);
        }

        for row in other.rows {
            let mut aligned = vec![CellValue::Empty; width];
            for (value, idx) in row.into_iter().zip(&positions) {
                aligned[*idx] = value;
            }
            self.rows.push(aligned);
        }
    }
}

/// Merges the flattened tables of several documents, in input order. Rows
/// are only concatenated; grouping is left to the aggregator.
pub fn merge_tables<I>(parts: I) -> ReturnTables
where
    I: IntoIterator<Item = ReturnTables>,
{
    parts
        .into_iter()
        .fold(ReturnTables::default(), |mut merged, part| {
            merged.b2b.append(part.b2b);
            merged.b2cs.append(part.b2cs);
            merged.hsn.append(part.hsn);
            merged.doc_issue.append(part.doc_issue);
            merged
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn append_aligns_rows_on_column_names() {
        let mut left = SheetTable::new("B2CS");
        left.push_record([("rt", CellValue::Number(dec!(18))), ("txval", CellValue::Number(dec!(5)))]);

        let mut right = SheetTable::new("B2CS");
        right.push_record([
            ("txval", CellValue::Number(dec!(10))),
            ("etin", CellValue::text("E1")),
            ("rt", CellValue::Number(dec!(12))),
        ]);

        left.append(right);

        assert_eq!(left.columns, vec!["rt", "txval", "etin"]);
        assert_eq!(
            left.rows,
            vec![
                vec![CellValue::Number(dec!(18)), CellValue::Number(dec!(5)), CellValue::Empty],
                vec![
                    CellValue::Number(dec!(12)),
                    CellValue::Number(dec!(10)),
                    CellValue::text("E1")
                ],
            ]
        );
    }

    #[test]
    fn merge_concatenates_in_document_order_without_deduplication() {
        let mut first = ReturnTables::default();
        first.b2cs.push_record([("rt", CellValue::Number(dec!(18)))]);
        let mut second = ReturnTables::default();
        second.b2cs.push_record([("rt", CellValue::Number(dec!(18)))]);
        second.b2cs.push_record([("rt", CellValue::Number(dec!(5)))]);

        let merged = merge_tables([first, second]);

        assert_eq!(merged.b2cs.rows.len(), 3);
        assert_eq!(merged.b2cs.rows[2], vec![CellValue::Number(dec!(5))]);
        assert!(merged.b2b.is_empty());
    }
}
