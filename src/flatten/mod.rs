use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{CellValue, DocIssueGroup, Invoice, LineItem, ReturnDocument, SummaryRecord};
use crate::schema::{self, B2B_SHEET, B2bColumn, DOC_ISSUE_SHEET, DocIssueColumn, SummarySchema};

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(sheet_name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sheet_name: sheet_name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns the index of `name`, appending the column (and padding every
    /// existing row) when the table has not seen it yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        self.columns.len() - 1
    }

    /// Appends a row given as `(column, value)` pairs. Columns not yet known
    /// are added at the end, preserving first-seen order, and earlier rows
    /// are padded so every row spans all columns.
    pub fn push_record<'a, I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (&'a str, CellValue)>,
    {
        let known = self.columns.len();
        let mut row = vec![CellValue::Empty; known];
        for (column, value) in fields {
            let idx = self.ensure_column(column);
            if idx >= row.len() {
                row.resize(idx + 1, CellValue::Empty);
            }
            row[idx] = value;
        }
        let width = self.columns.len();
        if width > known {
            for existing in &mut self.rows {
                existing.resize(width, CellValue::Empty);
            }
        }
        row.resize(width, CellValue::Empty);
        self.rows.push(row);
    }

    /// Looks up the cell of `row` under the header `column`.
    pub fn cell<'a>(&'a self, row: &'a [CellValue], column: &str) -> &'a CellValue {
        self.column_index(column)
            .and_then(|idx| row.get(idx))
            .unwrap_or(&CellValue::Empty)
    }
}

/// The four record groups of a return in tabular form.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTables {
    pub b2b: SheetTable,
    pub b2cs: SheetTable,
    pub hsn: SheetTable,
    pub doc_issue: SheetTable,
}

impl Default for ReturnTables {
    fn default() -> Self {
        Self {
            b2b: SheetTable::with_columns(B2B_SHEET, B2bColumn::ALL.map(B2bColumn::header)),
            b2cs: SheetTable::new(schema::B2CS_SHEET),
            hsn: SheetTable::new(schema::HSN_SHEET),
            doc_issue: SheetTable::with_columns(
                DOC_ISSUE_SHEET,
                DocIssueColumn::ALL.map(DocIssueColumn::header),
            ),
        }
    }
}

impl ReturnTables {
    pub fn tables(&self) -> [&SheetTable; 4] {
        [&self.b2b, &self.b2cs, &self.hsn, &self.doc_issue]
    }

    pub fn row_count(&self) -> usize {
        self.tables().iter().map(|table| table.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Keeps only the groups that carry rows; empty groups get no sheet.
    pub fn into_workbook(self) -> WorkbookData {
        let tables = [self.b2b, self.b2cs, self.hsn, self.doc_issue]
            .into_iter()
            .filter(|table| !table.is_empty())
            .collect();
        WorkbookData { tables }
    }
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Flattens a return into one table per record group, in document order.
/// No grouping happens here.
pub fn flatten_return(document: &ReturnDocument) -> Result<ReturnTables> {
    let mut tables = ReturnTables::default();

    for group in &document.b2b {
        for invoice in &group.inv {
            for item in &invoice.itms {
                let row = B2bColumn::ALL
                    .iter()
                    .map(|column| b2b_cell(*column, &group.ctin, invoice, item))
                    .collect();
                tables.b2b.rows.push(row);
            }
        }
    }

    for record in &document.b2cs {
        push_summary(&mut tables.b2cs, record, &schema::B2CS)?;
    }

    for record in &document.hsn.data {
        push_summary(&mut tables.hsn, record, &schema::HSN)?;
    }

    for group in &document.doc_issue.doc_det {
        flatten_doc_issue(&mut tables.doc_issue, group);
    }

    Ok(tables)
}

fn b2b_cell(column: B2bColumn, ctin: &str, invoice: &Invoice, item: &LineItem) -> CellValue {
    let detail = &item.itm_det;
    match column {
        B2bColumn::Ctin => CellValue::text(ctin),
        B2bColumn::InvoiceNumber => CellValue::text(invoice.inum.as_str()),
        B2bColumn::InvoiceDate => text_cell(&invoice.idt),
        B2bColumn::InvoiceValue => amount_cell(invoice.val),
        B2bColumn::PlaceOfSupply => text_cell(&invoice.pos),
        B2bColumn::ReverseCharge => text_cell(&invoice.rchrg),
        B2bColumn::InvoiceType => text_cell(&invoice.inv_typ),
        B2bColumn::ItemNumber => amount_cell(item.num),
        B2bColumn::TaxableValue => amount_cell(detail.txval),
        B2bColumn::Rate => amount_cell(detail.rt),
        B2bColumn::IntegratedTax => amount_cell(detail.iamt),
        B2bColumn::CentralTax => amount_cell(detail.camt),
        B2bColumn::StateTax => amount_cell(detail.samt),
        B2bColumn::Cess => amount_cell(detail.csamt),
    }
}

fn flatten_doc_issue(table: &mut SheetTable, group: &DocIssueGroup) {
    for range in &group.docs {
        let row = DocIssueColumn::ALL
            .iter()
            .map(|column| match column {
                DocIssueColumn::DocumentNumber => amount_cell(group.doc_num),
                DocIssueColumn::DocumentType => CellValue::text(group.doc_typ.as_str()),
                DocIssueColumn::SerialNumber => amount_cell(range.num),
                DocIssueColumn::From => text_cell(&range.from),
                DocIssueColumn::To => text_cell(&range.to),
                DocIssueColumn::TotalNumber => amount_cell(range.totnum),
                DocIssueColumn::Cancelled => amount_cell(range.cancel),
                DocIssueColumn::NetIssued => amount_cell(range.net_issue),
            })
            .collect();
        table.rows.push(row);
    }
}

/// Copies a flat record into `table`, coercing every value to its declared
/// kind and filling declared defaults (the HSN `uqc`).
fn push_summary(table: &mut SheetTable, record: &SummaryRecord, schema: &SummarySchema) -> Result<()> {
    let mut fields = Vec::with_capacity(record.len() + schema.defaults.len());
    for (key, value) in record.fields() {
        let mut cell = value.clone().coerce(schema.kind_of(key), key)?;
        if cell.is_empty() {
            if let Some(default) = schema.default_for(key) {
                cell = CellValue::text(default);
            }
        }
        fields.push((key, cell));
    }
    for &(key, default) in schema.defaults {
        if record.get(key).is_none() {
            fields.push((key, CellValue::text(default)));
        }
    }
    table.push_record(fields);
    Ok(())
}

fn text_cell(value: &Option<String>) -> CellValue {
    value.as_deref().map_or(CellValue::Empty, CellValue::text)
}

fn amount_cell(value: Option<Decimal>) -> CellValue {
    value.map_or(CellValue::Empty, CellValue::Number)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::model::{B2bGroup, ItemDetail, ReturnIdentity};

    fn item(num: i64, txval: Decimal) -> LineItem {
        LineItem {
            num: Some(num.into()),
            itm_det: ItemDetail {
                txval: Some(txval),
                rt: Some(dec!(18)),
                ..ItemDetail::default()
            },
        }
    }

    fn invoice(inum: &str, itms: Vec<LineItem>) -> Invoice {
        Invoice {
            inum: inum.to_string(),
            idt: Some("01-02-2024".into()),
            val: Some(dec!(1180)),
            pos: Some("27".into()),
            rchrg: Some("N".into()),
            inv_typ: Some("R".into()),
            itms,
        }
    }

    fn document() -> ReturnDocument {
        let identity = ReturnIdentity::new("27AAAAA0000A1Z5", "022024").unwrap();
        ReturnDocument::empty(&identity)
    }

    #[test]
    fn b2b_emits_one_row_per_line_item() {
        let mut doc = document();
        doc.b2b.push(B2bGroup {
            ctin: "29BBBBB1111B1Z6".into(),
            inv: vec![
                invoice("A-1", vec![item(1, dec!(100)), item(2, dec!(200))]),
                invoice("A-2", Vec::new()),
                invoice("A-3", vec![item(1, dec!(50))]),
            ],
        });

        let tables = flatten_return(&doc).unwrap();
        let b2b = &tables.b2b;

        assert_eq!(b2b.rows.len(), doc.line_item_count());
        assert_eq!(b2b.rows.len(), 3);
        assert_eq!(b2b.columns[0], "CTIN");
        let numbers: Vec<_> = b2b
            .rows
            .iter()
            .map(|row| b2b.cell(row, "Invoice Number").clone())
            .collect();
        assert_eq!(
            numbers,
            vec![CellValue::text("A-1"), CellValue::text("A-1"), CellValue::text("A-3")]
        );
        assert_eq!(
            b2b.cell(&b2b.rows[1], "Taxable Value"),
            &CellValue::Number(dec!(200))
        );
        assert_eq!(b2b.cell(&b2b.rows[1], "Invoice Date"), &CellValue::text("01-02-2024"));
    }

    #[test]
    fn hsn_uqc_defaults_to_na_and_is_text() {
        let mut doc = document();
        doc.hsn.data.push(
            [
                ("num", CellValue::Number(dec!(1))),
                ("hsn_sc", CellValue::text("8471")),
                ("rt", CellValue::Number(dec!(18))),
            ]
            .into_iter()
            .collect(),
        );
        doc.hsn.data.push(
            [
                ("num", CellValue::Number(dec!(2))),
                ("hsn_sc", CellValue::text("9983")),
                ("uqc", CellValue::Number(dec!(12))),
                ("rt", CellValue::Number(dec!(18))),
            ]
            .into_iter()
            .collect(),
        );

        let tables = flatten_return(&doc).unwrap();
        let hsn = &tables.hsn;

        assert_eq!(hsn.columns, vec!["num", "hsn_sc", "rt", "uqc"]);
        assert_eq!(hsn.cell(&hsn.rows[0], "uqc"), &CellValue::text("NA"));
        assert_eq!(hsn.cell(&hsn.rows[1], "uqc"), &CellValue::text("12"));
    }

    #[test]
    fn b2cs_rows_keep_source_column_order() {
        let mut doc = document();
        doc.b2cs.push(
            [
                ("sply_ty", CellValue::text("INTRA")),
                ("rt", CellValue::Number(dec!(18))),
                ("typ", CellValue::text("OE")),
                ("pos", CellValue::text("27")),
                ("txval", CellValue::Number(dec!(100))),
            ]
            .into_iter()
            .collect(),
        );

        let tables = flatten_return(&doc).unwrap();
        assert_eq!(tables.b2cs.columns, vec!["sply_ty", "rt", "typ", "pos", "txval"]);
        assert_eq!(tables.b2cs.rows.len(), 1);
    }

    #[test]
    fn doc_issue_duplicates_document_type_per_range() {
        let mut doc = document();
        doc.doc_issue.doc_det.push(DocIssueGroup {
            doc_num: Some(dec!(1)),
            doc_typ: "Invoices for outward supply".into(),
            docs: vec![
                crate::model::DocRange {
                    from: Some("A1".into()),
                    to: Some("A10".into()),
                    totnum: Some(dec!(10)),
                    ..Default::default()
                },
                crate::model::DocRange {
                    from: Some("B1".into()),
                    to: Some("B5".into()),
                    totnum: Some(dec!(5)),
                    ..Default::default()
                },
            ],
        });

        let tables = flatten_return(&doc).unwrap();
        let table = &tables.doc_issue;
        assert_eq!(table.rows.len(), 2);
        for row in &table.rows {
            assert_eq!(
                table.cell(row, "Document Type"),
                &CellValue::text("Invoices for outward supply")
            );
        }
        assert_eq!(table.cell(&table.rows[1], "From"), &CellValue::text("B1"));
    }

    #[test]
    fn document_without_invoices_produces_no_b2b_sheet() {
        let tables = flatten_return(&document()).unwrap();
        assert!(tables.b2b.is_empty());
        assert!(tables.into_workbook().tables.is_empty());
    }
}
