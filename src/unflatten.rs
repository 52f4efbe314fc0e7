//! Reconstruction of a return document from its tabular form.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::flatten::{ReturnTables, SheetTable};
use crate::model::{
    B2bGroup, CellValue, DocIssueGroup, DocRange, Invoice, ItemDetail, LineItem, ReturnDocument,
    ReturnIdentity, SummaryRecord, currency_scale,
};
use crate::schema::{self, B2bColumn, DocIssueColumn, FieldKind, SummarySchema};

/// How rows of the `B2B` sheet are folded back into invoices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvoiceGrouping {
    /// Every row becomes its own invoice carrying a single line item. This is
    /// what the portal tooling has always produced; an invoice that was
    /// flattened into several rows comes back as several invoices.
    #[default]
    PerRow,
    /// Rows sharing a CTIN and invoice number are folded into one invoice,
    /// restoring multi-item invoices. Invoice level fields come from the
    /// first row.
    ByInvoiceNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnflattenOptions {
    pub invoice_grouping: InvoiceGrouping,
}

/// Rebuilds a [`ReturnDocument`] from the four tables and the operator
/// supplied identity.
pub fn unflatten_return(
    tables: &ReturnTables,
    identity: &ReturnIdentity,
    options: UnflattenOptions,
) -> Result<ReturnDocument> {
    let mut document = ReturnDocument::empty(identity);
    document.b2b = unflatten_b2b(&tables.b2b, options.invoice_grouping)?;
    document.b2cs = unflatten_summary(&tables.b2cs, &schema::B2CS)?;
    document.hsn.data = unflatten_summary(&tables.hsn, &schema::HSN)?;
    document.doc_issue.doc_det = unflatten_doc_issue(&tables.doc_issue)?;

    debug!(
        b2b_groups = document.b2b.len(),
        b2cs_records = document.b2cs.len(),
        hsn_records = document.hsn.data.len(),
        doc_groups = document.doc_issue.doc_det.len(),
        "rebuilt return document"
    );
    Ok(document)
}

/// A single data row together with its position in the sheet.
struct RowView<'a> {
    table: &'a SheetTable,
    cells: &'a [CellValue],
    index: usize,
}

impl<'a> RowView<'a> {
    fn rows(table: &'a SheetTable) -> impl Iterator<Item = RowView<'a>> + 'a {
        table
            .rows
            .iter()
            .enumerate()
            .map(move |(index, cells)| RowView { table, cells, index })
    }

    fn cell(&self, column: &str) -> &'a CellValue {
        self.table.cell(self.cells, column)
    }

    fn text(&self, column: &str) -> Option<String> {
        self.cell(column).as_text()
    }

    fn amount(&self, column: &str) -> Result<Option<Decimal>> {
        self.cell(column).as_amount(column)
    }

    /// Reads a `B2B` amount, widening monetary columns to the currency scale.
    fn b2b_amount(&self, column: B2bColumn) -> Result<Option<Decimal>> {
        let amount = self.amount(column.header())?;
        Ok(match column.kind() {
            FieldKind::Currency => amount.map(currency_scale),
            _ => amount,
        })
    }

    fn required_text(&self, column: &str) -> Result<String> {
        self.text(column).ok_or_else(|| ToolError::IncompleteRow {
            sheet: self.table.sheet_name.clone(),
            // Header occupies the first spreadsheet row.
            row: self.index + 2,
            column: column.to_string(),
        })
    }
}

fn unflatten_b2b(table: &SheetTable, grouping: InvoiceGrouping) -> Result<Vec<B2bGroup>> {
    let mut groups: Vec<B2bGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut invoice_index: HashMap<(usize, String), usize> = HashMap::new();

    for row in RowView::rows(table) {
        let ctin = row.required_text(B2bColumn::Ctin.header())?;
        let inum = row.required_text(B2bColumn::InvoiceNumber.header())?;
        let item = line_item(&row)?;

        let group_idx = *group_index.entry(ctin.clone()).or_insert_with(|| {
            groups.push(B2bGroup {
                ctin,
                inv: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[group_idx];

        if grouping == InvoiceGrouping::ByInvoiceNumber {
            if let Some(&invoice_idx) = invoice_index.get(&(group_idx, inum.clone())) {
                group.inv[invoice_idx].itms.push(item);
                continue;
            }
            invoice_index.insert((group_idx, inum.clone()), group.inv.len());
        }

        group.inv.push(Invoice {
            inum,
            idt: row.text(B2bColumn::InvoiceDate.header()),
            val: row.b2b_amount(B2bColumn::InvoiceValue)?,
            pos: row.text(B2bColumn::PlaceOfSupply.header()),
            rchrg: row.text(B2bColumn::ReverseCharge.header()),
            inv_typ: row.text(B2bColumn::InvoiceType.header()),
            itms: vec![item],
        });
    }

    Ok(groups)
}

fn line_item(row: &RowView<'_>) -> Result<LineItem> {
    Ok(LineItem {
        num: row.b2b_amount(B2bColumn::ItemNumber)?,
        itm_det: ItemDetail {
            txval: row.b2b_amount(B2bColumn::TaxableValue)?,
            rt: row.b2b_amount(B2bColumn::Rate)?,
            iamt: row.b2b_amount(B2bColumn::IntegratedTax)?,
            camt: row.b2b_amount(B2bColumn::CentralTax)?,
            samt: row.b2b_amount(B2bColumn::StateTax)?,
            csamt: row.b2b_amount(B2bColumn::Cess)?,
        },
    })
}

/// B2CS and HSN rows pass through as flat records, coerced to their declared
/// kinds. Blank cells are left out of the record.
fn unflatten_summary(table: &SheetTable, schema: &SummarySchema) -> Result<Vec<SummaryRecord>> {
    RowView::rows(table)
        .map(|row| {
            for column in schema.required {
                row.required_text(column)?;
            }
            let mut record = SummaryRecord::new();
            for (column, value) in table.columns.iter().zip(row.cells) {
                let kind = schema.kind_of(column);
                let mut cell = value.clone().coerce(kind, column)?.scaled_for(kind);
                if cell.is_empty() {
                    match schema.default_for(column) {
                        Some(default) => cell = CellValue::text(default),
                        None => continue,
                    }
                }
                record.insert(column.as_str(), cell);
            }
            Ok(record)
        })
        .collect()
}

fn unflatten_doc_issue(table: &SheetTable) -> Result<Vec<DocIssueGroup>> {
    let mut groups: Vec<DocIssueGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for row in RowView::rows(table) {
        let doc_typ = row.required_text(DocIssueColumn::DocumentType.header())?;
        let range = DocRange {
            num: row.amount(DocIssueColumn::SerialNumber.header())?,
            from: row.text(DocIssueColumn::From.header()),
            to: row.text(DocIssueColumn::To.header()),
            totnum: row.amount(DocIssueColumn::TotalNumber.header())?,
            cancel: row.amount(DocIssueColumn::Cancelled.header())?,
            net_issue: row.amount(DocIssueColumn::NetIssued.header())?,
        };

        match group_index.get(&doc_typ) {
            Some(&idx) => groups[idx].docs.push(range),
            None => {
                group_index.insert(doc_typ.clone(), groups.len());
                groups.push(DocIssueGroup {
                    doc_num: row.amount(DocIssueColumn::DocumentNumber.header())?,
                    doc_typ,
                    docs: vec![range],
                });
            }
        }
    }

    Ok(groups)
}
