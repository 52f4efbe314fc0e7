//! Declarative description of the GSTR-1 record groups.
//!
//! Every field that crosses the JSON/workbook boundary is listed here exactly
//! once together with its kind, so the flattener, the aggregator and the
//! unflattener all take their decisions from the same table instead of
//! inspecting cell contents at runtime.

/// Sheet holding business-to-business invoice line items.
pub const B2B_SHEET: &str = "B2B";
/// Sheet holding business-to-consumer summary records.
pub const B2CS_SHEET: &str = "B2CS";
/// Sheet holding the HSN summary.
pub const HSN_SHEET: &str = "HSN";
/// Sheet holding the document issuance summary.
pub const DOC_ISSUE_SHEET: &str = "Doc Issue";

/// Value written for an HSN record without a unit quantity code.
pub const MISSING_UQC: &str = "NA";

/// Minimum number of decimal places carried by monetary values rebuilt from
/// a workbook.
pub const CURRENCY_SCALE: u32 = 2;

/// How a field's value is represented once it leaves the JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Codes and identifiers. Numbers are rendered as text.
    Text,
    /// Decimal quantities and rates.
    Amount,
    /// Monetary values. Parsed like [`FieldKind::Amount`], rendered with at
    /// least [`CURRENCY_SCALE`] decimal places when read back from a sheet.
    Currency,
}

/// What the aggregator does with a field when rows are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Part of the grouping key.
    Key,
    /// Summed across the group.
    Sum,
    /// Taken from the first row of the group.
    First,
    /// Renumbered 1..N after grouping.
    Serial,
}

/// A field of a flat summary group (B2CS or HSN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryField {
    pub key: &'static str,
    pub kind: FieldKind,
    pub role: FieldRole,
}

const fn field(key: &'static str, kind: FieldKind, role: FieldRole) -> SummaryField {
    SummaryField { key, kind, role }
}

/// Field table for one of the flat summary groups. The JSON keys double as
/// column headers.
#[derive(Debug)]
pub struct SummarySchema {
    pub sheet: &'static str,
    pub fields: &'static [SummaryField],
    /// Columns that must be filled on every row read back from a workbook.
    pub required: &'static [&'static str],
    /// Fields that are filled with a literal when a record omits them.
    pub defaults: &'static [(&'static str, &'static str)],
}

impl SummarySchema {
    pub fn field(&self, key: &str) -> Option<&SummaryField> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Unknown keys are carried along as text.
    pub fn kind_of(&self, key: &str) -> FieldKind {
        self.field(key).map_or(FieldKind::Text, |field| field.kind)
    }

    /// Unknown keys keep the value of the first row of their group.
    pub fn role_of(&self, key: &str) -> FieldRole {
        self.field(key).map_or(FieldRole::First, |field| field.role)
    }

    /// Grouping key columns in key order.
    pub fn key_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|field| field.role == FieldRole::Key)
            .map(|field| field.key)
    }

    pub fn serial_column(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|field| field.role == FieldRole::Serial)
            .map(|field| field.key)
    }

    pub fn default_for(&self, key: &str) -> Option<&'static str> {
        self.defaults
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
    }
}

use FieldKind::{Amount, Currency, Text};
use FieldRole::{First, Key, Serial, Sum};

/// B2CS records, grouped on rate, supply type, place of supply and type.
pub static B2CS: SummarySchema = SummarySchema {
    sheet: B2CS_SHEET,
    fields: &[
        field("rt", Amount, Key),
        field("sply_ty", Text, Key),
        field("pos", Text, Key),
        field("typ", Text, Key),
        field("txval", Currency, Sum),
        field("iamt", Currency, Sum),
        field("camt", Currency, Sum),
        field("samt", Currency, Sum),
        field("csamt", Currency, Sum),
        field("diff_percent", Amount, First),
        field("etin", Text, First),
        field("flag", Text, First),
    ],
    required: &[],
    defaults: &[],
};

/// HSN records, grouped on code, unit quantity code and rate.
pub static HSN: SummarySchema = SummarySchema {
    sheet: HSN_SHEET,
    fields: &[
        field("hsn_sc", Text, Key),
        field("uqc", Text, Key),
        field("rt", Amount, Key),
        field("num", Amount, Serial),
        field("desc", Text, First),
        field("user_desc", Text, First),
        field("qty", Amount, Sum),
        field("val", Currency, Sum),
        field("txval", Currency, Sum),
        field("iamt", Currency, Sum),
        field("camt", Currency, Sum),
        field("samt", Currency, Sum),
        field("csamt", Currency, Sum),
    ],
    required: &["hsn_sc"],
    defaults: &[("uqc", MISSING_UQC)],
};

/// Columns of the `B2B` sheet, one per invoice or line item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum B2bColumn {
    Ctin,
    InvoiceNumber,
    InvoiceDate,
    InvoiceValue,
    PlaceOfSupply,
    ReverseCharge,
    InvoiceType,
    ItemNumber,
    TaxableValue,
    Rate,
    IntegratedTax,
    CentralTax,
    StateTax,
    Cess,
}

impl B2bColumn {
    pub const ALL: [B2bColumn; 14] = [
        B2bColumn::Ctin,
        B2bColumn::InvoiceNumber,
        B2bColumn::InvoiceDate,
        B2bColumn::InvoiceValue,
        B2bColumn::PlaceOfSupply,
        B2bColumn::ReverseCharge,
        B2bColumn::InvoiceType,
        B2bColumn::ItemNumber,
        B2bColumn::TaxableValue,
        B2bColumn::Rate,
        B2bColumn::IntegratedTax,
        B2bColumn::CentralTax,
        B2bColumn::StateTax,
        B2bColumn::Cess,
    ];

    pub fn header(self) -> &'static str {
        match self {
            B2bColumn::Ctin => "CTIN",
            B2bColumn::InvoiceNumber => "Invoice Number",
            B2bColumn::InvoiceDate => "Invoice Date",
            B2bColumn::InvoiceValue => "Invoice Value",
            B2bColumn::PlaceOfSupply => "Place of Supply",
            B2bColumn::ReverseCharge => "Reverse Charge",
            B2bColumn::InvoiceType => "Invoice Type",
            B2bColumn::ItemNumber => "Item Number",
            B2bColumn::TaxableValue => "Taxable Value",
            B2bColumn::Rate => "Rate",
            B2bColumn::IntegratedTax => "Integrated Tax Amount",
            B2bColumn::CentralTax => "Central Tax Amount",
            B2bColumn::StateTax => "State Tax Amount",
            B2bColumn::Cess => "Cess Amount",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            B2bColumn::Ctin => "ctin",
            B2bColumn::InvoiceNumber => "inum",
            B2bColumn::InvoiceDate => "idt",
            B2bColumn::InvoiceValue => "val",
            B2bColumn::PlaceOfSupply => "pos",
            B2bColumn::ReverseCharge => "rchrg",
            B2bColumn::InvoiceType => "inv_typ",
            B2bColumn::ItemNumber => "num",
            B2bColumn::TaxableValue => "txval",
            B2bColumn::Rate => "rt",
            B2bColumn::IntegratedTax => "iamt",
            B2bColumn::CentralTax => "camt",
            B2bColumn::StateTax => "samt",
            B2bColumn::Cess => "csamt",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            B2bColumn::Ctin
            | B2bColumn::InvoiceNumber
            | B2bColumn::InvoiceDate
            | B2bColumn::PlaceOfSupply
            | B2bColumn::ReverseCharge
            | B2bColumn::InvoiceType => Text,
            B2bColumn::ItemNumber | B2bColumn::Rate => Amount,
            _ => Currency,
        }
    }
}

/// Columns of the `Doc Issue` sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocIssueColumn {
    DocumentNumber,
    DocumentType,
    SerialNumber,
    From,
    To,
    TotalNumber,
    Cancelled,
    NetIssued,
}

impl DocIssueColumn {
    pub const ALL: [DocIssueColumn; 8] = [
        DocIssueColumn::DocumentNumber,
        DocIssueColumn::DocumentType,
        DocIssueColumn::SerialNumber,
        DocIssueColumn::From,
        DocIssueColumn::To,
        DocIssueColumn::TotalNumber,
        DocIssueColumn::Cancelled,
        DocIssueColumn::NetIssued,
    ];

    pub fn header(self) -> &'static str {
        match self {
            DocIssueColumn::DocumentNumber => "Document Number",
            DocIssueColumn::DocumentType => "Document Type",
            DocIssueColumn::SerialNumber => "Serial Number",
            DocIssueColumn::From => "From",
            DocIssueColumn::To => "To",
            DocIssueColumn::TotalNumber => "Total Number",
            DocIssueColumn::Cancelled => "Cancelled",
            DocIssueColumn::NetIssued => "Net Issued",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            DocIssueColumn::DocumentNumber => "doc_num",
            DocIssueColumn::DocumentType => "doc_typ",
            DocIssueColumn::SerialNumber => "num",
            DocIssueColumn::From => "from",
            DocIssueColumn::To => "to",
            DocIssueColumn::TotalNumber => "totnum",
            DocIssueColumn::Cancelled => "cancel",
            DocIssueColumn::NetIssued => "net_issue",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            DocIssueColumn::DocumentType | DocIssueColumn::From | DocIssueColumn::To => Text,
            _ => Amount,
        }
    }
}
