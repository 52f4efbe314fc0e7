use std::str::FromStr;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{Result, ToolError};
use crate::schema::{CURRENCY_SCALE, FieldKind};

/// A single spreadsheet cell. Amounts are kept as decimals end to end so
/// currency figures never pass through binary floating point in the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellValue {
    /// Blank cell or absent JSON field.
    #[default]
    Empty,
    /// Decimal number.
    Number(Decimal),
    /// Text literal.
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Converts the value into the representation declared for `column`.
    ///
    /// Numbers become their decimal rendering when text is expected, and text
    /// is parsed when an amount is expected. Blank text collapses to
    /// [`CellValue::Empty`].
    pub fn coerce(self, kind: FieldKind, column: &str) -> Result<Self> {
        Ok(match (self, kind) {
            (CellValue::Text(value), _) if value.trim().is_empty() => CellValue::Empty,
            (CellValue::Number(value), FieldKind::Text) => CellValue::Text(value.to_string()),
            (CellValue::Text(value), FieldKind::Amount | FieldKind::Currency) => {
                CellValue::Number(parse_decimal(value.trim(), column)?)
            }
            (other, _) => other,
        })
    }

    /// Pads numbers of [`FieldKind::Currency`] columns to the currency scale.
    /// Other values are returned unchanged.
    pub fn scaled_for(self, kind: FieldKind) -> Self {
        match (self, kind) {
            (CellValue::Number(value), FieldKind::Currency) => {
                CellValue::Number(currency_scale(value))
            }
            (other, _) => other,
        }
    }

    /// Returns the value as text, rendering numbers in decimal notation.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(value) => Some(value.to_string()),
            CellValue::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }

    /// Returns the value as a decimal, parsing text where necessary.
    pub fn as_amount(&self, column: &str) -> Result<Option<Decimal>> {
        match self {
            CellValue::Empty => Ok(None),
            CellValue::Number(value) => Ok(Some(*value)),
            CellValue::Text(value) if value.trim().is_empty() => Ok(None),
            CellValue::Text(value) => parse_decimal(value.trim(), column).map(Some),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Number(value) => {
                rust_decimal::serde::arbitrary_precision::serialize(value, serializer)
            }
            CellValue::Text(value) => serializer.serialize_str(value),
        }
    }
}

/// Parses a decimal literal, accepting scientific notation as produced by
/// some JSON writers.
pub fn parse_decimal(value: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| ToolError::InvalidLiteral {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Widens `value` to at least [`CURRENCY_SCALE`] decimal places without
/// changing it, so `2360` renders as `2360.00`.
pub fn currency_scale(mut value: Decimal) -> Decimal {
    if value.scale() < CURRENCY_SCALE {
        value.rescale(CURRENCY_SCALE);
    }
    value
}

/// Taxpayer identity and turnover figures placed in the document envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnIdentity {
    pub gstin: String,
    pub fp: String,
    pub gt: Decimal,
    pub cur_gt: Decimal,
}

impl ReturnIdentity {
    /// Validates the operator supplied identity. Turnover defaults to `0.00`.
    pub fn new(gstin: impl Into<String>, fp: impl Into<String>) -> Result<Self> {
        let gstin = gstin.into().trim().to_string();
        let fp = fp.into().trim().to_string();
        if gstin.is_empty() {
            return Err(ToolError::InvalidIdentity("GSTIN must not be empty".into()));
        }
        if fp.is_empty() {
            return Err(ToolError::InvalidIdentity(
                "filing period must not be empty".into(),
            ));
        }
        Ok(Self {
            gstin,
            fp,
            gt: Decimal::new(0, 2),
            cur_gt: Decimal::new(0, 2),
        })
    }

    pub fn with_turnover(mut self, gt: Decimal, cur_gt: Decimal) -> Self {
        self.gt = gt;
        self.cur_gt = cur_gt;
        self
    }
}

/// A complete GSTR-1 return as exchanged with the filing portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnDocument {
    pub gstin: String,
    pub fp: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub gt: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cur_gt: Decimal,
    pub b2b: Vec<B2bGroup>,
    pub b2cs: Vec<SummaryRecord>,
    pub hsn: HsnSection,
    pub doc_issue: DocIssueSection,
}

impl ReturnDocument {
    /// Creates an envelope without any records.
    pub fn empty(identity: &ReturnIdentity) -> Self {
        Self {
            gstin: identity.gstin.clone(),
            fp: identity.fp.clone(),
            gt: identity.gt,
            cur_gt: identity.cur_gt,
            b2b: Vec::new(),
            b2cs: Vec::new(),
            hsn: HsnSection::default(),
            doc_issue: DocIssueSection::default(),
        }
    }

    pub fn line_item_count(&self) -> usize {
        self.b2b
            .iter()
            .flat_map(|group| &group.inv)
            .map(|invoice| invoice.itms.len())
            .sum()
    }
}

/// Invoices issued to one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct B2bGroup {
    pub ctin: String,
    pub inv: Vec<Invoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub inum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idt: Option<String>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub val: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rchrg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inv_typ: Option<String>,
    pub itms: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub num: Option<Decimal>,
    pub itm_det: ItemDetail,
}

/// Tax breakdown of a line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemDetail {
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub txval: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rt: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub iamt: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub camt: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub samt: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub csamt: Option<Decimal>,
}

/// A flat B2CS or HSN record. Fields keep the order in which they were read
/// so that tables built from them preserve the source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryRecord {
    fields: Vec<(String, CellValue)>,
}

impl SummaryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field. New fields are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: CellValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(name, _)| *name == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for SummaryRecord {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut record = SummaryRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for SummaryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let present: Vec<_> = self.fields.iter().filter(|(_, v)| !v.is_empty()).collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (key, value) in present {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Envelope around the HSN summary rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HsnSection {
    pub data: Vec<SummaryRecord>,
}

/// Envelope around the document issuance groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocIssueSection {
    pub doc_det: Vec<DocIssueGroup>,
}

/// Document ranges of one document type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocIssueGroup {
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub doc_num: Option<Decimal>,
    pub doc_typ: String,
    pub docs: Vec<DocRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocRange {
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub num: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub totnum: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cancel: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_issue: Option<Decimal>,
}
