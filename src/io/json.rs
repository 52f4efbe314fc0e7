use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{Result, ToolError};
use crate::io::write_atomically;
use crate::model::{
    B2bGroup, CellValue, DocIssueGroup, DocIssueSection, DocRange, HsnSection, Invoice,
    ItemDetail, LineItem, ReturnDocument, SummaryRecord, parse_decimal,
};
use crate::schema::{self, FieldKind, SummarySchema};

/// Reads and parses a GSTR-1 JSON document from disk.
pub fn read_return(path: &Path) -> Result<ReturnDocument> {
    let source = fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&source)?;
    parse_return(&json)
}

/// Serialises the document with four space indentation and replaces `path`
/// only once the whole payload has been produced.
pub fn write_return(path: &Path, document: &ReturnDocument) -> Result<()> {
    let bytes = to_pretty_json(document)?;
    write_atomically(path, &bytes)
}

pub fn to_pretty_json(document: &ReturnDocument) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Parses a GSTR-1 JSON value into a [`ReturnDocument`].
///
/// Record groups that are missing or `null` are treated as empty. Grouping
/// keys (`ctin`, `inum`, `doc_typ`) and the nested `itm_det` object are
/// required.
pub fn parse_return(document: &Value) -> Result<ReturnDocument> {
    let root = as_object(document, "$")?;

    let b2b = array_field(root, "b2b", "$")?
        .iter()
        .enumerate()
        .map(|(idx, entry)| parse_b2b_group(entry, &format!("$.b2b[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    let b2cs = array_field(root, "b2cs", "$")?
        .iter()
        .enumerate()
        .map(|(idx, entry)| parse_summary(entry, &schema::B2CS, &format!("$.b2cs[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    let hsn = match object_field(root, "hsn", "$")? {
        Some(section) => array_field(section, "data", "$.hsn")?
            .iter()
            .enumerate()
            .map(|(idx, entry)| parse_summary(entry, &schema::HSN, &format!("$.hsn.data[{idx}]")))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let doc_det = match object_field(root, "doc_issue", "$")? {
        Some(section) => array_field(section, "doc_det", "$.doc_issue")?
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                parse_doc_issue_group(entry, &format!("$.doc_issue.doc_det[{idx}]"))
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(ReturnDocument {
        gstin: optional_text(root, "gstin", "$")?.unwrap_or_default(),
        fp: optional_text(root, "fp", "$")?.unwrap_or_default(),
        gt: optional_amount(root, "gt", "$")?.unwrap_or(Decimal::new(0, 2)),
        cur_gt: optional_amount(root, "cur_gt", "$")?.unwrap_or(Decimal::new(0, 2)),
        b2b,
        b2cs,
        hsn: HsnSection { data: hsn },
        doc_issue: DocIssueSection { doc_det },
    })
}

fn parse_b2b_group(value: &Value, path: &str) -> Result<B2bGroup> {
    let object = as_object(value, path)?;
    let inv = array_field(object, "inv", path)?
        .iter()
        .enumerate()
        .map(|(idx, invoice)| parse_invoice(invoice, &format!("{path}.inv[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(B2bGroup {
        ctin: required_text(object, "ctin", path)?,
        inv,
    })
}

fn parse_invoice(value: &Value, path: &str) -> Result<Invoice> {
    let object = as_object(value, path)?;
    let itms = array_field(object, "itms", path)?
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_line_item(item, &format!("{path}.itms[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Invoice {
        inum: required_text(object, "inum", path)?,
        idt: optional_text(object, "idt", path)?,
        val: optional_amount(object, "val", path)?,
        pos: optional_text(object, "pos", path)?,
        rchrg: optional_text(object, "rchrg", path)?,
        inv_typ: optional_text(object, "inv_typ", path)?,
        itms,
    })
}

fn parse_line_item(value: &Value, path: &str) -> Result<LineItem> {
    let object = as_object(value, path)?;
    let detail_path = format!("{path}.itm_det");
    let detail = match object.get("itm_det") {
        Some(detail) => as_object(detail, &detail_path)?,
        None => return Err(ToolError::schema(detail_path, "missing item details")),
    };

    Ok(LineItem {
        num: optional_amount(object, "num", path)?,
        itm_det: ItemDetail {
            txval: optional_amount(detail, "txval", &detail_path)?,
            rt: optional_amount(detail, "rt", &detail_path)?,
            iamt: optional_amount(detail, "iamt", &detail_path)?,
            camt: optional_amount(detail, "camt", &detail_path)?,
            samt: optional_amount(detail, "samt", &detail_path)?,
            csamt: optional_amount(detail, "csamt", &detail_path)?,
        },
    })
}

fn parse_summary(value: &Value, schema: &SummarySchema, path: &str) -> Result<SummaryRecord> {
    let object = as_object(value, path)?;
    let mut record = SummaryRecord::new();
    for (key, value) in object {
        let cell = scalar_to_cell(value, &format!("{path}.{key}"))?;
        record.insert(key.clone(), cell.coerce(schema.kind_of(key), key)?);
    }
    Ok(record)
}

fn parse_doc_issue_group(value: &Value, path: &str) -> Result<DocIssueGroup> {
    let object = as_object(value, path)?;
    let docs = array_field(object, "docs", path)?
        .iter()
        .enumerate()
        .map(|(idx, range)| parse_doc_range(range, &format!("{path}.docs[{idx}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(DocIssueGroup {
        doc_num: optional_amount(object, "doc_num", path)?,
        doc_typ: required_text(object, "doc_typ", path)?,
        docs,
    })
}

fn parse_doc_range(value: &Value, path: &str) -> Result<DocRange> {
    let object = as_object(value, path)?;
    Ok(DocRange {
        num: optional_amount(object, "num", path)?,
        from: optional_text(object, "from", path)?,
        to: optional_text(object, "to", path)?,
        totnum: optional_amount(object, "totnum", path)?,
        cancel: optional_amount(object, "cancel", path)?,
        net_issue: optional_amount(object, "net_issue", path)?,
    })
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ToolError::schema(path, format!("expected object, found {}", kind(value))))
}

fn array_field<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a [Value]> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ToolError::schema(
            format!("{path}.{key}"),
            format!("expected array, found {}", kind(other)),
        )),
    }
}

fn object_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_object(value, &format!("{path}.{key}")).map(Some),
    }
}

fn field_cell(object: &Map<String, Value>, key: &str, path: &str) -> Result<CellValue> {
    match object.get(key) {
        Some(value) => scalar_to_cell(value, &format!("{path}.{key}")),
        None => Ok(CellValue::Empty),
    }
}

fn required_text(object: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    optional_text(object, key, path)?
        .ok_or_else(|| ToolError::schema(format!("{path}.{key}"), "required field is missing"))
}

fn optional_text(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<String>> {
    Ok(field_cell(object, key, path)?
        .coerce(FieldKind::Text, key)?
        .as_text())
}

fn optional_amount(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<Decimal>> {
    field_cell(object, key, path)?.as_amount(key)
}

/// Converts a JSON scalar into a cell. Numbers keep their literal decimal
/// representation.
fn scalar_to_cell(value: &Value, path: &str) -> Result<CellValue> {
    match value {
        Value::Null => Ok(CellValue::Empty),
        Value::String(text) => Ok(CellValue::Text(text.clone())),
        Value::Number(number) => parse_decimal(&number.to_string(), path).map(CellValue::Number),
        Value::Bool(flag) => Ok(CellValue::Text(flag.to_string())),
        other => Err(ToolError::schema(
            path,
            format!("expected scalar, found {}", kind(other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        serde_json::from_str(
            r#"{
                "gstin": "27AAAAA0000A1Z5",
                "fp": "022024",
                "gt": 0.00,
                "cur_gt": 0.00,
                "b2b": [{
                    "ctin": "29BBBBB1111B1Z6",
                    "inv": [{
                        "inum": "INV-1",
                        "idt": "01-02-2024",
                        "val": 1180.00,
                        "pos": "29",
                        "rchrg": "N",
                        "inv_typ": "R",
                        "itms": [{
                            "num": 1801,
                            "itm_det": {"txval": 1000.00, "rt": 18, "iamt": 180.00, "csamt": 0}
                        }]
                    }]
                }],
                "b2cs": [{"sply_ty": "INTRA", "rt": 18, "typ": "OE", "pos": 27, "txval": 100.10}],
                "hsn": {"data": [{"num": 1, "hsn_sc": "8471", "uqc": 12, "rt": 18, "qty": 2}]},
                "doc_issue": {"doc_det": [{
                    "doc_num": 1,
                    "doc_typ": "Invoices for outward supply",
                    "docs": [{"num": 1, "from": "INV-1", "to": "INV-9", "totnum": 9, "cancel": 1, "net_issue": 8}]
                }]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_all_groups() {
        let document = parse_return(&sample()).unwrap();

        assert_eq!(document.gstin, "27AAAAA0000A1Z5");
        let invoice = &document.b2b[0].inv[0];
        assert_eq!(invoice.inum, "INV-1");
        assert_eq!(invoice.val, Some(dec!(1180.00)));
        assert_eq!(invoice.itms[0].itm_det.iamt, Some(dec!(180.00)));
        assert_eq!(invoice.itms[0].itm_det.camt, None);

        let b2cs = &document.b2cs[0];
        assert_eq!(b2cs.get("pos"), Some(&CellValue::text("27")));
        assert_eq!(b2cs.get("txval"), Some(&CellValue::Number(dec!(100.10))));

        let hsn = &document.hsn.data[0];
        assert_eq!(hsn.get("uqc"), Some(&CellValue::text("12")));

        let doc_group = &document.doc_issue.doc_det[0];
        assert_eq!(doc_group.doc_num, Some(dec!(1)));
        assert_eq!(doc_group.docs[0].net_issue, Some(dec!(8)));
    }

    #[test]
    fn missing_groups_are_empty() {
        let document = parse_return(&json!({"gstin": "X", "fp": "012024"})).unwrap();
        assert!(document.b2b.is_empty());
        assert!(document.b2cs.is_empty());
        assert!(document.hsn.data.is_empty());
        assert!(document.doc_issue.doc_det.is_empty());
    }

    #[test]
    fn missing_ctin_is_a_schema_mismatch() {
        let err = parse_return(&json!({"b2b": [{"inv": []}]})).unwrap_err();
        match err {
            ToolError::SchemaMismatch { path, .. } => assert_eq!(path, "$.b2b[0].ctin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_item_details_are_a_schema_mismatch() {
        let value = json!({"b2b": [{"ctin": "C", "inv": [{"inum": "1", "itms": [{"num": 1}]}]}]});
        let err = parse_return(&value).unwrap_err();
        assert!(matches!(err, ToolError::SchemaMismatch { path, .. } if path == "$.b2b[0].inv[0].itms[0].itm_det"));
    }

    #[test]
    fn wrongly_shaped_group_is_a_schema_mismatch() {
        let err = parse_return(&json!({"hsn": [1, 2]})).unwrap_err();
        assert!(matches!(err, ToolError::SchemaMismatch { path, .. } if path == "$.hsn"));
    }

    #[test]
    fn pretty_output_keeps_decimal_literals() {
        let document = parse_return(&sample()).unwrap();
        let text = String::from_utf8(to_pretty_json(&document).unwrap()).unwrap();

        assert!(text.contains("\"gt\": 0.00"));
        assert!(text.contains("\"val\": 1180.00"));
        assert!(text.contains("\n    \"fp\""));
        assert!(!text.contains("\"camt\""));
    }
}
