use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::aggregate::aggregate_returns;
use crate::error::{Result, ToolError};
use crate::flatten::{ReturnTables, flatten_return};
use crate::io::{excel_read, excel_write, json};
use crate::merge::merge_tables;
use crate::model::{ReturnDocument, ReturnIdentity};
use crate::unflatten::{UnflattenOptions, unflatten_return};

/// Flattens, merges and aggregates several returns into one set of tables.
pub fn combine_returns(documents: &[ReturnDocument]) -> Result<ReturnTables> {
    let flattened = documents
        .iter()
        .map(flatten_return)
        .collect::<Result<Vec<_>>>()?;
    let merged = merge_tables(flattened);
    debug!(
        b2b_rows = merged.b2b.rows.len(),
        b2cs_rows = merged.b2cs.rows.len(),
        hsn_rows = merged.hsn.rows.len(),
        doc_issue_rows = merged.doc_issue.rows.len(),
        "merged flattened returns"
    );

    if merged.is_empty() {
        return Err(ToolError::EmptyInput);
    }
    aggregate_returns(merged)
}

/// Combines one or more GSTR-1 JSON files into a single workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(inputs = inputs.len(), output = %output.display())
)]
pub fn json_to_excel(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let documents = read_documents(inputs)?;
    let tables = combine_returns(&documents)?;
    let workbook = tables.into_workbook();
    info!(sheet_count = workbook.tables.len(), "workbook constructed");
    excel_write::write_workbook(output, &workbook)
}

/// Converts an edited workbook back into a GSTR-1 JSON document.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), gstin = %identity.gstin)
)]
pub fn excel_to_json(
    input: &Path,
    output: &Path,
    identity: &ReturnIdentity,
    options: UnflattenOptions,
) -> Result<()> {
    let tables = excel_read::read_tables(input)?;
    info!(row_count = tables.row_count(), "read rows from workbook");
    if tables.is_empty() {
        return Err(ToolError::EmptyInput);
    }
    let document = unflatten_return(&tables, identity, options)?;
    json::write_return(output, &document)
}

/// Merges several GSTR-1 JSON files into one JSON document without going
/// through a workbook. The identity of the first input is used unless one is
/// given.
#[instrument(
    level = "info",
    skip_all,
    fields(inputs = inputs.len(), output = %output.display())
)]
pub fn merge_json(
    inputs: &[PathBuf],
    output: &Path,
    identity: Option<ReturnIdentity>,
    options: UnflattenOptions,
) -> Result<()> {
    let documents = read_documents(inputs)?;
    let identity = match identity {
        Some(identity) => identity,
        None => {
            let first = documents.first().ok_or(ToolError::EmptyInput)?;
            ReturnIdentity::new(first.gstin.as_str(), first.fp.as_str())?
                .with_turnover(first.gt, first.cur_gt)
        }
    };
    let tables = combine_returns(&documents)?;
    let document = unflatten_return(&tables, &identity, options)?;
    info!(
        b2b_groups = document.b2b.len(),
        hsn_records = document.hsn.data.len(),
        "merged return documents"
    );
    json::write_return(output, &document)
}

fn read_documents(inputs: &[PathBuf]) -> Result<Vec<ReturnDocument>> {
    if inputs.is_empty() {
        return Err(ToolError::EmptyInput);
    }
    inputs
        .iter()
        .map(|path| {
            if !path.exists() {
                return Err(ToolError::MissingInput(path.clone()));
            }
            let document = json::read_return(path)?;
            debug!(
                path = %path.display(),
                line_items = document.line_item_count(),
                "parsed return document"
            );
            Ok(document)
        })
        .collect()
}
