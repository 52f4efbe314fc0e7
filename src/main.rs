use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gstr1_tools::model::ReturnIdentity;
use gstr1_tools::sync;
use gstr1_tools::unflatten::{InvoiceGrouping, UnflattenOptions};
use gstr1_tools::{Result, ToolError};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::ToExcel(args) => {
            ensure_inputs(&args.input)?;
            sync::json_to_excel(&args.input, &args.output)
        }
        Command::ToJson(args) => {
            ensure_inputs(std::slice::from_ref(&args.input))?;
            let gstin = match args.gstin {
                Some(value) => value,
                None => prompt("Enter GSTIN: ")?,
            };
            let fp = match args.fp {
                Some(value) => value,
                None => prompt("Enter Filing Period (e.g., 022024): ")?,
            };
            let identity = ReturnIdentity::new(gstin, fp)?.with_turnover(
                args.gt.unwrap_or(Decimal::new(0, 2)),
                args.cur_gt.unwrap_or(Decimal::new(0, 2)),
            );
            sync::excel_to_json(
                &args.input,
                &args.output,
                &identity,
                options(args.regroup_invoices),
            )
        }
        Command::Merge(args) => {
            ensure_inputs(&args.input)?;
            let identity = match (args.gstin, args.fp) {
                (Some(gstin), Some(fp)) => Some(ReturnIdentity::new(gstin, fp)?),
                (None, None) => None,
                _ => {
                    return Err(ToolError::InvalidIdentity(
                        "--gstin and --fp must be given together".into(),
                    ));
                }
            };
            sync::merge_json(
                &args.input,
                &args.output,
                identity,
                options(args.regroup_invoices),
            )
        }
    }
}

fn ensure_inputs(paths: &[PathBuf]) -> Result<()> {
    match paths.iter().find(|path| !path.exists()) {
        Some(missing) => Err(ToolError::MissingInput(missing.clone())),
        None => Ok(()),
    }
}

fn options(regroup_invoices: bool) -> UnflattenOptions {
    UnflattenOptions {
        invoice_grouping: if regroup_invoices {
            InvoiceGrouping::ByInvoiceNumber
        } else {
            InvoiceGrouping::PerRow
        },
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(label.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert GSTR-1 returns between portal JSON and Excel workbooks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Combine one or more GSTR-1 JSON files into a single workbook.
    ToExcel(ToExcelArgs),
    /// Rebuild a GSTR-1 JSON file from an edited workbook.
    ToJson(ToJsonArgs),
    /// Merge several GSTR-1 JSON files into one JSON file.
    Merge(MergeArgs),
}

#[derive(clap::Args)]
struct ToExcelArgs {
    /// Input JSON file. Repeat to combine several returns.
    #[arg(long, required = true)]
    input: Vec<PathBuf>,

    /// Output workbook path.
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ToJsonArgs {
    /// Input workbook path.
    #[arg(long)]
    input: PathBuf,

    /// Output JSON file path.
    #[arg(long)]
    output: PathBuf,

    /// Taxpayer GSTIN. Prompted for when omitted.
    #[arg(long)]
    gstin: Option<String>,

    /// Filing period such as 022024. Prompted for when omitted.
    #[arg(long)]
    fp: Option<String>,

    /// Gross turnover of the previous financial year.
    #[arg(long)]
    gt: Option<Decimal>,

    /// Gross turnover of the current period.
    #[arg(long)]
    cur_gt: Option<Decimal>,

    /// Fold rows sharing CTIN and invoice number into one invoice.
    #[arg(long)]
    regroup_invoices: bool,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Input JSON file. Repeat to merge several returns.
    #[arg(long, required = true)]
    input: Vec<PathBuf>,

    /// Output JSON file path.
    #[arg(long)]
    output: PathBuf,

    /// Taxpayer GSTIN; defaults to the first input's.
    #[arg(long)]
    gstin: Option<String>,

    /// Filing period; defaults to the first input's.
    #[arg(long)]
    fp: Option<String>,

    /// Fold rows sharing CTIN and invoice number into one invoice.
    #[arg(long)]
    regroup_invoices: bool,
}
