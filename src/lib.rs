//! Core library for the gstr1-tools command line application.
//!
//! The library converts GSTR-1 returns between the portal JSON schema and a
//! multi-sheet workbook. Field definitions live in [`schema`], the typed
//! document in [`model`], the JSON to table direction in [`flatten`],
//! [`merge`] and [`aggregate`], the way back in [`unflatten`], and file
//! adapters under [`io`]. [`sync`] ties the steps together for the CLI.

pub mod aggregate;
pub mod error;
pub mod flatten;
pub mod io;
pub mod merge;
pub mod model;
pub mod schema;
pub mod sync;
pub mod unflatten;

pub use error::{Result, ToolError};
