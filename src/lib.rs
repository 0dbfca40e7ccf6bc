//! Core library for the xlsx-merger command line application.
//!
//! The library exposes the functions a front end needs to consolidate a folder
//! of spreadsheets: [`consolidate::list_reference_columns`] to offer merge-key
//! candidates, [`consolidate::merge_folder`] to discover, load and outer-join
//! every spreadsheet under a folder, and [`consolidate::write_table`] to
//! persist the result. IO adapters live under [`io`], the table model inside
//! [`model`], and the join itself in [`merge`].

pub mod consolidate;
pub mod error;
pub mod io;
pub mod merge;
pub mod model;
pub mod options;

pub use error::{Result, ToolError};
