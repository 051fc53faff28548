//! Output formatting module.
//!
//! Console reporting for live scans and JSON/CSV writers for saved
//! results. None of this feeds back into the scan.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{
    format_host_finished, format_open_line, print_error, print_success, print_warning,
    write_summary, ConsoleReporter,
};

use crate::error::{CliError, CliResult};
use crate::scanner::ScanReport;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// File format for saved results, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// `.json` or `.csv`, case-insensitively. Anything else is rejected so
    /// the mistake surfaces before the scan rather than after it.
    pub fn from_path(path: &Path) -> CliResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(CliError::UnsupportedOutput(path.to_path_buf())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Save `report` to `path` in `format`.
pub fn write_report(path: &Path, format: OutputFormat, report: &ScanReport) -> io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Json => write_json(writer, report),
        OutputFormat::Csv => write_csv(writer, report),
    }
}
