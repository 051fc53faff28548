//! JSON output formatting.
//!
//! The file is one object keyed by target, in target order, each value a
//! port-ordered list of `{port, open, banner}`.

use crate::scanner::{HostSummary, ScanReport, ScanResult};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::io::{self, Write};

struct JsonHosts<'a>(&'a [HostSummary]);

impl Serialize for JsonHosts<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for host in self.0 {
            let ports: Vec<JsonPort<'_>> = host.results.iter().map(JsonPort::from).collect();
            map.serialize_entry(&host.target.to_string(), &ports)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct JsonPort<'a> {
    port: u16,
    open: bool,
    banner: &'a str,
}

impl<'a> From<&'a ScanResult> for JsonPort<'a> {
    fn from(result: &'a ScanResult) -> Self {
        Self {
            port: result.port.as_u16(),
            open: result.open,
            banner: result.banner_str(),
        }
    }
}

/// Write `report` as pretty-printed JSON.
pub fn write_json<W: Write>(writer: W, report: &ScanReport) -> io::Result<()> {
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, &JsonHosts(&report.hosts)).map_err(io::Error::from)?;
    writeln!(writer)?;
    writer.flush()
}
