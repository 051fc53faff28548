//! CSV output formatting.

use crate::scanner::ScanReport;
use std::io::{self, Write};

/// Write one row per result: `target,port,open,banner`.
pub fn write_csv<W: Write>(writer: W, report: &ScanReport) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["target", "port", "open", "banner"])?;

    for result in report.results() {
        let target = result.target.to_string();
        let port = result.port.to_string();
        wtr.write_record([
            target.as_str(),
            port.as_str(),
            if result.open { "true" } else { "false" },
            result.banner_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeErrorKind;
    use crate::scanner::{HostSummary, ScanResult, ScanTask};
    use crate::types::{Port, Target};
    use chrono::Utc;

    #[test]
    fn test_csv_rows() {
        let target = Target::hostname("mail.example.com");
        let smtp = ScanTask::new(target.clone(), Port::new(25).unwrap());
        let pop = ScanTask::new(target.clone(), Port::new(110).unwrap());

        let mut report = ScanReport::new(Utc::now());
        report.push(HostSummary {
            target,
            index: 0,
            results: vec![
                ScanResult::open(&smtp, Some("220 mail, ESMTP".to_string())),
                ScanResult::closed(&pop, ProbeErrorKind::Timeout),
            ],
        });

        let mut buf = Vec::new();
        write_csv(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "target,port,open,banner",
                "mail.example.com,25,true,\"220 mail, ESMTP\"",
                "mail.example.com,110,false,",
            ]
        );
    }
}
