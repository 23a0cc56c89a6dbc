//! CSV output for the view report
//!
//! The matrix has two header rows. The first names each device type once,
//! followed by two blank cells so the name spans its three columns; the second
//! labels those columns `f` (first day), `t` (last day) and `#` (devices).

use crate::error::Result;
use crate::view::{DeviceSummary, ViewReport};
use std::path::Path;

/// Columns per device type: first day, last day, device count
pub const COLUMNS_PER_TYPE: usize = 3;

/// CSV output formatter for the view matrix
#[derive(Debug)]
pub struct CsvViewOutput<'a> {
    report: &'a ViewReport,
}

impl<'a> CsvViewOutput<'a> {
    /// Create a new CSV formatter over a view report
    pub fn new(report: &'a ViewReport) -> Self {
        Self { report }
    }

    /// Number of columns in every row
    pub fn width(&self) -> usize {
        1 + COLUMNS_PER_TYPE * self.report.device_types.len()
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn join(fields: &[String]) -> String {
        fields
            .iter()
            .map(|f| Self::escape_field(f))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Group header: each device type followed by two blank cells
    fn group_header(&self) -> String {
        let mut fields = vec![String::new()];
        for device_type in &self.report.device_types {
            fields.push(device_type.clone());
            fields.push(String::new());
            fields.push(String::new());
        }
        Self::join(&fields)
    }

    /// Sub-header: `f`, `t`, `#` under each device type
    fn sub_header(&self) -> String {
        let mut fields = vec!["id".to_string()];
        for _ in &self.report.device_types {
            fields.extend(["f", "t", "#"].map(String::from));
        }
        Self::join(&fields)
    }

    /// Format one participant row
    fn format_row(&self, participant: &str) -> String {
        let row = self.report.rows.get(participant);
        let mut fields = vec![participant.to_string()];

        for device_type in &self.report.device_types {
            let summary = row
                .and_then(|r| r.get(device_type))
                .copied()
                .unwrap_or_default();
            fields.extend(Self::summary_fields(&summary));
        }

        Self::join(&fields)
    }

    fn summary_fields(summary: &DeviceSummary) -> [String; COLUMNS_PER_TYPE] {
        let day = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        [
            day(summary.first),
            day(summary.last),
            summary.devices.to_string(),
        ]
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str(&self.group_header());
        output.push('\n');
        output.push_str(&self.sub_header());
        output.push('\n');

        for participant in self.report.rows.keys() {
            output.push_str(&self.format_row(participant));
            output.push('\n');
        }

        output
    }

    /// Write the CSV to `path`, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }
}
