//! JSON output for reports
//!
//! Reports are built from `BTreeMap`/`BTreeSet`, so keys and set members are
//! already sorted when they reach the serializer.

use crate::diff::DiffReport;
use crate::view::ViewReport;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

const INDENT: &[u8] = b"    ";

/// Serialize `value` pretty-printed with four-space indentation
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    String::from_utf8(buf)
        .map_err(|e| serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Render the diff report as two labeled JSON objects
pub fn format_diff(report: &DiffReport) -> serde_json::Result<String> {
    Ok(format!(
        "us not them: \n{}\nthem not us: \n{}\n",
        to_pretty_json(&report.us_only)?,
        to_pretty_json(&report.them_only)?
    ))
}

/// Render the view report as one JSON object keyed by participant
pub fn format_view(report: &ViewReport) -> serde_json::Result<String> {
    let mut out = to_pretty_json(&report.rows)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ParticipantDevices;
    use crate::view::DeviceSummary;
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_four_space_indent() {
        let mut map = ParticipantDevices::new();
        map.insert("K001".into(), BTreeSet::from(["BTF-02".to_string(), "BTF-01".to_string()]));

        let json = to_pretty_json(&map).unwrap();
        assert_eq!(
            json,
            "{\n    \"K001\": [\n        \"BTF-01\",\n        \"BTF-02\"\n    ]\n}"
        );
    }

    #[test]
    fn test_diff_labels_in_order() {
        let report = DiffReport::default();
        let out = format_diff(&report).unwrap();
        assert_eq!(out, "us not them: \n{}\nthem not us: \n{}\n");
    }

    #[test]
    fn test_view_dates_are_iso() {
        let summary = DeviceSummary {
            first: NaiveDate::from_ymd_opt(2021, 4, 1),
            last: NaiveDate::from_ymd_opt(2021, 4, 3),
            devices: 1,
        };
        let report = ViewReport {
            device_types: vec!["BTF".into(), "EMP".into()],
            rows: BTreeMap::from([(
                "K001".to_string(),
                BTreeMap::from([
                    ("BTF".to_string(), summary),
                    ("EMP".to_string(), DeviceSummary::default()),
                ]),
            )]),
        };

        let out = format_view(&report).unwrap();
        assert!(out.contains("\"first\": \"2021-04-01\""));
        assert!(out.contains("\"last\": \"2021-04-03\""));
        assert!(out.contains("\"first\": null"));
        assert!(out.contains("\"devices\": 0"));
    }

    #[test]
    fn test_set_round_trip() {
        let devices = BTreeSet::from(["b".to_string(), "a".to_string(), "c".to_string()]);
        let json = to_pretty_json(&devices).unwrap();
        let back: BTreeSet<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, devices);
    }
}
