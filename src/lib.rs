//! rdmreport - Upload coverage reports for research-data portal exports
//!
//! This library loads a saved portal export of uploaded files and builds two
//! reports from it: a diff of which participant/device pairs were uploaded by
//! us versus others, and a per-participant view of recorded days per device
//! type, rendered as JSON or as a CSV matrix.

pub mod cli;
pub mod csv_output;
pub mod diff;
pub mod error;
pub mod json_output;
pub mod records;
pub mod settings;
pub mod view;
