//! Extraction report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{SpecExtractError, SpecRecord};

/// Aggregate counters and diagnostics for one extraction run.
#[derive(Debug, Default, Clone)]
pub struct ReportExtract {
    /// Files opened and scanned.
    pub cnt_files_scanned: u64,
    /// Files rejected by the name filter.
    pub cnt_files_skipped: u64,
    /// Sheets scanned across all files.
    pub cnt_sheets_scanned: u64,
    /// Valid records produced.
    pub cnt_records: u64,
    /// Non-fatal warnings (empty result, fallbacks).
    pub warnings: Vec<String>,
    /// Per-file and per-sheet failures.
    pub errors: Vec<SpecExtractError>,
}

impl ReportExtract {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_scanned".to_string(), self.cnt_files_scanned);
        dict_counts.insert("cnt_files_skipped".to_string(), self.cnt_files_skipped);
        dict_counts.insert("cnt_sheets_scanned".to_string(), self.cnt_sheets_scanned);
        dict_counts.insert("cnt_records".to_string(), self.cnt_records);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} skipped={} sheets={} records={} errors={} warnings={}",
            dict_counts["cnt_files_scanned"],
            dict_counts["cnt_files_skipped"],
            dict_counts["cnt_sheets_scanned"],
            dict_counts["cnt_records"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportExtract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXTRACT]"))
    }
}

/// Mutable accumulator for extraction statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportExtractBuilder {
    /// See [`ReportExtract::cnt_files_scanned`].
    pub cnt_files_scanned: u64,
    /// See [`ReportExtract::cnt_files_skipped`].
    pub cnt_files_skipped: u64,
    /// See [`ReportExtract::cnt_sheets_scanned`].
    pub cnt_sheets_scanned: u64,
    /// See [`ReportExtract::cnt_records`].
    pub cnt_records: u64,
    /// See [`ReportExtract::errors`].
    pub errors: Vec<SpecExtractError>,
    /// See [`ReportExtract::warnings`].
    pub warnings: Vec<String>,
}

impl ReportExtractBuilder {
    /// Increment scanned-file count by one.
    pub fn add_file_scanned(&mut self) {
        self.cnt_files_scanned += 1;
    }

    /// Increment skipped-file count by one.
    pub fn add_file_skipped(&mut self) {
        self.cnt_files_skipped += 1;
    }

    /// Increment scanned-sheet count by one.
    pub fn add_sheet_scanned(&mut self) {
        self.cnt_sheets_scanned += 1;
    }

    /// Add `n` produced records.
    pub fn add_records(&mut self, n: usize) {
        self.cnt_records += n as u64;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one source-scoped error.
    pub fn add_error(&mut self, source: impl Into<String>, exception: impl Into<String>) {
        self.errors.push(SpecExtractError {
            source: source.into(),
            exception: exception.into(),
        });
    }

    /// Fold another builder (e.g. one per worker) into this one.
    pub fn merge(&mut self, other: ReportExtractBuilder) {
        self.cnt_files_scanned += other.cnt_files_scanned;
        self.cnt_files_skipped += other.cnt_files_skipped;
        self.cnt_sheets_scanned += other.cnt_sheets_scanned;
        self.cnt_records += other.cnt_records;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportExtract {
        ReportExtract {
            cnt_files_scanned: self.cnt_files_scanned,
            cnt_files_skipped: self.cnt_files_skipped,
            cnt_sheets_scanned: self.cnt_sheets_scanned,
            cnt_records: self.cnt_records,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// Records of one run together with its report.
#[derive(Debug, Default, Clone)]
pub struct SpecExtractOutcome {
    /// Records in file order, then sheet order.
    pub records: Vec<SpecRecord>,
    /// Run report.
    pub report: ReportExtract,
}
