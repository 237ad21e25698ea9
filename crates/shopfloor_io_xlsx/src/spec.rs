//! Workbook IO models: formats, options, reports, uploads.

use shopfloor_extract::SpecExtractOptions;

use crate::conf::{
    C_SHEET_NAME_RECORDS, EnumFmtKey, TUP_MARKERS_FILE_NAME, TUP_PATTERNS_INCLUDE_FILE,
    derive_default_xlsx_format, derive_owned,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormat

/// Cell format; every property is optional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for the records sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer options for the collected-records workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Target sheet name (sanitized before use).
    pub sheet_name: String,
    /// Text column format.
    pub fmt_text: SpecCellFormat,
    /// Numeric column format.
    pub fmt_decimal: SpecCellFormat,
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Freeze the header row.
    pub if_freeze_header: bool,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            sheet_name: C_SHEET_NAME_RECORDS.to_string(),
            fmt_text: derive_default_xlsx_format(EnumFmtKey::Text),
            fmt_decimal: derive_default_xlsx_format(EnumFmtKey::Decimal),
            fmt_header: derive_default_xlsx_format(EnumFmtKey::Header),
            policy_autofit: SpecAutofitCellsPolicy::default(),
            if_freeze_header: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchOptions

/// Options of the multi-file batch runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchOptions {
    /// A file is accepted only if its name contains one of these markers.
    pub markers_file_name: Vec<String>,
    /// A file is accepted only if its name matches one of these globs.
    pub patterns_include_files: Vec<String>,
    /// Worker cap; `None` uses min(cpu, 8).
    pub num_workers_max: Option<usize>,
    /// Extraction options applied to every workbook.
    pub extract_options: SpecExtractOptions,
}

impl Default for SpecBatchOptions {
    fn default() -> Self {
        Self {
            markers_file_name: derive_owned(&TUP_MARKERS_FILE_NAME),
            patterns_include_files: derive_owned(&TUP_PATTERNS_INCLUDE_FILE),
            num_workers_max: None,
            extract_options: SpecExtractOptions::default(),
        }
    }
}

/// In-memory uploaded workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecUpload {
    /// Original file name; used for filtering, format detection and reporting.
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Concrete sheet part emitted to the workbook (after Excel row-limit slicing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Inclusive source row start.
    pub row_start_inclusive: usize,
    /// Exclusive source row end.
    pub row_end_exclusive: usize,
}

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet slices produced by the write call.
    pub sheets: Vec<SpecSheetSlice>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
