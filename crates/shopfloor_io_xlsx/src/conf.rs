//! Workbook IO constants and default preset factories.

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Upper bound of an Excel column width.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;

/// Output sheet holding the collected records.
pub const C_SHEET_NAME_RECORDS: &str = "数据收集表";
/// Suggested file name for the collected-records workbook.
pub const C_FILE_NAME_RECORDS: &str = "生产车间统计数据收集.xlsx";
/// File-name markers of production reports.
pub const TUP_MARKERS_FILE_NAME: [&str; 2] = ["优萌车间", "生产日报"];
/// File-name globs accepted by the batch runner.
pub const TUP_PATTERNS_INCLUDE_FILE: [&str; 3] = ["*.xlsx", "*.xlsm", "*.xls"];
/// Prefix of temp files holding decoded uploads.
pub const C_PREFIX_TEMP_UPLOAD: &str = "shopfloor_upload_";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Generic text cell format.
    Text,
    /// Decimal number format.
    Decimal,
    /// Header cell format.
    Header,
}

/// Build one default format preset used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_format(key: EnumFmtKey) -> SpecCellFormat {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("等线".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    match key {
        EnumFmtKey::Text => cfg_base_fmt_spec,
        EnumFmtKey::Decimal => cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0.00".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        EnumFmtKey::Header => cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some("#D9E1F2".to_string()),
            ..Default::default()
        }),
    }
}

pub(crate) fn derive_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|val| (*val).to_string()).collect()
}
