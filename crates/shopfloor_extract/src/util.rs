//! Stateless helper utilities shared by the extractors.

use crate::conf::CHR_LABEL_SEPARATOR;
use crate::date::parse_date_serial;
use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region CellText

/// Render a number the way a user typed it (`12`, not `12.0`).
pub fn convert_number_to_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Trimmed display text of a cell; blank cells give an empty string.
pub fn derive_cell_text(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => String::new(),
        EnumCellValue::String(s) => s.trim().to_string(),
        EnumCellValue::Number(n) => convert_number_to_text(*n),
        EnumCellValue::DateSerial(n) => {
            parse_date_serial(*n).unwrap_or_else(|| convert_number_to_text(*n))
        }
    }
}

/// True when `text` contains any of `keywords`.
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| text.contains(kw.as_str()))
}

/// True when the cell is text containing any of `keywords`.
pub fn cell_contains_any(value: &EnumCellValue, keywords: &[String]) -> bool {
    value.as_str().is_some_and(|s| contains_any(s.trim(), keywords))
}

/// Value after a label such as `批次号：A-12`.
///
/// Returns `None` when no label matches, `Some("")` when the label is empty.
pub fn derive_label_value(text: &str, labels: &[String]) -> Option<String> {
    if !contains_any(text, labels) {
        return None;
    }
    let c_value = text
        .split_once(CHR_LABEL_SEPARATOR)
        .map_or("", |(_, rest)| rest)
        .trim();
    Some(c_value.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BlockGeometry

/// Number of tiled blocks covering `n_cols` columns (`ceil(n_cols / width)`).
pub fn calculate_block_count(n_cols: usize, width_block: usize) -> usize {
    if width_block == 0 {
        return 0;
    }
    n_cols.div_ceil(width_block)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
