//! Field-level predicates and whole-record completeness check.

use crate::spec::{EnumCellValue, SpecRecord};

/// Plausible worker name: text, at least 2 chars after trim, not a structural label.
///
/// This is the main signal separating data rows from everything else.
pub fn is_valid_name(value: &EnumCellValue, names_stoplist: &[String]) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    let c_name = text.trim();
    c_name.chars().count() >= 2 && !names_stoplist.iter().any(|stop| stop == c_name)
}

/// True when the value can be read as a floating-point number.
pub fn is_valid_number(value: &EnumCellValue) -> bool {
    convert_cell_number(value).is_some()
}

/// Numeric payload of a cell; text is trimmed before parsing.
pub fn convert_cell_number(value: &EnumCellValue) -> Option<f64> {
    match value {
        EnumCellValue::None => None,
        EnumCellValue::Number(n) | EnumCellValue::DateSerial(n) => Some(*n),
        EnumCellValue::String(s) => s.trim().parse::<f64>().ok(),
    }
}

/// A record is complete when date, name and product are all non-empty.
pub fn validate_record(record: &SpecRecord) -> bool {
    record.date.as_deref().is_some_and(|date| !date.is_empty())
        && !record.name.is_empty()
        && !record.product.is_empty()
}
