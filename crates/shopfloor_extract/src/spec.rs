//! Shared extraction models: cells, sheets, records, options and errors.

use std::fmt;

use crate::conf::derive_default_extract_options;

////////////////////////////////////////////////////////////////////////////////
// #region GridModels

/// Raw cell value as handed over by the workbook reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Plain numeric value.
    Number(f64),
    /// Date-formatted cell, stored as a spreadsheet serial number.
    DateSerial(f64),
}

/// Shared blank cell returned for out-of-range lookups.
pub static CELL_NONE: EnumCellValue = EnumCellValue::None;

impl EnumCellValue {
    /// Build a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// True when the cell carries nothing (blank or whitespace-only text).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.trim().is_empty(),
            Self::Number(_) | Self::DateSerial(_) => false,
        }
    }

    /// Borrow the text payload of a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// One sheet as a rectangular grid; every row is padded to the sheet width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetGrid {
    /// Sheet name, also used as the workshop name of its records.
    pub name: String,
    rows: Vec<Vec<EnumCellValue>>,
    width: usize,
}

impl SpecSheetGrid {
    /// Build a grid, padding ragged rows with blank cells.
    pub fn new(name: impl Into<String>, mut rows: Vec<Vec<EnumCellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, EnumCellValue::None);
        }
        Self {
            name: name.into(),
            rows,
            width,
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Max column count over all rows.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row cells by zero-based index; empty slice when out of range.
    pub fn row(&self, row_idx: usize) -> &[EnumCellValue] {
        self.rows.get(row_idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell by zero-based coordinate; blank when out of range.
    pub fn cell(&self, row_idx: usize, col_idx: usize) -> &EnumCellValue {
        self.row(row_idx).get(col_idx).unwrap_or(&CELL_NONE)
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[EnumCellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// One input workbook: named sheets in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorkbookGrid {
    /// Display name of the source (usually the file name).
    pub source: String,
    /// Sheets in workbook order.
    pub sheets: Vec<SpecSheetGrid>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordModels

/// One normalized production record.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecord {
    /// Canonical `YYYY/MM/DD` date.
    pub date: Option<String>,
    /// Worker name.
    pub name: String,
    /// Batch number.
    pub batch: String,
    /// Product name.
    pub product: String,
    /// Produced quantity.
    pub quantity: f64,
    /// Unit of measure; always empty for now.
    pub unit: String,
    /// Unit price.
    pub price: f64,
    /// Amount; derived from quantity × price when the source has none.
    pub amount: f64,
    /// Workshop (sheet) name.
    pub workshop: String,
    /// Free-form note.
    pub note: String,
}

/// Column role inside one repeating product block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnRole {
    /// Quantity column; opens a block.
    Quantity,
    /// Unit-price column.
    Price,
    /// Amount column.
    Amount,
    /// Note column.
    Note,
}

/// Inferred role of one column, as recorded from the latest header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnRole {
    /// Zero-based column; `None` when the block runs past the row width.
    pub col_idx: Option<usize>,
    /// Role of the column in its block.
    pub role: EnumColumnRole,
    /// Product of the owning block.
    pub product: String,
    /// Batch of the owning block.
    pub batch: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Named workshop strategies resolved from a sheet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumWorkshopStrategy {
    /// Meat-wrapping workshop (`绕肉`); repeating blocks.
    Wrapping,
    /// Making workshop (`制作`); same layout as [`Self::Wrapping`].
    Making,
    /// Packing/sorting workshop (`包装`, `挑选`); fixed blocks.
    Packing,
    /// Unmatched sheet name; fixed blocks.
    Fallback,
}

/// Row-scanning algorithm behind a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumExtractorKind {
    /// Header-inferred 4-column product blocks.
    RepeatingBlock,
    /// Fixed 8-column tiled blocks.
    FixedBlock,
}

impl EnumWorkshopStrategy {
    /// Algorithm implementing this strategy.
    pub fn extractor_kind(self) -> EnumExtractorKind {
        match self {
            Self::Wrapping | Self::Making => EnumExtractorKind::RepeatingBlock,
            Self::Packing | Self::Fallback => EnumExtractorKind::FixedBlock,
        }
    }
}

/// Sheet-name keyword routed to one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkshopRoute {
    /// Substring searched in the sheet name.
    pub keyword: String,
    /// Strategy used on match.
    pub strategy: EnumWorkshopStrategy,
}

impl SpecWorkshopRoute {
    /// Build one route.
    pub fn new(keyword: impl Into<String>, strategy: EnumWorkshopStrategy) -> Self {
        Self {
            keyword: keyword.into(),
            strategy,
        }
    }
}

/// Tunables of the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtractOptions {
    /// Structural labels rejected as worker names.
    pub names_stoplist: Vec<String>,
    /// Keywords marking a candidate header row.
    pub keywords_header: Vec<String>,
    /// Keywords of a quantity column.
    pub keywords_quantity: Vec<String>,
    /// Keywords of a unit-price column.
    pub keywords_price: Vec<String>,
    /// Keywords of an amount column.
    pub keywords_amount: Vec<String>,
    /// Keywords of a note column.
    pub keywords_note: Vec<String>,
    /// Batch labels (`批次号：`), value follows the label.
    pub labels_batch: Vec<String>,
    /// Product labels (`产品名称：`), value follows the label.
    pub labels_product: Vec<String>,
    /// Product-cell text that marks a header position in fixed blocks.
    pub markers_product_header: Vec<String>,
    /// Product names used, by block index, when a header gives none.
    pub products_fallback: Vec<String>,
    /// Sheet-name routing table, checked in order.
    pub routes: Vec<SpecWorkshopRoute>,
    /// Leading rows scanned for metadata before dispatch.
    pub rows_metadata_scan: usize,
    /// Fixed-block width in columns; at least 8 (extra columns are ignored).
    pub width_fixed_block: usize,
}

impl Default for SpecExtractOptions {
    fn default() -> Self {
        derive_default_extract_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// One isolated failure (file or sheet) with source label + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtractError {
    /// File name, or `file::sheet` for sheet-level failures.
    pub source: String,
    /// User-facing error text.
    pub exception: String,
}

/// "Top-level call failed" errors (input validation / setup stage).
#[derive(Debug)]
pub enum ExtractError {
    /// Invalid option value or combination.
    InvalidOptions(String),
    /// Invalid include pattern.
    InvalidPattern(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOptions(msg) => write!(f, "Invalid extract options: {msg}"),
            Self::InvalidPattern(msg) => write!(f, "Invalid file pattern: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_grid_pads_rows_and_blanks_out_of_range() {
        let sheet = SpecSheetGrid::new(
            "s",
            vec![
                vec![EnumCellValue::text("a")],
                vec![
                    EnumCellValue::None,
                    EnumCellValue::Number(1.0),
                    EnumCellValue::Number(2.0),
                ],
            ],
        );

        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.row(0).len(), 3);
        assert_eq!(sheet.cell(0, 2), &EnumCellValue::None);
        assert_eq!(sheet.cell(9, 9), &EnumCellValue::None);
        assert!(sheet.row(5).is_empty());
    }

    #[test]
    fn test_strategy_variants_share_algorithms() {
        assert_eq!(
            EnumWorkshopStrategy::Wrapping.extractor_kind(),
            EnumWorkshopStrategy::Making.extractor_kind()
        );
        assert_eq!(
            EnumWorkshopStrategy::Fallback.extractor_kind(),
            EnumExtractorKind::FixedBlock
        );
    }
}
