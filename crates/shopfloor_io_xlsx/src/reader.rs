//! Workbook reader adapter: calamine ranges to extraction grids.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use shopfloor_extract::{EnumCellValue, ReportExtractBuilder, SpecSheetGrid, SpecWorkbookGrid};
use tracing::{debug, warn};

/// Open one workbook and decode every readable sheet, in workbook order.
///
/// A sheet that fails to decode is recorded in `builder` as `source::sheet`
/// and skipped; only an unopenable workbook is an `Err`.
pub fn read_workbook(
    path: &Path,
    source: &str,
    builder: &mut ReportExtractBuilder,
) -> Result<SpecWorkbookGrid, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| format!("Failed to open workbook {}: {err}", path.display()))?;

    let mut l_sheets = Vec::new();
    for name_sheet in workbook.sheet_names() {
        match workbook.worksheet_range(&name_sheet) {
            Ok(range) => {
                let sheet = derive_sheet_grid_from_range(&name_sheet, &range);
                debug!(
                    source = %source,
                    sheet = %name_sheet,
                    rows = sheet.height(),
                    cols = sheet.width(),
                    "sheet decoded"
                );
                l_sheets.push(sheet);
            }
            Err(err) => {
                warn!(source = %source, sheet = %name_sheet, error = %err, "sheet decode failed");
                builder.add_error(
                    format!("{source}::{name_sheet}"),
                    format!("Failed to read sheet: {err}"),
                );
            }
        }
    }

    Ok(SpecWorkbookGrid {
        source: source.to_string(),
        sheets: l_sheets,
    })
}

/// Convert a used range into a grid anchored at A1.
///
/// Ranges that start below/right of A1 are padded so row/column indices match
/// the sheet's own coordinates.
pub fn derive_sheet_grid_from_range(name_sheet: &str, range: &Range<Data>) -> SpecSheetGrid {
    let (n_row_start, n_col_start) = range
        .start()
        .map_or((0, 0), |(row, col)| (row as usize, col as usize));
    if range.is_empty() {
        return SpecSheetGrid::new(name_sheet, vec![]);
    }

    let mut l_rows: Vec<Vec<EnumCellValue>> = vec![vec![]; n_row_start];
    for row in range.rows() {
        let mut l_cells = vec![EnumCellValue::None; n_col_start];
        l_cells.extend(row.iter().map(derive_cell_value_from_data));
        l_rows.push(l_cells);
    }
    SpecSheetGrid::new(name_sheet, l_rows)
}

/// Map one calamine cell to the extraction cell model.
pub fn derive_cell_value_from_data(value: &Data) -> EnumCellValue {
    match value {
        Data::Empty | Data::Error(_) => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Bool(val) => {
            EnumCellValue::String(if *val { "TRUE" } else { "FALSE" }.to_string())
        }
        Data::DateTime(val) => EnumCellValue::DateSerial(val.as_f64()),
        Data::DateTimeIso(val) => EnumCellValue::String(val.replace('T', " ")),
        Data::DurationIso(val) => EnumCellValue::String(val.clone()),
    }
}
