//! XLSX writer for the collected-records table.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use shopfloor_extract::{EnumCellValue, SpecRecord};
use shopfloor_extract::util::convert_number_to_text;
use tracing::info;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_WIDTH_EXCEL_COLUMN_MAX};
use crate::spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice,
    SpecXlsxReport, SpecXlsxWriteOptions,
};
use crate::table::derive_dataframe_from_records;
use crate::util::{estimate_unicode_string_width, plan_sheet_slices, sanitize_sheet_name};

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and options.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(path_file_out: PathBuf, write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write records under the fixed header row.
    pub fn write_records(&mut self, records: &[SpecRecord]) -> Result<(), String> {
        let df = derive_dataframe_from_records(records)?;
        let sheet_name = self.write_options.sheet_name.clone();
        self.write_sheet_from_dataframe(&df, &sheet_name)
    }

    /// Write one sheet from an in-memory table; numeric columns get the decimal format.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
    ) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        self.write_sheet(df_data, sheet_name)
    }

    fn write_sheet(&mut self, df_data: &DataFrame, sheet_name: &str) -> Result<(), String> {
        validate_policy_autofit(&self.write_options.policy_autofit)?;

        let l_colnames: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let l_if_numeric: Vec<bool> = df_data
            .get_columns()
            .iter()
            .map(|col| col.dtype().is_numeric())
            .collect();

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            df_data.height(),
            1,
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        )?;

        let fmt_header = derive_rust_xlsx_format(&self.write_options.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.write_options.fmt_text);
        let fmt_decimal = derive_rust_xlsx_format(&self.write_options.fmt_decimal);
        let policy_autofit = self.write_options.policy_autofit.clone();
        let if_freeze_header = self.write_options.if_freeze_header;

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique = self.derive_unique_sheet_name(&sheet_slice.sheet_name);
            let worksheet = self.workbook.add_worksheet();
            worksheet
                .set_name(&sheet_name_unique)
                .map_err(derive_xlsx_error_text)?;

            let mut l_width_by_col = vec![0usize; l_colnames.len()];
            for (n_idx_col, colname) in l_colnames.iter().enumerate() {
                worksheet
                    .write_string_with_format(0, cast_col_num(n_idx_col)?, colname, &fmt_header)
                    .map_err(derive_xlsx_error_text)?;
                if !matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::None) {
                    l_width_by_col[n_idx_col] = estimate_unicode_string_width(colname);
                }
            }
            if if_freeze_header {
                worksheet
                    .set_freeze_panes(1, 0)
                    .map_err(derive_xlsx_error_text)?;
            }

            let n_rows_slice = sheet_slice.row_end_exclusive - sheet_slice.row_start_inclusive;
            let if_autofit_body = matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::All);
            for (n_idx_col, col) in df_data.get_columns().iter().enumerate() {
                let col = col.slice(sheet_slice.row_start_inclusive as i64, n_rows_slice);
                let fmt_col = if l_if_numeric[n_idx_col] {
                    &fmt_decimal
                } else {
                    &fmt_text
                };
                for n_row_local in 0..n_rows_slice {
                    let value = derive_cell_value_from_any_value(
                        col.get(n_row_local)
                            .map_err(|err| format!("Failed to access cell value: {err}"))?,
                    );
                    if if_autofit_body
                        && policy_autofit
                            .height_body_inferred_max
                            .is_none_or(|n_max| n_row_local < n_max)
                    {
                        l_width_by_col[n_idx_col] =
                            usize::max(l_width_by_col[n_idx_col], estimate_width_len(&value));
                    }
                    write_cell_with_format(worksheet, 1 + n_row_local, n_idx_col, &value, fmt_col)?;
                }
            }

            if !matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::None) {
                apply_column_widths(worksheet, &l_width_by_col, &policy_autofit)?;
            }

            info!(
                sheet = %sheet_name_unique,
                rows = n_rows_slice,
                "records sheet written"
            );
            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                row_start_inclusive: sheet_slice.row_start_inclusive,
                row_end_exclusive: sheet_slice.row_end_exclusive,
            });
        }

        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Write records to `path_file_out` in one call and return the write report.
pub fn write_records_xlsx(
    path_file_out: &Path,
    records: &[SpecRecord],
    write_options: SpecXlsxWriteOptions,
) -> Result<SpecXlsxReport, String> {
    let mut writer = XlsxWriter::new(path_file_out.to_path_buf(), write_options);
    writer.write_records(records)?;
    writer.close()?;
    Ok(writer.report().pop().unwrap_or_default())
}

/// Estimate displayed width units for one cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) | EnumCellValue::DateSerial(n) => format!("{n:.2}").len(),
    }
}

fn apply_column_widths(
    worksheet: &mut Worksheet,
    widths_by_col: &[usize],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), String> {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(
        N_WIDTH_EXCEL_COLUMN_MAX,
        usize::max(n_min, policy_autofit.width_cell_max),
    );
    for (n_idx_col, n_width_recorded) in widths_by_col.iter().enumerate() {
        let n_width_final = (n_width_recorded + policy_autofit.width_cell_padding).clamp(n_min, n_max);
        worksheet
            .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
            .map_err(derive_xlsx_error_text)?;
    }
    Ok(())
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let (n_row, n_col) = (cast_row_num(row_idx)?, cast_col_num(col_idx)?);
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) if val.is_finite() => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) | EnumCellValue::DateSerial(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, convert_number_to_text(*val), format)
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    for val in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(val) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
