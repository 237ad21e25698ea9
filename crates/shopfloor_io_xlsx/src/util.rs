//! Pure helper functions for workbook IO.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use shopfloor_extract::ExtractError;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{SpecBatchOptions, SpecSheetSlice, SpecXlsxReport};

////////////////////////////////////////////////////////////////////////////////
// #region SheetSliceUtils

/// Replace illegal sheet-name characters and cap the length.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split `height_data` record rows into sheets that fit the Excel row limit.
pub fn plan_sheet_slices(
    height_data: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>, String> {
    if height_header == 0 {
        return Err("height_header must be >= 1.".to_string());
    }
    let n_rows_data_max = N_NROWS_EXCEL_MAX
        .checked_sub(height_header)
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            format!("Header too tall: height_header={height_header} exceeds Excel limit.")
        })?;

    let mut l_row_slices = Vec::new();
    let mut n_row_start = 0;
    while n_row_start < height_data {
        let n_row_end = usize::min(height_data, n_row_start + n_rows_data_max);
        l_row_slices.push((n_row_start, n_row_end));
        n_row_start = n_row_end;
    }
    if l_row_slices.is_empty() {
        l_row_slices.push((0, 0));
    }

    let n_parts_total = l_row_slices.len();
    let l_sheet_parts: Vec<SpecSheetSlice> = l_row_slices
        .into_iter()
        .enumerate()
        .map(|(n_idx_part, (row_start, row_end))| SpecSheetSlice {
            sheet_name: if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, n_idx_part + 1)
            },
            row_start_inclusive: row_start,
            row_end_exclusive: row_end,
        })
        .collect();

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {n_parts_total} sheets by rows."
        ));
    }
    Ok(l_sheet_parts)
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Displayed width units of a string; CJK and other non-ASCII chars count 1.6.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchUtils

/// Resolve effective worker count: explicit caps clamp to cpu, default is min(cpu, 8).
pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

/// Compiled file-name filter: include globs plus report markers.
#[derive(Debug, Clone)]
pub struct SpecFileNameFilter {
    globs_include: GlobSet,
    markers: Vec<String>,
}

impl SpecFileNameFilter {
    /// Compile the filter from batch options.
    pub fn from_options(options: &SpecBatchOptions) -> Result<Self, ExtractError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.patterns_include_files {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    ExtractError::InvalidPattern(format!("Invalid include pattern `{pattern}`: {e}"))
                })?;
            builder.add(glob);
        }
        let globs_include = builder
            .build()
            .map_err(|e| ExtractError::InvalidPattern(format!("Invalid include patterns: {e}")))?;

        Ok(Self {
            globs_include,
            markers: options.markers_file_name.clone(),
        })
    }

    /// True when `name` matches an include glob and carries a marker.
    ///
    /// An empty glob or marker list accepts everything on that axis.
    pub fn is_match(&self, name: &str) -> bool {
        let if_glob_ok = self.globs_include.is_empty() || self.globs_include.is_match(name);
        let if_marker_ok =
            self.markers.is_empty() || self.markers.iter().any(|m| name.contains(m.as_str()));
        if_glob_ok && if_marker_ok
    }
}

/// File name of a path, lossy; falls back to the whole path.
pub fn derive_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Temp-file suffix that keeps the upload's extension (`.xlsx` by default).
pub fn derive_upload_suffix(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_else(|| ".xlsx".to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
