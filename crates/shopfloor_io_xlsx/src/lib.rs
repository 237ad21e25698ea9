//! `shopfloor_io_xlsx` v1:
//! Workbook IO around the extraction engine.
//!
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options
//! - `util`   : pure helper functions
//! - `reader` : calamine workbook decoding into cell grids
//! - `batch`  : file/upload filtering and parallel extraction
//! - `table`  : record table (polars) and Arrow IPC export
//! - `writer` : record workbook writer
pub mod batch;
pub mod conf;
pub mod reader;
pub mod spec;
pub mod table;
pub mod util;
pub mod writer;

pub use batch::{extract_file, extract_files, extract_upload, extract_uploads};
pub use conf::{
    C_FILE_NAME_RECORDS, C_SHEET_NAME_RECORDS, N_LEN_EXCEL_SHEET_NAME_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
pub use reader::{derive_cell_value_from_data, derive_sheet_grid_from_range, read_workbook};
pub use spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecBatchOptions, SpecCellFormat,
    SpecSheetSlice, SpecUpload, SpecXlsxReport, SpecXlsxWriteOptions,
};
pub use table::{
    convert_dataframe_to_ipc_bytes, convert_records_to_ipc_bytes, derive_dataframe_from_ipc_bytes,
    derive_dataframe_from_records,
};
pub use util::{SpecFileNameFilter, plan_sheet_slices, sanitize_sheet_name};
pub use writer::{XlsxWriter, write_records_xlsx};
