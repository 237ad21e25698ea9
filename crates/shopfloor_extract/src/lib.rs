//! `shopfloor_extract` v1:
//! Rust-side production-report extraction engine.
//!
//! Turns workshop report sheets (already decoded into cell grids) into
//! normalized production records.
//! - `conf`      : constants and default presets
//! - `spec`      : cell/sheet/record models, options, errors
//! - `report`    : run-time report model
//! - `date`      : date normalization
//! - `validate`  : field and record predicates
//! - `context`   : per-sheet carry-forward state
//! - `extractor` : repeating-block and fixed-block strategies
//! - `pipeline`  : sheet routing and workbook orchestration
//! - `util`      : shared helper functions

pub mod conf;
pub mod context;
pub mod date;
pub mod extractor;
pub mod pipeline;
pub mod report;
pub mod spec;
pub mod util;
pub mod validate;

pub use conf::{TUP_RECORD_COLUMNS, derive_default_extract_options};
pub use context::SpecExtractContext;
pub use date::{parse_date, parse_date_serial, parse_date_text, search_date_text};
pub use extractor::{FixedBlockExtractor, RepeatingBlockExtractor, WorkshopExtractor};
pub use pipeline::{
    create_extractor, derive_workshop_strategy, extract_sheet, extract_workbook,
    extract_workbooks, finalize_outcome, validate_extract_options,
};
pub use report::{ReportExtract, ReportExtractBuilder, SpecExtractOutcome};
pub use spec::{
    EnumCellValue, EnumColumnRole, EnumExtractorKind, EnumWorkshopStrategy, ExtractError,
    SpecColumnRole, SpecExtractError, SpecExtractOptions, SpecRecord, SpecSheetGrid,
    SpecWorkbookGrid, SpecWorkshopRoute,
};
pub use validate::{is_valid_name, is_valid_number, validate_record};
