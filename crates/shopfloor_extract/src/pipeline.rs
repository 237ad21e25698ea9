//! Sheet routing and workbook-level orchestration.

use tracing::{info, warn};

use crate::conf::N_WIDTH_FIXED_BLOCK;
use crate::extractor::{FixedBlockExtractor, RepeatingBlockExtractor, WorkshopExtractor};
use crate::report::{ReportExtractBuilder, SpecExtractOutcome};
use crate::spec::{
    EnumExtractorKind, EnumWorkshopStrategy, ExtractError, SpecExtractOptions, SpecRecord,
    SpecSheetGrid, SpecWorkbookGrid,
};

/// Resolve the strategy of a sheet from its name; first matching route wins.
pub fn derive_workshop_strategy(name_sheet: &str, options: &SpecExtractOptions) -> EnumWorkshopStrategy {
    options
        .routes
        .iter()
        .find(|route| name_sheet.contains(route.keyword.as_str()))
        .map_or(EnumWorkshopStrategy::Fallback, |route| route.strategy)
}

/// Build a fresh extractor (and context) for one sheet.
pub fn create_extractor<'a>(
    name_sheet: &str,
    options: &'a SpecExtractOptions,
) -> Box<dyn WorkshopExtractor + 'a> {
    let enum_strategy = derive_workshop_strategy(name_sheet, options);
    match enum_strategy.extractor_kind() {
        EnumExtractorKind::RepeatingBlock => Box::new(RepeatingBlockExtractor::new(
            name_sheet,
            enum_strategy,
            options,
        )),
        EnumExtractorKind::FixedBlock => {
            Box::new(FixedBlockExtractor::new(name_sheet, enum_strategy, options))
        }
    }
}

/// Extract the records of one sheet.
pub fn extract_sheet(sheet: &SpecSheetGrid, options: &SpecExtractOptions) -> Vec<SpecRecord> {
    create_extractor(&sheet.name, options).scan(sheet)
}

/// Extract every sheet of one workbook, in sheet order.
pub fn extract_workbook(
    workbook: &SpecWorkbookGrid,
    options: &SpecExtractOptions,
    builder: &mut ReportExtractBuilder,
) -> Vec<SpecRecord> {
    builder.add_file_scanned();
    let mut l_records = Vec::new();
    for sheet in &workbook.sheets {
        let l_records_sheet = extract_sheet(sheet, options);
        info!(
            source = %workbook.source,
            sheet = %sheet.name,
            records = l_records_sheet.len(),
            "sheet extracted"
        );
        builder.add_sheet_scanned();
        builder.add_records(l_records_sheet.len());
        l_records.extend(l_records_sheet);
    }
    l_records
}

/// Reject option sets that cannot drive an extraction.
pub fn validate_extract_options(options: &SpecExtractOptions) -> Result<(), ExtractError> {
    // Fixed blocks read eight fields at offsets 0..=7; narrower tiles overlap.
    if options.width_fixed_block < N_WIDTH_FIXED_BLOCK {
        return Err(ExtractError::InvalidOptions(format!(
            "Arg `width_fixed_block` must be >= {N_WIDTH_FIXED_BLOCK}, got {}.",
            options.width_fixed_block
        )));
    }
    if options.keywords_quantity.iter().all(|kw| kw.is_empty()) {
        return Err(ExtractError::InvalidOptions(
            "Arg `keywords_quantity` must contain at least one non-empty keyword.".to_string(),
        ));
    }
    Ok(())
}

/// Extract records from already-decoded workbooks.
///
/// Returns [`ExtractError`] only for invalid options; an empty result is a
/// warning in the report.
pub fn extract_workbooks(
    workbooks: &[SpecWorkbookGrid],
    options: &SpecExtractOptions,
) -> Result<SpecExtractOutcome, ExtractError> {
    validate_extract_options(options)?;

    let mut builder = ReportExtractBuilder::default();
    let mut l_records = Vec::new();
    for workbook in workbooks {
        l_records.extend(extract_workbook(workbook, options, &mut builder));
    }
    Ok(finalize_outcome(l_records, builder))
}

/// Attach the empty-result warning (if any) and build the report.
pub fn finalize_outcome(records: Vec<SpecRecord>, mut builder: ReportExtractBuilder) -> SpecExtractOutcome {
    if records.is_empty() {
        let c_warning = "No valid records extracted; check the sheet layouts.".to_string();
        warn!("{c_warning}");
        builder.add_warning(c_warning);
    }
    let report = builder.build();
    info!("{report}");
    SpecExtractOutcome { records, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::EnumCellValue;
    use crate::validate::validate_record;

    fn text(s: &str) -> EnumCellValue {
        EnumCellValue::text(s)
    }

    fn num(n: f64) -> EnumCellValue {
        EnumCellValue::Number(n)
    }

    fn workbook() -> SpecWorkbookGrid {
        let sheet_wrapping = SpecSheetGrid::new(
            "绕肉A",
            vec![
                vec![text("日期：2024-03-05")],
                vec![
                    text("序号"),
                    text("姓名"),
                    text("数量"),
                    text("单价"),
                    text("金额"),
                    text("备注"),
                    text("数量"),
                    text("单价"),
                    text("金额"),
                    text("备注"),
                ],
                vec![
                    num(1.0),
                    text("张三"),
                    num(10.0),
                    num(5.0),
                    EnumCellValue::None,
                    EnumCellValue::None,
                    num(2.0),
                    num(3.0),
                    num(6.0),
                    EnumCellValue::None,
                ],
            ],
        );
        let sheet_packing = SpecSheetGrid::new(
            "包装B",
            vec![vec![
                text("2024-03-06"),
                text("李四"),
                text("B1"),
                text("鸭肉卷"),
                num(3.0),
                num(4.0),
                EnumCellValue::None,
                EnumCellValue::None,
            ]],
        );
        SpecWorkbookGrid {
            source: "优萌车间生产日报.xlsx".to_string(),
            sheets: vec![sheet_wrapping, sheet_packing],
        }
    }

    #[test]
    fn test_derive_workshop_strategy_routes_by_substring() {
        let options = SpecExtractOptions::default();
        assert_eq!(
            derive_workshop_strategy("绕肉A", &options),
            EnumWorkshopStrategy::Wrapping
        );
        assert_eq!(
            derive_workshop_strategy("3月制作", &options),
            EnumWorkshopStrategy::Making
        );
        assert_eq!(
            derive_workshop_strategy("挑选组", &options),
            EnumWorkshopStrategy::Packing
        );
        assert_eq!(
            derive_workshop_strategy("Sheet1", &options),
            EnumWorkshopStrategy::Fallback
        );
    }

    #[test]
    fn test_extract_workbooks_two_sheet_end_to_end() {
        let options = SpecExtractOptions::default();
        let outcome = extract_workbooks(&[workbook()], &options).expect("extract");

        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.records.iter().all(validate_record));
        let l_workshops: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.workshop.as_str())
            .collect();
        assert_eq!(l_workshops, vec!["绕肉A", "绕肉A", "包装B"]);
        assert_eq!(outcome.records[0].amount, 50.0);
        assert_eq!(outcome.records[1].amount, 6.0);
        assert_eq!(outcome.records[2].date.as_deref(), Some("2024/03/06"));

        let report = outcome.report;
        assert_eq!(report.cnt_files_scanned, 1);
        assert_eq!(report.cnt_sheets_scanned, 2);
        assert_eq!(report.cnt_records, 3);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_extract_workbooks_empty_result_is_a_warning() {
        let options = SpecExtractOptions::default();
        let workbook = SpecWorkbookGrid {
            source: "empty.xlsx".to_string(),
            sheets: vec![SpecSheetGrid::new("包装", vec![])],
        };
        let outcome = extract_workbooks(&[workbook], &options).expect("extract");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.warning_count(), 1);
    }

    #[test]
    fn test_extract_workbooks_rejects_invalid_options() {
        let options = SpecExtractOptions {
            width_fixed_block: 0,
            ..SpecExtractOptions::default()
        };
        let err = extract_workbooks(&[], &options).expect_err("invalid options");
        assert!(matches!(err, ExtractError::InvalidOptions(_)));

        let options = SpecExtractOptions {
            width_fixed_block: 7,
            ..SpecExtractOptions::default()
        };
        assert!(validate_extract_options(&options).is_err());
        let options = SpecExtractOptions {
            width_fixed_block: 10,
            ..SpecExtractOptions::default()
        };
        assert!(validate_extract_options(&options).is_ok());
    }
}
