//! Fixed-block strategy: 8-column worker entries tiled across wide sheets.

use tracing::info;

use crate::date::parse_date;
use crate::extractor::{SpecRecordDraft, WorkshopBase, WorkshopExtractor, evaluate_has_data};
use crate::spec::{
    CELL_NONE, EnumCellValue, EnumWorkshopStrategy, SpecExtractOptions, SpecRecord,
    SpecSheetGrid,
};
use crate::util::{calculate_block_count, contains_any, derive_cell_text};
use crate::validate::is_valid_name;

const N_OFFSET_DATE: usize = 0;
const N_OFFSET_NAME: usize = 1;
const N_OFFSET_BATCH: usize = 2;
const N_OFFSET_PRODUCT: usize = 3;
const N_OFFSET_QUANTITY: usize = 4;
const N_OFFSET_PRICE: usize = 5;
const N_OFFSET_AMOUNT: usize = 6;
const N_OFFSET_NOTE: usize = 7;

/// Extractor for [`EnumWorkshopStrategy::Packing`] and unmatched sheets.
#[derive(Debug, Clone)]
pub struct FixedBlockExtractor<'a> {
    base: WorkshopBase<'a>,
    strategy: EnumWorkshopStrategy,
}

impl<'a> FixedBlockExtractor<'a> {
    /// Create an extractor for one sheet.
    pub fn new(
        workshop: impl Into<String>,
        strategy: EnumWorkshopStrategy,
        options: &'a SpecExtractOptions,
    ) -> Self {
        Self {
            base: WorkshopBase::new(workshop, options),
            strategy,
        }
    }

    /// Current date carried by the context.
    pub fn current_date(&self) -> Option<&str> {
        self.base.ctx.current_date.as_deref()
    }

    /// Read every valid block of one row.
    ///
    /// `n_blocks` comes from the sheet width, so short rows simply run out of
    /// blocks early.
    pub fn parse_row(&mut self, row: &[EnumCellValue], n_blocks: usize) -> Vec<SpecRecord> {
        let options = self.base.options;
        let n_width_block = options.width_fixed_block;
        let mut l_records = Vec::new();

        for n_idx_block in 0..n_blocks {
            let n_offset = n_idx_block * n_width_block;
            let n_col_name = n_offset + N_OFFSET_NAME;
            let n_col_product = n_offset + N_OFFSET_PRODUCT;
            if n_col_name >= row.len() || n_col_product >= row.len() {
                continue;
            }

            let value_name = &row[n_col_name];
            if !is_valid_name(value_name, &options.names_stoplist) {
                continue;
            }
            let Some(c_product) = row[n_col_product]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty() && !contains_any(s, &options.markers_product_header))
            else {
                continue;
            };

            // Dates may change per row here.
            if let Some(date) = parse_date(&row[n_offset + N_OFFSET_DATE]) {
                self.base.ctx.set_date(date);
            }

            let read =
                |n_offset_field: usize| row.get(n_offset + n_offset_field).unwrap_or(&CELL_NONE);
            let value_quantity = read(N_OFFSET_QUANTITY);
            let value_amount = read(N_OFFSET_AMOUNT);
            let value_note = read(N_OFFSET_NOTE);
            if !evaluate_has_data(value_quantity, value_amount, value_note) {
                continue;
            }

            let c_name = derive_cell_text(value_name);
            let c_batch = derive_cell_text(read(N_OFFSET_BATCH));
            let record = self.base.create_record(SpecRecordDraft {
                name: &c_name,
                product: c_product,
                quantity: value_quantity,
                price: read(N_OFFSET_PRICE),
                amount: value_amount,
                batch: (!c_batch.is_empty()).then_some(c_batch.as_str()),
                note: value_note,
            });
            l_records.extend(record);
        }
        l_records
    }
}

impl WorkshopExtractor for FixedBlockExtractor<'_> {
    fn scan(&mut self, sheet: &SpecSheetGrid) -> Vec<SpecRecord> {
        let n_blocks = calculate_block_count(sheet.width(), self.base.options.width_fixed_block);
        info!(
            workshop = %self.base.workshop,
            strategy = ?self.strategy,
            rows = sheet.height(),
            blocks = n_blocks,
            "scanning fixed-block sheet"
        );
        self.base.begin_sheet(sheet);

        let mut l_records = Vec::new();
        for row in sheet.rows() {
            if row.iter().all(EnumCellValue::is_empty) {
                continue;
            }
            self.base.ctx.scan_metadata_row(row, self.base.options);
            l_records.extend(self.parse_row(row, n_blocks));
        }
        l_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> EnumCellValue {
        EnumCellValue::text(s)
    }

    fn num(n: f64) -> EnumCellValue {
        EnumCellValue::Number(n)
    }

    fn block(date: EnumCellValue, name: &str, batch: &str, product: &str) -> Vec<EnumCellValue> {
        vec![
            date,
            text(name),
            text(batch),
            text(product),
            num(3.0),
            num(4.0),
            EnumCellValue::None,
            EnumCellValue::None,
        ]
    }

    #[test]
    fn test_seventeen_columns_give_three_candidate_blocks() {
        let options = SpecExtractOptions::default();
        let mut row = block(text("2024-03-05"), "张三", "B1", "鸭肉卷");
        row.extend(block(EnumCellValue::None, "合计", "", "鸭肉卷"));
        row.push(text("尾注"));
        assert_eq!(row.len(), 17);
        assert_eq!(calculate_block_count(row.len(), options.width_fixed_block), 3);

        let mut extractor =
            FixedBlockExtractor::new("包装B", EnumWorkshopStrategy::Packing, &options);
        let l_records = extractor.parse_row(&row, 3);

        // Second block has a stoplisted name, third is cut off by the row width.
        assert_eq!(l_records.len(), 1);
        let record = &l_records[0];
        assert_eq!(record.name, "张三");
        assert_eq!(record.batch, "B1");
        assert_eq!(record.product, "鸭肉卷");
        assert_eq!(record.amount, 12.0);
        assert_eq!(record.date.as_deref(), Some("2024/03/05"));
        assert_eq!(record.workshop, "包装B");
    }

    #[test]
    fn test_header_like_product_cells_are_skipped() {
        let options = SpecExtractOptions::default();
        let mut extractor =
            FixedBlockExtractor::new("包装", EnumWorkshopStrategy::Packing, &options);
        let row = block(text("2024-03-05"), "李四", "B1", "产品名称");
        assert!(extractor.parse_row(&row, 1).is_empty());
        // Rejected blocks leave the date untouched.
        assert_eq!(extractor.current_date(), None);
    }

    #[test]
    fn test_scan_carries_date_and_batch_from_metadata_rows() {
        let options = SpecExtractOptions::default();
        let grid = SpecSheetGrid::new(
            "挑选",
            vec![
                vec![text("日期：2024年3月5日"), EnumCellValue::None, text("批次号：P-3")],
                vec![],
                block(EnumCellValue::None, "王五", "", "鸡肉干"),
                block(EnumCellValue::DateSerial(45000.0), "赵六", "", "鸡肉干"),
            ],
        );
        let mut extractor =
            FixedBlockExtractor::new("挑选", EnumWorkshopStrategy::Packing, &options);
        let l_records = extractor.scan(&grid);

        assert_eq!(l_records.len(), 2);
        assert_eq!(l_records[0].date.as_deref(), Some("2024/03/05"));
        assert_eq!(l_records[0].batch, "P-3");
        assert_eq!(l_records[1].date.as_deref(), Some("2023/03/15"));
    }

    #[test]
    fn test_date_shaped_batch_and_zero_serial_keep_carried_date() {
        let options = SpecExtractOptions::default();
        let mut l_rows = vec![vec![text("日期：2024年3月5日")]];
        l_rows.push(block(EnumCellValue::None, "王五", "2024-03-01-02", "鸡肉干"));
        l_rows.push(block(EnumCellValue::DateSerial(0.0), "赵六", "", "鸡肉干"));
        // Same rows again past the seed window.
        l_rows.extend(std::iter::repeat_n(vec![], options.rows_metadata_scan));
        l_rows.push(block(EnumCellValue::None, "王五", "2024-03-01-02", "鸡肉干"));
        l_rows.push(block(EnumCellValue::DateSerial(0.0), "赵六", "", "鸡肉干"));
        let grid = SpecSheetGrid::new("包装", l_rows);

        let mut extractor =
            FixedBlockExtractor::new("包装", EnumWorkshopStrategy::Packing, &options);
        let l_records = extractor.scan(&grid);

        assert_eq!(l_records.len(), 4);
        assert!(
            l_records
                .iter()
                .all(|r| r.date.as_deref() == Some("2024/03/05"))
        );
        assert_eq!(l_records[0].batch, "2024-03-01-02");
        assert_eq!(l_records[1].batch, "0");
    }
}
