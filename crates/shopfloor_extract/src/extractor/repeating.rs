//! Repeating-block strategy: product blocks of (quantity, price, amount, note)
//! inferred from header rows, then read back from each worker row.

use tracing::{debug, info, warn};

use crate::conf::{
    C_BATCH_DEFAULT, C_PRODUCT_PLACEHOLDER_PREFIX, N_COLS_ROLE_LOOKAHEAD,
    N_ROWS_PRODUCT_LABEL_LOOKBACK, N_WIDTH_REPEATING_BLOCK,
};
use crate::context::SpecExtractContext;
use crate::date::{parse_date_text, search_date_text};
use crate::extractor::{SpecRecordDraft, WorkshopBase, WorkshopExtractor, evaluate_has_data};
use crate::spec::{
    CELL_NONE, EnumCellValue, EnumColumnRole, EnumWorkshopStrategy, SpecColumnRole,
    SpecExtractOptions, SpecRecord, SpecSheetGrid,
};
use crate::util::{cell_contains_any, derive_cell_text, derive_label_value};
use crate::validate::is_valid_name;

/// Extractor for sheets that lay products side by side in 4-column groups.
///
/// Serves both [`EnumWorkshopStrategy::Wrapping`] and
/// [`EnumWorkshopStrategy::Making`]; the variant only labels logs.
#[derive(Debug, Clone)]
pub struct RepeatingBlockExtractor<'a> {
    base: WorkshopBase<'a>,
    strategy: EnumWorkshopStrategy,
}

impl<'a> RepeatingBlockExtractor<'a> {
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

    /// Carry-forward context as of the last scanned row.
    pub fn context(&self) -> &SpecExtractContext {
        &self.base.ctx
    }

    /// Header row: second cell is not a name and some cell holds a column keyword.
    pub fn is_header_row(&self, row: &[EnumCellValue]) -> bool {
        let options = self.base.options;
        if row
            .get(1)
            .is_some_and(|value| is_valid_name(value, &options.names_stoplist))
        {
            return false;
        }
        row.iter()
            .any(|value| cell_contains_any(value, &options.keywords_header))
    }

    /// Data row: second cell is a plausible worker name.
    pub fn is_data_row(&self, row: &[EnumCellValue]) -> bool {
        row.get(1)
            .is_some_and(|value| is_valid_name(value, &self.base.options.names_stoplist))
    }

    /// Rebuild the block layout from the header row at `row_idx`.
    pub fn parse_header_row(&mut self, sheet: &SpecSheetGrid, row_idx: usize) {
        let options = self.base.options;
        let row = sheet.row(row_idx);

        let l_cols_quantity: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, value)| cell_contains_any(value, &options.keywords_quantity))
            .map(|(n_idx_col, _)| n_idx_col)
            .collect();
        let l_products_labeled = derive_product_labels_above(sheet, row_idx, options);

        let mut l_headers = Vec::with_capacity(l_cols_quantity.len() * N_WIDTH_REPEATING_BLOCK);
        for (n_idx_block, &n_col_quantity) in l_cols_quantity.iter().enumerate() {
            let c_batch = derive_block_batch(sheet, row_idx, n_col_quantity, options);
            let c_product =
                self.derive_block_product(sheet, row_idx, n_col_quantity, n_idx_block, &l_products_labeled);
            self.base.ctx.push_product(&c_product);

            let [n_col_price, n_col_amount, n_col_note] =
                locate_role_columns(row, n_col_quantity, options);
            for (role, col_idx) in [
                (EnumColumnRole::Quantity, Some(n_col_quantity)),
                (EnumColumnRole::Price, n_col_price),
                (EnumColumnRole::Amount, n_col_amount),
                (EnumColumnRole::Note, n_col_note),
            ] {
                l_headers.push(SpecColumnRole {
                    col_idx,
                    role,
                    product: c_product.clone(),
                    batch: c_batch.clone(),
                });
            }
        }

        debug!(
            workshop = %self.base.workshop,
            row = row_idx,
            blocks = l_cols_quantity.len(),
            "header row parsed"
        );
        self.base.ctx.replace_headers(l_headers);
    }

    /// Read one record per block of the current layout.
    pub fn parse_data_row(&self, row: &[EnumCellValue]) -> Vec<SpecRecord> {
        let c_name = row.get(1).map(derive_cell_text).unwrap_or_default();
        let read = |role: &SpecColumnRole| {
            role.col_idx
                .and_then(|n_idx_col| row.get(n_idx_col))
                .unwrap_or(&CELL_NONE)
        };

        let mut l_records = Vec::new();
        for block in self.base.ctx.headers.chunks_exact(N_WIDTH_REPEATING_BLOCK) {
            let [role_quantity, role_price, role_amount, role_note] = block else {
                continue;
            };
            let value_quantity = read(role_quantity);
            let value_amount = read(role_amount);
            let value_note = read(role_note);
            if !evaluate_has_data(value_quantity, value_amount, value_note) {
                continue;
            }

            let record = self.base.create_record(SpecRecordDraft {
                name: &c_name,
                product: &role_quantity.product,
                quantity: value_quantity,
                price: read(role_price),
                amount: value_amount,
                batch: Some(&role_quantity.batch),
                note: value_note,
            });
            l_records.extend(record);
        }
        l_records
    }

    fn derive_block_product(
        &self,
        sheet: &SpecSheetGrid,
        row_idx: usize,
        n_col_quantity: usize,
        n_idx_block: usize,
        products_labeled: &[String],
    ) -> String {
        let options = self.base.options;
        if row_idx > 0 {
            let c_above = derive_cell_text(sheet.cell(row_idx - 1, n_col_quantity));
            let c_product = derive_label_value(&c_above, &options.labels_product).unwrap_or(c_above);
            if !c_product.is_empty() && !is_date_label(&c_product) {
                return c_product;
            }
        }
        if let Some(product) = products_labeled.get(n_idx_block) {
            return product.clone();
        }
        if let Some(product) = options.products_fallback.get(n_idx_block) {
            warn!(
                workshop = %self.base.workshop,
                row = row_idx,
                product = %product,
                "no product name near header; using configured fallback"
            );
            return product.clone();
        }
        format!(
            "{C_PRODUCT_PLACEHOLDER_PREFIX}{}",
            self.base.ctx.current_products.len() + 1
        )
    }
}

impl WorkshopExtractor for RepeatingBlockExtractor<'_> {
    fn scan(&mut self, sheet: &SpecSheetGrid) -> Vec<SpecRecord> {
        info!(
            workshop = %self.base.workshop,
            strategy = ?self.strategy,
            rows = sheet.height(),
            "scanning repeating-block sheet"
        );
        self.base.begin_sheet(sheet);

        let mut l_records = Vec::new();
        for row_idx in 0..sheet.height() {
            let row = sheet.row(row_idx);
            if self.is_header_row(row) {
                self.parse_header_row(sheet, row_idx);
            } else if self.is_data_row(row) {
                l_records.extend(self.parse_data_row(row));
            } else {
                self.base.ctx.scan_metadata_row(row, self.base.options);
            }
        }
        l_records
    }
}

/// Batch of a block: the cell above-left of its quantity column.
///
/// Blank cells and date labels give `"0"`.
fn derive_block_batch(
    sheet: &SpecSheetGrid,
    row_idx: usize,
    n_col_quantity: usize,
    options: &SpecExtractOptions,
) -> String {
    if row_idx == 0 || n_col_quantity == 0 {
        return C_BATCH_DEFAULT.to_string();
    }
    let c_text = derive_cell_text(sheet.cell(row_idx - 1, n_col_quantity - 1));
    if is_date_label(&c_text) {
        return C_BATCH_DEFAULT.to_string();
    }
    let c_batch = derive_label_value(&c_text, &options.labels_batch).unwrap_or(c_text);
    if c_batch.is_empty() {
        C_BATCH_DEFAULT.to_string()
    } else {
        c_batch
    }
}

fn is_date_label(text: &str) -> bool {
    parse_date_text(text).is_some() || search_date_text(text).is_some()
}

/// Price/amount/note columns of the block opened at `n_col_quantity`.
///
/// Keyword hits in the next few columns win; the search stops at the next
/// quantity column. Missing roles fall back to +1/+2/+3 when that column
/// still belongs to the block.
fn locate_role_columns(
    row: &[EnumCellValue],
    n_col_quantity: usize,
    options: &SpecExtractOptions,
) -> [Option<usize>; 3] {
    let n_col_end = usize::min(n_col_quantity + 1 + N_COLS_ROLE_LOOKAHEAD, row.len());
    let n_col_next_block = (n_col_quantity + 1..row.len())
        .find(|&n_idx_col| cell_contains_any(&row[n_idx_col], &options.keywords_quantity))
        .unwrap_or(row.len());

    let mut l_cols: [Option<usize>; 3] = [None; 3];
    for n_idx_col in (n_col_quantity + 1)..usize::min(n_col_end, n_col_next_block) {
        let value = &row[n_idx_col];
        let n_slot = if cell_contains_any(value, &options.keywords_price) {
            0
        } else if cell_contains_any(value, &options.keywords_amount) {
            1
        } else if cell_contains_any(value, &options.keywords_note) {
            2
        } else {
            continue;
        };
        if l_cols[n_slot].is_none() {
            l_cols[n_slot] = Some(n_idx_col);
        }
    }

    for (n_slot, col_idx) in l_cols.iter_mut().enumerate() {
        if col_idx.is_none() {
            let n_col_positional = n_col_quantity + n_slot + 1;
            if n_col_positional < n_col_next_block {
                *col_idx = Some(n_col_positional);
            }
        }
    }
    l_cols
}

/// Product labels (`产品名称：X`) in the rows just above a header row.
fn derive_product_labels_above(
    sheet: &SpecSheetGrid,
    row_idx: usize,
    options: &SpecExtractOptions,
) -> Vec<String> {
    let mut l_products: Vec<String> = Vec::new();
    for n_idx_row in row_idx.saturating_sub(N_ROWS_PRODUCT_LABEL_LOOKBACK)..row_idx {
        for value in sheet.row(n_idx_row) {
            let Some(text) = value.as_str() else {
                continue;
            };
            if let Some(product) = derive_label_value(text.trim(), &options.labels_product)
                && !product.is_empty()
                && !l_products.contains(&product)
            {
                l_products.push(product);
            }
        }
    }
    l_products
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

    fn header_row() -> Vec<EnumCellValue> {
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
        ]
    }

    fn sheet(rows: Vec<Vec<EnumCellValue>>) -> SpecSheetGrid {
        SpecSheetGrid::new("绕肉A", rows)
    }

    #[test]
    fn test_header_with_two_quantity_columns_yields_two_ordered_blocks() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![
            vec![
                text("日期：2024-03-05"),
                EnumCellValue::None,
                text("鸭肉卷"),
                EnumCellValue::None,
                EnumCellValue::None,
                text("批次号：B-2"),
                text("螺旋三明治"),
            ],
            header_row(),
        ]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉A", EnumWorkshopStrategy::Wrapping, &options);
        extractor.parse_header_row(&grid, 1);

        let headers = &extractor.context().headers;
        assert_eq!(headers.len(), 8);
        let l_roles: Vec<EnumColumnRole> = headers.iter().map(|h| h.role).collect();
        assert_eq!(
            l_roles,
            vec![
                EnumColumnRole::Quantity,
                EnumColumnRole::Price,
                EnumColumnRole::Amount,
                EnumColumnRole::Note,
                EnumColumnRole::Quantity,
                EnumColumnRole::Price,
                EnumColumnRole::Amount,
                EnumColumnRole::Note,
            ]
        );
        let l_cols: Vec<Option<usize>> = headers.iter().map(|h| h.col_idx).collect();
        assert_eq!(
            l_cols,
            vec![
                Some(2),
                Some(3),
                Some(4),
                Some(5),
                Some(6),
                Some(7),
                Some(8),
                Some(9)
            ]
        );
        assert_eq!(headers[0].product, "鸭肉卷");
        assert_eq!(headers[0].batch, "0");
        assert_eq!(headers[4].product, "螺旋三明治");
        assert_eq!(headers[4].batch, "B-2");
    }

    #[test]
    fn test_date_label_above_quantity_is_not_a_product() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![
            vec![
                EnumCellValue::None,
                EnumCellValue::None,
                text("日期：2024年3月5日"),
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::None,
                text("3月6日"),
            ],
            header_row(),
        ]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉A", EnumWorkshopStrategy::Wrapping, &options);
        extractor.parse_header_row(&grid, 1);

        let headers = &extractor.context().headers;
        assert_eq!(headers[0].product, "产品1");
        assert_eq!(headers[4].product, "产品2");
    }

    #[test]
    fn test_header_without_product_row_uses_placeholders() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![header_row()]);
        let mut extractor =
            RepeatingBlockExtractor::new("制作", EnumWorkshopStrategy::Making, &options);
        extractor.parse_header_row(&grid, 0);

        let headers = &extractor.context().headers;
        assert_eq!(headers[0].product, "产品1");
        assert_eq!(headers[4].product, "产品2");
        assert_eq!(
            extractor.context().current_products,
            vec!["产品1".to_string(), "产品2".to_string()]
        );
    }

    #[test]
    fn test_header_product_fallback_list_applies_by_block_index() {
        let options = SpecExtractOptions {
            products_fallback: vec!["甲".to_string(), "乙".to_string()],
            ..SpecExtractOptions::default()
        };
        let grid = sheet(vec![header_row()]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉", EnumWorkshopStrategy::Wrapping, &options);
        extractor.parse_header_row(&grid, 0);

        assert_eq!(extractor.context().headers[0].product, "甲");
        assert_eq!(extractor.context().headers[4].product, "乙");
    }

    #[test]
    fn test_header_roles_fall_back_to_positions_inside_the_block() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![vec![
            text("序号"),
            text("姓名"),
            text("件数"),
            text("x"),
            text("总价"),
            text("数量"),
        ]]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉", EnumWorkshopStrategy::Wrapping, &options);
        extractor.parse_header_row(&grid, 0);

        let l_cols: Vec<Option<usize>> = extractor
            .context()
            .headers
            .iter()
            .map(|h| h.col_idx)
            .collect();
        // Block 1: price positional, amount by keyword, note would hit the next block.
        // Block 2: nothing right of the quantity column.
        assert_eq!(
            l_cols,
            vec![Some(2), Some(3), Some(4), None, Some(5), None, None, None]
        );
    }

    #[test]
    fn test_row_classification() {
        let options = SpecExtractOptions::default();
        let extractor =
            RepeatingBlockExtractor::new("绕肉", EnumWorkshopStrategy::Wrapping, &options);

        assert!(extractor.is_header_row(&header_row()));
        assert!(!extractor.is_data_row(&header_row()));
        let row_data = vec![num(1.0), text("张三"), text("数量很多")];
        assert!(!extractor.is_header_row(&row_data));
        assert!(extractor.is_data_row(&row_data));
        let row_meta = vec![text("日期：2024-03-05"), EnumCellValue::None];
        assert!(!extractor.is_header_row(&row_meta));
        assert!(!extractor.is_data_row(&row_meta));
    }

    #[test]
    fn test_scan_reads_one_record_per_populated_block() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![
            vec![text("优萌宠物车间生产日报表"), text("日期：2024年3月5日")],
            header_row(),
            vec![
                num(1.0),
                text("张三"),
                num(10.0),
                num(5.0),
                EnumCellValue::None,
                EnumCellValue::None,
                num(4.0),
                num(2.5),
                num(11.0),
                text("加急"),
            ],
            vec![
                num(2.0),
                text("李四"),
                EnumCellValue::None,
                EnumCellValue::None,
                text("0abc"),
                text("  "),
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::None,
                text("返工"),
            ],
            vec![text("合计"), EnumCellValue::None, num(14.0)],
        ]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉A", EnumWorkshopStrategy::Wrapping, &options);
        let l_records = extractor.scan(&grid);

        assert_eq!(l_records.len(), 3);
        assert_eq!(l_records[0].name, "张三");
        assert_eq!(l_records[0].product, "产品1");
        assert_eq!(l_records[0].amount, 50.0);
        assert_eq!(l_records[0].date.as_deref(), Some("2024/03/05"));
        assert_eq!(l_records[0].batch, "0");
        assert_eq!(l_records[1].amount, 11.0);
        assert_eq!(l_records[1].note, "加急");
        assert_eq!(l_records[2].name, "李四");
        assert_eq!(l_records[2].product, "产品2");
        assert_eq!(l_records[2].quantity, 0.0);
        assert_eq!(l_records[2].note, "返工");
        assert!(l_records.iter().all(|r| r.workshop == "绕肉A"));
    }

    #[test]
    fn test_new_header_row_replaces_layout() {
        let options = SpecExtractOptions::default();
        let grid = sheet(vec![
            vec![text("2024-03-05")],
            header_row(),
            vec![text("批次号：C-9")],
            vec![text("序号"), text("姓名"), text("数量"), text("单价")],
            vec![num(1.0), text("王五"), num(3.0), num(2.0)],
        ]);
        let mut extractor =
            RepeatingBlockExtractor::new("绕肉", EnumWorkshopStrategy::Wrapping, &options);
        let l_records = extractor.scan(&grid);

        assert_eq!(extractor.context().headers.len(), 4);
        assert_eq!(l_records.len(), 1);
        assert_eq!(l_records[0].quantity, 3.0);
        assert_eq!(l_records[0].price, 2.0);
        assert_eq!(l_records[0].amount, 6.0);
        assert_eq!(l_records[0].batch, "0");
        assert_eq!(extractor.context().current_batch, "C-9");
    }
}
