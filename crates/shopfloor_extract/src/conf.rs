//! Extraction constants and default preset factories.

use crate::spec::{EnumWorkshopStrategy, SpecExtractOptions, SpecWorkshopRoute};

/// Leading rows scanned once for metadata before row dispatch starts.
pub const N_ROWS_METADATA_SCAN: usize = 10;
/// Column width of one tiled block in fixed-block sheets.
pub const N_WIDTH_FIXED_BLOCK: usize = 8;
/// Column width of one product block in repeating-block sheets.
pub const N_WIDTH_REPEATING_BLOCK: usize = 4;
/// Columns right of a quantity column searched for price/amount/note headers.
pub const N_COLS_ROLE_LOOKAHEAD: usize = 4;
/// Rows above a header row searched for product labels.
pub const N_ROWS_PRODUCT_LABEL_LOOKBACK: usize = 5;
/// Spreadsheet serial-date epoch as `(year, month, day)`.
pub const TUP_SERIAL_DATE_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Batch value used before any batch label is seen.
pub const C_BATCH_DEFAULT: &str = "0";
/// Prefix of generated product placeholders (`产品1`, `产品2`, ...).
pub const C_PRODUCT_PLACEHOLDER_PREFIX: &str = "产品";
/// Full-width colon separating a label from its value.
pub const CHR_LABEL_SEPARATOR: char = '：';

/// Structural labels that are never worker names.
pub const TUP_NAMES_STOPLIST: [&str; 6] = [
    "姓名",
    "合计",
    "序号",
    "日期",
    "优萌宠物车间生产日报表",
    "生产日报表",
];
/// Any of these in a cell marks a candidate header row.
pub const TUP_KEYWORDS_HEADER: [&str; 7] = ["数量", "单价", "金额", "件数", "价格", "总价", "备注"];
/// Header text opening a product block.
pub const TUP_KEYWORDS_QUANTITY: [&str; 2] = ["数量", "件数"];
/// Header text of a unit-price column.
pub const TUP_KEYWORDS_PRICE: [&str; 2] = ["单价", "价格"];
/// Header text of an amount column.
pub const TUP_KEYWORDS_AMOUNT: [&str; 2] = ["金额", "总价"];
/// Header text of a note column.
pub const TUP_KEYWORDS_NOTE: [&str; 1] = ["备注"];
/// Labels carrying the current batch number.
pub const TUP_LABELS_BATCH: [&str; 2] = ["批次号：", "批号："];
/// Labels carrying a product name.
pub const TUP_LABELS_PRODUCT: [&str; 2] = ["产品名称：", "品名："];
/// Text in a product cell that marks a header position, not data.
pub const TUP_MARKERS_PRODUCT_HEADER: [&str; 2] = ["产品名称", "品名"];

/// Output table columns, in writer order.
pub const TUP_RECORD_COLUMNS: [&str; 10] = [
    "日期",
    "姓名",
    "批次号",
    "产品名称",
    "数量",
    "计量单位",
    "单价",
    "金额",
    "车间名称",
    "备注",
];

fn derive_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|val| (*val).to_string()).collect()
}

/// Build the default sheet-name routing table, checked in order.
pub fn derive_default_workshop_routes() -> Vec<SpecWorkshopRoute> {
    vec![
        SpecWorkshopRoute::new("绕肉", EnumWorkshopStrategy::Wrapping),
        SpecWorkshopRoute::new("制作", EnumWorkshopStrategy::Making),
        SpecWorkshopRoute::new("包装", EnumWorkshopStrategy::Packing),
        SpecWorkshopRoute::new("挑选", EnumWorkshopStrategy::Packing),
    ]
}

/// Build default extraction options.
pub fn derive_default_extract_options() -> SpecExtractOptions {
    SpecExtractOptions {
        names_stoplist: derive_owned(&TUP_NAMES_STOPLIST),
        keywords_header: derive_owned(&TUP_KEYWORDS_HEADER),
        keywords_quantity: derive_owned(&TUP_KEYWORDS_QUANTITY),
        keywords_price: derive_owned(&TUP_KEYWORDS_PRICE),
        keywords_amount: derive_owned(&TUP_KEYWORDS_AMOUNT),
        keywords_note: derive_owned(&TUP_KEYWORDS_NOTE),
        labels_batch: derive_owned(&TUP_LABELS_BATCH),
        labels_product: derive_owned(&TUP_LABELS_PRODUCT),
        markers_product_header: derive_owned(&TUP_MARKERS_PRODUCT_HEADER),
        products_fallback: vec![],
        routes: derive_default_workshop_routes(),
        rows_metadata_scan: N_ROWS_METADATA_SCAN,
        width_fixed_block: N_WIDTH_FIXED_BLOCK,
    }
}
