//! Per-sheet mutable state carried across rows.

use tracing::debug;

use crate::conf::C_BATCH_DEFAULT;
use crate::date::{parse_date, parse_date_text, search_date_text};
use crate::spec::{EnumCellValue, SpecColumnRole, SpecExtractOptions};
use crate::util::derive_label_value;

/// Carry-forward context of one sheet scan.
///
/// Date and batch stick until a later row replaces them; products only grow;
/// `headers` is swapped wholesale on every recognized header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtractContext {
    /// Latest canonical date seen.
    pub current_date: Option<String>,
    /// Latest batch label value.
    pub current_batch: String,
    /// Product names in first-seen order.
    pub current_products: Vec<String>,
    /// Column layout from the latest header row, 4 roles per block.
    pub headers: Vec<SpecColumnRole>,
}

impl Default for SpecExtractContext {
    fn default() -> Self {
        Self {
            current_date: None,
            current_batch: C_BATCH_DEFAULT.to_string(),
            current_products: Vec::new(),
            headers: Vec::new(),
        }
    }
}

impl SpecExtractContext {
    /// Overwrite the current date.
    pub fn set_date(&mut self, date: String) {
        if self.current_date.as_deref() != Some(date.as_str()) {
            debug!(date = %date, "context date updated");
        }
        self.current_date = Some(date);
    }

    /// Overwrite the current batch; an empty label value resets to `"0"`.
    pub fn set_batch(&mut self, batch: &str) {
        self.current_batch = if batch.is_empty() {
            C_BATCH_DEFAULT.to_string()
        } else {
            batch.to_string()
        };
    }

    /// Append a product unless it is already known.
    pub fn push_product(&mut self, product: &str) {
        if !product.is_empty() && !self.current_products.iter().any(|p| p == product) {
            self.current_products.push(product.to_string());
        }
    }

    /// Replace the inferred column layout.
    pub fn replace_headers(&mut self, headers: Vec<SpecColumnRole>) {
        self.headers = headers;
    }

    /// Pick up date, batch and product labels from one cell.
    ///
    /// Dates must fill the whole cell here; labels with an embedded date are
    /// only honored by [`Self::scan_seed_row`]. Plain numbers are skipped.
    pub fn scan_metadata_cell(&mut self, value: &EnumCellValue, options: &SpecExtractOptions) {
        self.scan_cell(value, options, false);
    }

    /// Scan every cell of a row for metadata, left to right.
    pub fn scan_metadata_row(&mut self, row: &[EnumCellValue], options: &SpecExtractOptions) {
        for value in row {
            self.scan_cell(value, options, false);
        }
    }

    /// Seed-scan variant of [`Self::scan_metadata_row`] that also finds dates
    /// inside longer labels (`日期：2024年3月5日`).
    pub fn scan_seed_row(&mut self, row: &[EnumCellValue], options: &SpecExtractOptions) {
        for value in row {
            self.scan_cell(value, options, true);
        }
    }

    fn scan_cell(
        &mut self,
        value: &EnumCellValue,
        options: &SpecExtractOptions,
        if_search_embedded_dates: bool,
    ) {
        match value {
            EnumCellValue::DateSerial(_) => {
                if let Some(date) = parse_date(value) {
                    self.set_date(date);
                }
            }
            EnumCellValue::String(s) => {
                let c_text = s.trim();
                if c_text.is_empty() {
                    return;
                }
                let date = parse_date_text(c_text).or_else(|| {
                    if_search_embedded_dates
                        .then(|| search_date_text(c_text))
                        .flatten()
                });
                if let Some(date) = date {
                    self.set_date(date);
                }
                if let Some(batch) = derive_label_value(c_text, &options.labels_batch) {
                    self.set_batch(&batch);
                }
                if let Some(product) = derive_label_value(c_text, &options.labels_product) {
                    self.push_product(&product);
                }
            }
            EnumCellValue::None | EnumCellValue::Number(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_seed_row_updates_date_batch_products() {
        let options = SpecExtractOptions::default();
        let mut ctx = SpecExtractContext::default();
        assert_eq!(ctx.current_batch, "0");

        ctx.scan_seed_row(
            &[
                EnumCellValue::text("生产日报表"),
                EnumCellValue::text("日期：2024年3月5日"),
                EnumCellValue::text("批次号：B-01"),
                EnumCellValue::text("产品名称：螺旋三明治"),
                EnumCellValue::Number(12.0),
            ],
            &options,
        );

        assert_eq!(ctx.current_date.as_deref(), Some("2024/03/05"));
        assert_eq!(ctx.current_batch, "B-01");
        assert_eq!(ctx.current_products, vec!["螺旋三明治".to_string()]);
    }

    #[test]
    fn test_context_values_stick_until_replaced() {
        let options = SpecExtractOptions::default();
        let mut ctx = SpecExtractContext::default();

        ctx.scan_metadata_row(&[EnumCellValue::text("2024-03-05")], &options);
        ctx.scan_metadata_row(&[EnumCellValue::text("无关内容")], &options);
        assert_eq!(ctx.current_date.as_deref(), Some("2024/03/05"));

        ctx.scan_metadata_row(&[EnumCellValue::DateSerial(45000.0)], &options);
        assert_eq!(ctx.current_date.as_deref(), Some("2023/03/15"));

        ctx.scan_metadata_row(&[EnumCellValue::text("批号：")], &options);
        assert_eq!(ctx.current_batch, "0");
    }

    #[test]
    fn test_scan_metadata_row_ignores_embedded_dates_and_zero_serials() {
        let options = SpecExtractOptions::default();
        let mut ctx = SpecExtractContext::default();
        ctx.scan_seed_row(&[EnumCellValue::text("日期：2024年3月5日")], &options);
        assert_eq!(ctx.current_date.as_deref(), Some("2024/03/05"));

        ctx.scan_metadata_row(
            &[
                EnumCellValue::text("2024-03-01-02"),
                EnumCellValue::text("生产日期 2024-03-07"),
                EnumCellValue::DateSerial(0.0),
            ],
            &options,
        );
        assert_eq!(ctx.current_date.as_deref(), Some("2024/03/05"));

        ctx.scan_seed_row(&[EnumCellValue::DateSerial(0.0)], &options);
        assert_eq!(ctx.current_date.as_deref(), Some("2024/03/05"));
    }

    #[test]
    fn test_push_product_is_append_if_absent() {
        let mut ctx = SpecExtractContext::default();
        ctx.push_product("A");
        ctx.push_product("B");
        ctx.push_product("A");
        ctx.push_product("");
        assert_eq!(ctx.current_products, vec!["A".to_string(), "B".to_string()]);
    }
}
