//! Workshop extractors: shared base behavior and the common scan interface.
//!
//! - `repeating` : header-inferred 4-column product blocks
//! - `fixed`     : fixed-width 8-column tiled blocks

pub mod fixed;
pub mod repeating;

use tracing::debug;

use crate::context::SpecExtractContext;
use crate::spec::{EnumCellValue, SpecExtractOptions, SpecRecord, SpecSheetGrid};
use crate::util::derive_cell_text;
use crate::validate::{convert_cell_number, is_valid_number, validate_record};

pub use fixed::FixedBlockExtractor;
pub use repeating::RepeatingBlockExtractor;

/// One extraction strategy bound to one sheet.
pub trait WorkshopExtractor {
    /// Scan the sheet top to bottom and return its validated records.
    fn scan(&mut self, sheet: &SpecSheetGrid) -> Vec<SpecRecord>;
}

/// Raw field values of a candidate record, before coercion.
#[derive(Debug, Clone, Copy)]
pub struct SpecRecordDraft<'a> {
    /// Trimmed worker name.
    pub name: &'a str,
    /// Product name.
    pub product: &'a str,
    /// Quantity cell.
    pub quantity: &'a EnumCellValue,
    /// Unit-price cell.
    pub price: &'a EnumCellValue,
    /// Amount cell.
    pub amount: &'a EnumCellValue,
    /// Block batch; `None` falls back to the context batch.
    pub batch: Option<&'a str>,
    /// Note cell.
    pub note: &'a EnumCellValue,
}

/// State and helpers shared by every strategy.
#[derive(Debug, Clone)]
pub struct WorkshopBase<'a> {
    /// Workshop name stamped on records (the sheet name).
    pub workshop: String,
    /// Carry-forward context of the current sheet.
    pub ctx: SpecExtractContext,
    /// Engine options.
    pub options: &'a SpecExtractOptions,
}

impl<'a> WorkshopBase<'a> {
    /// Create base state for one sheet.
    pub fn new(workshop: impl Into<String>, options: &'a SpecExtractOptions) -> Self {
        Self {
            workshop: workshop.into(),
            ctx: SpecExtractContext::default(),
            options,
        }
    }

    /// Start a fresh context and seed it from the leading rows.
    pub fn begin_sheet(&mut self, sheet: &SpecSheetGrid) {
        self.ctx = SpecExtractContext::default();
        for row in sheet.rows().take(self.options.rows_metadata_scan) {
            self.ctx.scan_seed_row(row, self.options);
        }
        debug!(
            workshop = %self.workshop,
            date = ?self.ctx.current_date,
            batch = %self.ctx.current_batch,
            "seeded sheet metadata"
        );
    }

    /// Coerce, derive the amount and validate; `None` when the record is incomplete.
    pub fn create_record(&self, draft: SpecRecordDraft<'_>) -> Option<SpecRecord> {
        let n_quantity = convert_cell_number(draft.quantity).unwrap_or(0.0);
        let n_price = convert_cell_number(draft.price).unwrap_or(0.0);
        let mut n_amount = convert_cell_number(draft.amount).unwrap_or(0.0);
        if n_amount == 0.0 && n_quantity != 0.0 && n_price != 0.0 {
            n_amount = n_quantity * n_price;
        }

        let record = SpecRecord {
            date: self.ctx.current_date.clone(),
            name: draft.name.to_string(),
            batch: draft
                .batch
                .map_or_else(|| self.ctx.current_batch.clone(), ToString::to_string),
            product: draft.product.to_string(),
            quantity: n_quantity,
            unit: String::new(),
            price: n_price,
            amount: n_amount,
            workshop: self.workshop.clone(),
            note: derive_cell_text(draft.note),
        };

        if validate_record(&record) {
            Some(record)
        } else {
            debug!(name = %record.name, product = %record.product, "incomplete record dropped");
            None
        }
    }
}

/// Whether a block carries enough signal to become a record.
///
/// Checked in order, first hit wins: numeric quantity, numeric amount,
/// non-blank note.
pub fn evaluate_has_data(
    quantity: &EnumCellValue,
    amount: &EnumCellValue,
    note: &EnumCellValue,
) -> bool {
    if is_valid_number(quantity) {
        return true;
    }
    if is_valid_number(amount) {
        return true;
    }
    !derive_cell_text(note).is_empty()
}
