//! Record table: records as a polars `DataFrame`, plus Arrow IPC export.

use std::io::Cursor;

use polars::prelude::{Column, DataFrame, IpcReader, IpcWriter, SerReader, SerWriter};
use shopfloor_extract::{SpecRecord, TUP_RECORD_COLUMNS};

/// Build the output table; columns follow [`TUP_RECORD_COLUMNS`].
///
/// Missing dates stay null; numbers are `f64`; everything else is text.
pub fn derive_dataframe_from_records(records: &[SpecRecord]) -> Result<DataFrame, String> {
    let [
        c_col_date,
        c_col_name,
        c_col_batch,
        c_col_product,
        c_col_quantity,
        c_col_unit,
        c_col_price,
        c_col_amount,
        c_col_workshop,
        c_col_note,
    ] = TUP_RECORD_COLUMNS;

    let text = |name: &str, f: fn(&SpecRecord) -> &str| {
        let values: Vec<&str> = records.iter().map(f).collect();
        Column::new(name.into(), values)
    };
    let number = |name: &str, f: fn(&SpecRecord) -> f64| {
        let values: Vec<f64> = records.iter().map(f).collect();
        Column::new(name.into(), values)
    };
    let l_dates: Vec<Option<&str>> = records.iter().map(|r| r.date.as_deref()).collect();

    DataFrame::new(vec![
        Column::new(c_col_date.into(), l_dates),
        text(c_col_name, |r| &r.name),
        text(c_col_batch, |r| &r.batch),
        text(c_col_product, |r| &r.product),
        number(c_col_quantity, |r| r.quantity),
        text(c_col_unit, |r| &r.unit),
        number(c_col_price, |r| r.price),
        number(c_col_amount, |r| r.amount),
        text(c_col_workshop, |r| &r.workshop),
        text(c_col_note, |r| &r.note),
    ])
    .map_err(|err| format!("Failed to build record table: {err}"))
}

/// Serialize a table as Arrow IPC bytes.
pub fn convert_dataframe_to_ipc_bytes(df: &mut DataFrame) -> Result<Vec<u8>, String> {
    let mut v_ipc = Vec::new();
    IpcWriter::new(&mut v_ipc)
        .finish(df)
        .map_err(|err| format!("Failed to write IPC DataFrame bytes: {err}"))?;
    Ok(v_ipc)
}

/// Read a table back from Arrow IPC bytes.
pub fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, String> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))
}

/// Records straight to Arrow IPC bytes.
pub fn convert_records_to_ipc_bytes(records: &[SpecRecord]) -> Result<Vec<u8>, String> {
    let mut df = derive_dataframe_from_records(records)?;
    convert_dataframe_to_ipc_bytes(&mut df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: Option<&str>) -> SpecRecord {
        SpecRecord {
            date: date.map(ToString::to_string),
            name: name.to_string(),
            batch: "B1".to_string(),
            product: "鸭肉卷".to_string(),
            quantity: 10.0,
            unit: String::new(),
            price: 5.0,
            amount: 50.0,
            workshop: "绕肉A".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_derive_dataframe_from_records_columns_in_order() {
        let df = derive_dataframe_from_records(&[
            record("张三", Some("2024/03/05")),
            record("李四", None),
        ])
        .expect("table");

        assert_eq!(df.height(), 2);
        let l_names: Vec<&str> = df.get_column_names_str();
        assert_eq!(l_names, TUP_RECORD_COLUMNS.to_vec());
        assert!(df.get_columns()[4].dtype().is_numeric());
        assert_eq!(df.get_columns()[0].null_count(), 1);
    }

    #[test]
    fn test_ipc_bytes_read_back_same_shape() {
        let v_ipc = convert_records_to_ipc_bytes(&[record("张三", Some("2024/03/05"))])
            .expect("ipc");
        let df = derive_dataframe_from_ipc_bytes(&v_ipc).expect("read ipc");
        assert_eq!(df.shape(), (1, TUP_RECORD_COLUMNS.len()));
    }
}
