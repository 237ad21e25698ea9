use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};
use shopfloor_extract::{ExtractError, ReportExtract, SpecExtractError, SpecRecord};
use shopfloor_io_xlsx::{
    C_FILE_NAME_RECORDS, EnumAutofitColumnsRule, SpecBatchOptions, SpecUpload, SpecXlsxReport,
    SpecXlsxWriteOptions, convert_records_to_ipc_bytes, extract_files, extract_uploads,
    write_records_xlsx,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "shopfloor.extract.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "Record")]
#[derive(Debug, Clone)]
struct PyRecord {
    #[pyo3(get)]
    date: Option<String>,
    #[pyo3(get)]
    name: String,
    #[pyo3(get)]
    batch: String,
    #[pyo3(get)]
    product: String,
    #[pyo3(get)]
    quantity: f64,
    #[pyo3(get)]
    unit: String,
    #[pyo3(get)]
    price: f64,
    #[pyo3(get)]
    amount: f64,
    #[pyo3(get)]
    workshop: String,
    #[pyo3(get)]
    note: String,
}

impl From<SpecRecord> for PyRecord {
    fn from(record: SpecRecord) -> Self {
        Self {
            date: record.date,
            name: record.name,
            batch: record.batch,
            product: record.product,
            quantity: record.quantity,
            unit: record.unit,
            price: record.price,
            amount: record.amount,
            workshop: record.workshop,
            note: record.note,
        }
    }
}

impl From<PyRecord> for SpecRecord {
    fn from(record: PyRecord) -> Self {
        Self {
            date: record.date,
            name: record.name,
            batch: record.batch,
            product: record.product,
            quantity: record.quantity,
            unit: record.unit,
            price: record.price,
            amount: record.amount,
            workshop: record.workshop,
            note: record.note,
        }
    }
}

#[pymethods]
impl PyRecord {
    #[new]
    #[pyo3(signature = (
        name,
        product,
        workshop,
        date = None,
        batch = "0".to_string(),
        quantity = 0.0,
        unit = String::new(),
        price = 0.0,
        amount = 0.0,
        note = String::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        product: String,
        workshop: String,
        date: Option<String>,
        batch: String,
        quantity: f64,
        unit: String,
        price: f64,
        amount: f64,
        note: String,
    ) -> Self {
        Self {
            date,
            name,
            batch,
            product,
            quantity,
            unit,
            price,
            amount,
            workshop,
            note,
        }
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict_record = PyDict::new(py);
        dict_record.set_item("date", self.date.clone())?;
        dict_record.set_item("name", &self.name)?;
        dict_record.set_item("batch", &self.batch)?;
        dict_record.set_item("product", &self.product)?;
        dict_record.set_item("quantity", self.quantity)?;
        dict_record.set_item("unit", &self.unit)?;
        dict_record.set_item("price", self.price)?;
        dict_record.set_item("amount", self.amount)?;
        dict_record.set_item("workshop", &self.workshop)?;
        dict_record.set_item("note", &self.note)?;
        Ok(dict_record)
    }

    fn __repr__(&self) -> String {
        format!(
            "Record(date={:?}, name={:?}, product={:?}, quantity={}, amount={}, workshop={:?})",
            self.date, self.name, self.product, self.quantity, self.amount, self.workshop
        )
    }
}

#[pyclass(name = "SpecExtractError")]
#[derive(Debug, Clone)]
struct PySpecExtractError {
    #[pyo3(get)]
    source: String,
    #[pyo3(get)]
    exception: String,
}

impl From<SpecExtractError> for PySpecExtractError {
    fn from(spec_error: SpecExtractError) -> Self {
        Self {
            source: spec_error.source,
            exception: spec_error.exception,
        }
    }
}

#[pyclass(name = "ReportExtract")]
#[derive(Debug, Clone)]
struct PyReportExtract {
    #[pyo3(get)]
    cnt_files_scanned: u64,
    #[pyo3(get)]
    cnt_files_skipped: u64,
    #[pyo3(get)]
    cnt_sheets_scanned: u64,
    #[pyo3(get)]
    cnt_records: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecExtractError>,
}

impl From<ReportExtract> for PyReportExtract {
    fn from(report: ReportExtract) -> Self {
        Self {
            cnt_files_scanned: report.cnt_files_scanned,
            cnt_files_skipped: report.cnt_files_skipped,
            cnt_sheets_scanned: report.cnt_sheets_scanned,
            cnt_records: report.cnt_records,
            warnings: report.warnings,
            errors: report
                .errors
                .into_iter()
                .map(PySpecExtractError::from)
                .collect(),
        }
    }
}

#[pymethods]
impl PyReportExtract {
    #[getter]
    fn error_count(&self) -> usize {
        self.errors.len()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_scanned".to_string(), self.cnt_files_scanned);
        dict_counts.insert("cnt_files_skipped".to_string(), self.cnt_files_skipped);
        dict_counts.insert("cnt_sheets_scanned".to_string(), self.cnt_sheets_scanned);
        dict_counts.insert("cnt_records".to_string(), self.cnt_records);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    #[pyo3(signature = (prefix = "[EXTRACT]"))]
    fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} files={} skipped={} sheets={} records={} errors={} warnings={}",
            self.cnt_files_scanned,
            self.cnt_files_skipped,
            self.cnt_sheets_scanned,
            self.cnt_records,
            self.error_count(),
            self.warning_count()
        )
    }

    fn __str__(&self) -> String {
        self.format("[EXTRACT]")
    }
}

#[pyclass(name = "SpecXlsxReport")]
#[derive(Debug, Clone)]
struct PySpecXlsxReport {
    #[pyo3(get)]
    sheets: Vec<(String, usize, usize)>,
    #[pyo3(get)]
    warnings: Vec<String>,
}

impl From<SpecXlsxReport> for PySpecXlsxReport {
    fn from(report: SpecXlsxReport) -> Self {
        Self {
            sheets: report
                .sheets
                .into_iter()
                .map(|s| (s.sheet_name, s.row_start_inclusive, s.row_end_exclusive))
                .collect(),
            warnings: report.warnings,
        }
    }
}

fn parse_rule_autofit(value: &str) -> PyResult<EnumAutofitColumnsRule> {
    match value {
        "none" => Ok(EnumAutofitColumnsRule::None),
        "header" => Ok(EnumAutofitColumnsRule::Header),
        "all" => Ok(EnumAutofitColumnsRule::All),
        _ => Err(PyValueError::new_err(format!(
            "Invalid autofit rule: `{value}`. Expected one of: ['none', 'header', 'all']"
        ))),
    }
}

fn map_extract_error(exception: ExtractError) -> PyErr {
    match exception {
        ExtractError::InvalidOptions(_) | ExtractError::InvalidPattern(_) => {
            PyValueError::new_err(exception.to_string())
        }
    }
}

fn create_batch_options(
    markers_file_name: Option<Vec<String>>,
    patterns_include_files: Option<Vec<String>>,
    num_workers_max: Option<usize>,
    products_fallback: Option<Vec<String>>,
) -> SpecBatchOptions {
    let mut spec_options = SpecBatchOptions {
        num_workers_max,
        ..SpecBatchOptions::default()
    };
    if let Some(markers) = markers_file_name {
        spec_options.markers_file_name = markers;
    }
    if let Some(patterns) = patterns_include_files {
        spec_options.patterns_include_files = patterns;
    }
    if let Some(products) = products_fallback {
        spec_options.extract_options.products_fallback = products;
    }
    spec_options
}

type TypePyOutcome = (Vec<PyRecord>, PyReportExtract);

#[pyfunction(name = "extract_files")]
#[pyo3(signature = (
    paths,
    markers_file_name = None,
    patterns_include_files = None,
    num_workers_max = None,
    products_fallback = None
))]
fn extract_files_py(
    py: Python<'_>,
    paths: Vec<PathBuf>,
    markers_file_name: Option<Vec<String>>,
    patterns_include_files: Option<Vec<String>>,
    num_workers_max: Option<usize>,
    products_fallback: Option<Vec<String>>,
) -> PyResult<TypePyOutcome> {
    let spec_options = create_batch_options(
        markers_file_name,
        patterns_include_files,
        num_workers_max,
        products_fallback,
    );

    let outcome = py.allow_threads(|| extract_files(&paths, &spec_options));
    let outcome = outcome.map_err(map_extract_error)?;
    Ok((
        outcome.records.into_iter().map(PyRecord::from).collect(),
        PyReportExtract::from(outcome.report),
    ))
}

#[pyfunction(name = "extract_uploads")]
#[pyo3(signature = (
    uploads,
    markers_file_name = None,
    patterns_include_files = None,
    num_workers_max = None,
    products_fallback = None
))]
fn extract_uploads_py(
    py: Python<'_>,
    uploads: Vec<(String, Vec<u8>)>,
    markers_file_name: Option<Vec<String>>,
    patterns_include_files: Option<Vec<String>>,
    num_workers_max: Option<usize>,
    products_fallback: Option<Vec<String>>,
) -> PyResult<TypePyOutcome> {
    let spec_options = create_batch_options(
        markers_file_name,
        patterns_include_files,
        num_workers_max,
        products_fallback,
    );
    let l_uploads: Vec<SpecUpload> = uploads
        .into_iter()
        .map(|(name, bytes)| SpecUpload { name, bytes })
        .collect();

    let outcome = py.allow_threads(|| extract_uploads(&l_uploads, &spec_options));
    let outcome = outcome.map_err(map_extract_error)?;
    Ok((
        outcome.records.into_iter().map(PyRecord::from).collect(),
        PyReportExtract::from(outcome.report),
    ))
}

#[pyfunction(name = "write_records_xlsx")]
#[pyo3(signature = (
    records,
    file_out = PathBuf::from(C_FILE_NAME_RECORDS),
    sheet_name = None,
    rule_autofit = "all",
    if_freeze_header = true
))]
fn write_records_xlsx_py(
    py: Python<'_>,
    records: Vec<PyRecord>,
    file_out: PathBuf,
    sheet_name: Option<String>,
    rule_autofit: &str,
    if_freeze_header: bool,
) -> PyResult<PySpecXlsxReport> {
    let mut spec_write_options = SpecXlsxWriteOptions {
        if_freeze_header,
        ..SpecXlsxWriteOptions::default()
    };
    spec_write_options.policy_autofit.rule_columns = parse_rule_autofit(rule_autofit)?;
    if let Some(name) = sheet_name {
        spec_write_options.sheet_name = name;
    }
    let l_records: Vec<SpecRecord> = records.into_iter().map(SpecRecord::from).collect();

    let report = py.allow_threads(|| write_records_xlsx(&file_out, &l_records, spec_write_options));
    let report = report.map_err(PyRuntimeError::new_err)?;
    Ok(PySpecXlsxReport::from(report))
}

#[pyfunction(name = "records_to_ipc_bytes")]
fn records_to_ipc_bytes_py(py: Python<'_>, records: Vec<PyRecord>) -> PyResult<Py<PyBytes>> {
    let l_records: Vec<SpecRecord> = records.into_iter().map(SpecRecord::from).collect();
    let v_ipc = py
        .allow_threads(|| convert_records_to_ipc_bytes(&l_records))
        .map_err(PyRuntimeError::new_err)?;
    Ok(PyBytes::new(py, &v_ipc).unbind())
}

#[pymodule]
fn _shopfloor_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyRecord>()?;
    module.add_class::<PySpecExtractError>()?;
    module.add_class::<PyReportExtract>()?;
    module.add_class::<PySpecXlsxReport>()?;
    module.add_function(wrap_pyfunction!(extract_files_py, module)?)?;
    module.add_function(wrap_pyfunction!(extract_uploads_py, module)?)?;
    module.add_function(wrap_pyfunction!(write_records_xlsx_py, module)?)?;
    module.add_function(wrap_pyfunction!(records_to_ipc_bytes_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
