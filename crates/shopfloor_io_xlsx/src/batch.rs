//! Multi-file extraction: name filtering, per-file isolation, rayon fan-out.

use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use shopfloor_extract::{
    ExtractError, ReportExtractBuilder, SpecExtractOptions, SpecExtractOutcome, SpecRecord,
    extract_workbook, finalize_outcome, validate_extract_options,
};
use tempfile::Builder as TempFileBuilder;
use tracing::{debug, info, warn};

use crate::conf::C_PREFIX_TEMP_UPLOAD;
use crate::reader::read_workbook;
use crate::spec::{SpecBatchOptions, SpecUpload};
use crate::util::{SpecFileNameFilter, calculate_worker_limit, derive_file_name, derive_upload_suffix};

type TypeFileResult = (Vec<SpecRecord>, ReportExtractBuilder);

/// Extract records from workbook files on disk.
///
/// Files whose name misses the include globs or the report markers are
/// counted as skipped. Unreadable files and sheets are recorded in the report
/// and never abort the batch. Records come back in input order.
///
/// Returns [`ExtractError`] only for invalid options or patterns.
pub fn extract_files<P>(paths: &[P], options: &SpecBatchOptions) -> Result<SpecExtractOutcome, ExtractError>
where
    P: AsRef<Path> + Sync,
{
    validate_extract_options(&options.extract_options)?;
    let filter = SpecFileNameFilter::from_options(options)?;

    let mut builder = ReportExtractBuilder::default();
    let mut l_paths_accepted: Vec<PathBuf> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let c_name = derive_file_name(path);
        if filter.is_match(&c_name) {
            l_paths_accepted.push(path.to_path_buf());
        } else {
            debug!(file = %c_name, "file skipped by name filter");
            builder.add_file_skipped();
        }
    }
    info!(
        accepted = l_paths_accepted.len(),
        skipped = builder.cnt_files_skipped,
        "batch planned"
    );

    let extract_options = &options.extract_options;
    let l_results = run_file_jobs(
        &l_paths_accepted,
        calculate_worker_limit(options.num_workers_max),
        &mut builder,
        |path| extract_file(path, &derive_file_name(path), extract_options),
    );
    Ok(merge_file_results(l_results, builder))
}

/// Extract records from uploaded workbook bytes.
///
/// Each accepted upload is decoded through its own temp file, which is
/// removed on every exit path.
pub fn extract_uploads(
    uploads: &[SpecUpload],
    options: &SpecBatchOptions,
) -> Result<SpecExtractOutcome, ExtractError> {
    validate_extract_options(&options.extract_options)?;
    let filter = SpecFileNameFilter::from_options(options)?;

    let mut builder = ReportExtractBuilder::default();
    let mut l_uploads_accepted: Vec<&SpecUpload> = Vec::new();
    for upload in uploads {
        if filter.is_match(&upload.name) {
            l_uploads_accepted.push(upload);
        } else {
            debug!(file = %upload.name, "upload skipped by name filter");
            builder.add_file_skipped();
        }
    }

    let extract_options = &options.extract_options;
    let l_results = run_file_jobs(
        &l_uploads_accepted,
        calculate_worker_limit(options.num_workers_max),
        &mut builder,
        |upload| extract_upload(upload, extract_options),
    );
    Ok(merge_file_results(l_results, builder))
}

/// Read and extract one workbook file; failures land in the returned report.
pub fn extract_file(path: &Path, source: &str, options: &SpecExtractOptions) -> TypeFileResult {
    let mut builder = ReportExtractBuilder::default();
    match read_workbook(path, source, &mut builder) {
        Ok(workbook) => {
            let l_records = extract_workbook(&workbook, options, &mut builder);
            info!(file = %source, records = l_records.len(), "file extracted");
            (l_records, builder)
        }
        Err(message) => {
            warn!(file = %source, error = %message, "file failed");
            builder.add_error(source, message);
            (Vec::new(), builder)
        }
    }
}

/// Decode one upload through a scoped temp file and extract it.
pub fn extract_upload(upload: &SpecUpload, options: &SpecExtractOptions) -> TypeFileResult {
    let res_tmp = TempFileBuilder::new()
        .prefix(C_PREFIX_TEMP_UPLOAD)
        .suffix(&derive_upload_suffix(&upload.name))
        .tempfile()
        .and_then(|mut file_tmp| {
            file_tmp.write_all(&upload.bytes)?;
            file_tmp.flush()?;
            Ok(file_tmp)
        });

    match res_tmp {
        // `file_tmp` is deleted when it drops at the end of this arm.
        Ok(file_tmp) => extract_file(file_tmp.path(), &upload.name, options),
        Err(err) => {
            let mut builder = ReportExtractBuilder::default();
            builder.add_error(
                upload.name.clone(),
                format!("Failed to stage upload in a temp file: {err}"),
            );
            (Vec::new(), builder)
        }
    }
}

fn run_file_jobs<T, F>(
    items: &[T],
    n_workers_max: usize,
    builder: &mut ReportExtractBuilder,
    job: F,
) -> Vec<TypeFileResult>
where
    T: Sync,
    F: Fn(&T) -> TypeFileResult + Sync + Send,
{
    if items.is_empty() {
        return Vec::new();
    }
    if n_workers_max <= 1 || items.len() == 1 {
        return items.iter().map(&job).collect();
    }

    let thread_pool = ThreadPoolBuilder::new().num_threads(n_workers_max).build();
    let Ok(thread_pool) = thread_pool else {
        builder.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial extraction."
        ));
        return items.iter().map(&job).collect();
    };
    thread_pool.install(|| items.par_iter().map(&job).collect())
}

fn merge_file_results(
    results: Vec<TypeFileResult>,
    mut builder: ReportExtractBuilder,
) -> SpecExtractOutcome {
    let mut l_records = Vec::new();
    for (l_records_file, builder_file) in results {
        l_records.extend(l_records_file);
        builder.merge(builder_file);
    }
    finalize_outcome(l_records, builder)
}

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::Workbook;

    use super::*;

    struct TestDir {
        dir: tempfile::TempDir,
    }

    impl TestDir {
        fn new() -> Self {
            Self {
                dir: tempfile::Builder::new()
                    .prefix("shopfloor_batch_test_")
                    .tempdir()
                    .expect("create test dir"),
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    /// Two-sheet report: a repeating-block sheet and a fixed-block sheet.
    fn write_report_workbook(path: &Path) {
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("绕肉A").expect("name");
        sheet.write_string(0, 0, "日期：2024-03-05").expect("write");
        for (n_col, c_header) in ["序号", "姓名", "数量", "单价", "金额", "备注", "数量", "单价", "金额", "备注"]
            .iter()
            .enumerate()
        {
            sheet.write_string(1, n_col as u16, *c_header).expect("write");
        }
        sheet.write_number(2, 0, 1.0).expect("write");
        sheet.write_string(2, 1, "张三").expect("write");
        sheet.write_number(2, 2, 10.0).expect("write");
        sheet.write_number(2, 3, 5.0).expect("write");
        sheet.write_number(2, 6, 2.0).expect("write");
        sheet.write_number(2, 7, 3.0).expect("write");
        sheet.write_number(2, 8, 6.0).expect("write");

        let sheet = workbook.add_worksheet();
        sheet.set_name("包装B").expect("name");
        sheet.write_string(0, 0, "2024-03-06").expect("write");
        sheet.write_string(0, 1, "李四").expect("write");
        sheet.write_string(0, 2, "B1").expect("write");
        sheet.write_string(0, 3, "鸭肉卷").expect("write");
        sheet.write_number(0, 4, 3.0).expect("write");
        sheet.write_number(0, 5, 4.0).expect("write");

        workbook.save(path).expect("save workbook");
    }

    fn options_serial() -> SpecBatchOptions {
        SpecBatchOptions {
            num_workers_max: Some(1),
            ..SpecBatchOptions::default()
        }
    }

    #[test]
    fn test_extract_files_filters_names_and_isolates_bad_files() {
        let tmp = TestDir::new();
        let path_good = tmp.path().join("优萌车间0305.xlsx");
        let path_bad = tmp.path().join("生产日报_损坏.xlsx");
        let path_other = tmp.path().join("周报.xlsx");
        write_report_workbook(&path_good);
        write_report_workbook(&path_other);
        std::fs::write(&path_bad, b"not a workbook").expect("write bad");

        let outcome = extract_files(
            &[path_bad.clone(), path_good.clone(), path_other.clone()],
            &options_serial(),
        )
        .expect("extract");

        assert_eq!(outcome.records.len(), 3);
        let report = outcome.report;
        assert_eq!(report.cnt_files_skipped, 1);
        assert_eq!(report.cnt_files_scanned, 1);
        assert_eq!(report.cnt_sheets_scanned, 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].source, "生产日报_损坏.xlsx");
    }

    #[test]
    fn test_extract_files_parallel_keeps_input_order() {
        let tmp = TestDir::new();
        let l_paths: Vec<PathBuf> = (0..4)
            .map(|n| {
                let path = tmp.path().join(format!("生产日报_{n}.xlsx"));
                write_report_workbook(&path);
                path
            })
            .collect();

        let options = SpecBatchOptions {
            num_workers_max: Some(4),
            ..SpecBatchOptions::default()
        };
        let outcome = extract_files(&l_paths, &options).expect("extract");
        assert_eq!(outcome.records.len(), 12);
        let l_workshops: Vec<&str> = outcome.records[..3]
            .iter()
            .map(|r| r.workshop.as_str())
            .collect();
        assert_eq!(l_workshops, vec!["绕肉A", "绕肉A", "包装B"]);
    }

    #[test]
    fn test_extract_uploads_uses_temp_files_and_cleans_up() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("src.xlsx");
        write_report_workbook(&path_src);
        let upload = SpecUpload {
            name: "优萌车间生产日报.xlsx".to_string(),
            bytes: std::fs::read(&path_src).expect("read"),
        };
        let upload_bad = SpecUpload {
            name: "生产日报_坏.xlsx".to_string(),
            bytes: b"garbage".to_vec(),
        };

        let outcome = extract_uploads(&[upload, upload_bad], &options_serial()).expect("extract");
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.report.error_count(), 1);

        let n_leftover = std::fs::read_dir(std::env::temp_dir())
            .expect("read temp dir")
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(C_PREFIX_TEMP_UPLOAD)
            })
            .count();
        assert_eq!(n_leftover, 0);
    }

    #[test]
    fn test_extract_files_empty_batch_warns() {
        let outcome = extract_files::<PathBuf>(&[], &options_serial()).expect("extract");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.warning_count(), 1);
    }
}
