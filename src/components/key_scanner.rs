//! Keyword scanning and filtering (the `KeyScanAPI` library).
//!
//! Unlike the other components, the scanner supports several concurrent
//! filter contexts inside one loaded library. A context is an opaque integer
//! handle allocated natively; the native side does not validate handles, so
//! contexts are wrapped in [`ScanContext`] guards that release exactly once,
//! on drop or via [`ScanContext::close`]. The instance-level scan methods use
//! the library's built-in default context (handle 0).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_float, c_int};
use serde::Deserialize;

use crate::components;
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const INIT: &str = "KS_Init";
const EXIT: &str = "KS_Exit";
const LAST_ERROR: &str = "KS_GetLastErrorMsg";

/// Scan strategies accepted by the detail-scan calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Plain keyword matching.
    Normal,
    /// Match shape-shifted variants.
    Shape,
    /// Match pinyin respellings.
    Pinyin,
    /// Proofreading mode.
    Check,
}

impl ScanMode {
    fn code(self) -> c_int {
        match self {
            ScanMode::Normal => 0,
            ScanMode::Shape => 1,
            ScanMode::Pinyin => 2,
            ScanMode::Check => 3,
        }
    }
}

/// One matched category with its weight, from a plain scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanHit {
    pub label: String,
    pub weight: f64,
}

/// Per-category hit counts inside a detailed scan report.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanClassHit {
    pub word: String,
    #[serde(default)]
    pub freq: i64,
}

/// The `illegal`/`legal` blocks of a detailed scan report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanClassStat {
    #[serde(default)]
    pub classes: Vec<ScanClassHit>,
    #[serde(default)]
    pub hit_count: i64,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub scan_val: f64,
}

/// Detailed scan result, deserialized from the native JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanReport {
    #[serde(rename = "Details", default)]
    pub details: Vec<String>,
    #[serde(rename = "Rules", default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub illegal: ScanClassStat,
    #[serde(default)]
    pub legal: ScanClassStat,
    #[serde(default)]
    pub line_id: i64,
    #[serde(default)]
    pub org_file: String,
    #[serde(default)]
    pub score: f64,
}

/// The keyword scanning component.
pub struct KeyScanner {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<KeyScanner> = ComponentCell::new();

impl Component for KeyScanner {
    const NAME: &'static str = "key_scanner";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open("KeyScanAPI", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        components::run_standard_init(
            &lib,
            Self::NAME,
            INIT,
            Some(LAST_ERROR),
            &data_dir,
            &config.license_code,
        )?;
        Ok(Self { lib, data_dir })
    }
}

impl Drop for KeyScanner {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, EXIT);
    }
}

impl KeyScanner {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`KeyScanner::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        CELL.shutdown()
    }

    /// The data root this instance was initialized with.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Allocate a fresh scan context over filter set `filter_index`.
    ///
    /// The returned guard owns the native handle until dropped or closed.
    pub fn new_context(self: &Arc<Self>, filter_index: i32) -> Result<ScanContext> {
        type NewInstanceFn = unsafe extern "C" fn(c_int) -> c_int;
        let f: NewInstanceFn = self.lib.func("KS_NewInstance")?;
        let handle = unsafe { f(filter_index) };
        if handle < 0 {
            return Err(NlpirError::NativeFailure {
                operation: "KS_NewInstance",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(ScanContext {
            scanner: Arc::clone(self),
            handle,
            released: false,
        })
    }

    /// Scan `text` in the default context. Empty result means no hits.
    pub fn scan(&self, text: &str) -> Result<Vec<ScanHit>> {
        self.scan_with(text, 0)
    }

    /// Detailed scan of `text` in the default context.
    pub fn scan_detail(&self, text: &str, mode: ScanMode) -> Result<ScanReport> {
        self.scan_detail_with(text, mode, 0)
    }

    /// Scan a text file in the default context.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<ScanHit>> {
        self.scan_file_with(path, 0)
    }

    /// Multi-threaded scan of a directory tree, blocking until the native
    /// call returns. Returns the number of files with findings.
    pub fn scan_dir(
        &self,
        input_dir: &Path,
        result_dir: &Path,
        suffix_filter: &str,
        thread_count: u32,
        encrypt: bool,
        mode: ScanMode,
    ) -> Result<i32> {
        type ScanDirFn = unsafe extern "C" fn(
            *const c_char,
            *const c_char,
            *const c_char,
            c_int,
            c_int,
            c_int,
        ) -> c_int;
        let f: ScanDirFn = self.lib.func("KS_ScanDir")?;
        let input = self.lib.path_to_native(input_dir)?;
        let result = self.lib.path_to_native(result_dir)?;
        let filter = self.lib.to_native(suffix_filter)?;
        Ok(unsafe {
            f(
                input.as_ptr(),
                result.as_ptr(),
                filter.as_ptr(),
                thread_count as c_int,
                encrypt as c_int,
                mode.code(),
            )
        })
    }

    /// Merge the per-thread outputs of a directory scan.
    pub fn merge_result(&self, path: &Path) -> Result<()> {
        type MergeFn = unsafe extern "C" fn(*const c_char);
        let f: MergeFn = self.lib.func("KS_MergeResult")?;
        let path = self.lib.path_to_native(path)?;
        unsafe { f(path.as_ptr()) };
        Ok(())
    }

    /// Filter a hit-statistics file by score threshold.
    pub fn stat_result_filter(
        &self,
        input_path: &Path,
        result_path: &Path,
        threshold: f32,
    ) -> Result<i32> {
        self.result_filter("KS_StatResultFilter", input_path, result_path, threshold)
    }

    /// Filter a detailed-results file by score threshold.
    pub fn scan_result_filter(
        &self,
        input_path: &Path,
        result_path: &Path,
        threshold: f32,
    ) -> Result<i32> {
        self.result_filter("KS_ScanResultFilter", input_path, result_path, threshold)
    }

    fn result_filter(
        &self,
        symbol: &'static str,
        input_path: &Path,
        result_path: &Path,
        threshold: f32,
    ) -> Result<i32> {
        type FilterFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_float) -> c_int;
        let f: FilterFn = self.lib.func(symbol)?;
        let input = self.lib.path_to_native(input_path)?;
        let result = self.lib.path_to_native(result_path)?;
        Ok(unsafe { f(input.as_ptr(), result.as_ptr(), threshold) })
    }

    /// Decrypt an encrypted scan-result directory.
    pub fn decrypt(&self, input_dir: &Path, result_dir: &Path) -> Result<i32> {
        type DecryptFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_int;
        let f: DecryptFn = self.lib.func("KS_Decrypt")?;
        let input = self.lib.path_to_native(input_dir)?;
        let result = self.lib.path_to_native(result_dir)?;
        Ok(unsafe { f(input.as_ptr(), result.as_ptr()) })
    }

    // Handle-parameterized raw calls, shared between the default context and
    // explicit ScanContext guards.

    fn scan_with(&self, text: &str, handle: c_int) -> Result<Vec<ScanHit>> {
        type ScanFn = unsafe extern "C" fn(*const c_char, c_int) -> *const c_char;
        let f: ScanFn = self.lib.func("KS_Scan")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), handle) };
        Ok(parse_scan_hits(&self.lib.from_native(result)))
    }

    fn scan_detail_with(&self, text: &str, mode: ScanMode, handle: c_int) -> Result<ScanReport> {
        type DetailFn = unsafe extern "C" fn(*const c_char, c_int, c_int) -> *const c_char;
        let f: DetailFn = self.lib.func("KS_ScanDetail")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), mode.code(), handle) };
        parse_scan_report(&self.lib.from_native(result))
    }

    fn scan_file_with(&self, path: &Path, handle: c_int) -> Result<Vec<ScanHit>> {
        type ScanFileFn = unsafe extern "C" fn(*const c_char, c_int) -> *const c_char;
        let f: ScanFileFn = self.lib.func("KS_ScanFile")?;
        let path = self.lib.path_to_native(path)?;
        let result = unsafe { f(path.as_ptr(), handle) };
        Ok(parse_scan_hits(&self.lib.from_native(result)))
    }

    fn scan_file_detail_with(&self, path: &Path, handle: c_int) -> Result<ScanReport> {
        type DetailFn = unsafe extern "C" fn(*const c_char, c_int) -> *const c_char;
        let f: DetailFn = self.lib.func("KS_ScanFileDetail")?;
        let path = self.lib.path_to_native(path)?;
        let result = unsafe { f(path.as_ptr(), handle) };
        parse_scan_report(&self.lib.from_native(result))
    }

    fn scan_line_with(
        &self,
        path: &Path,
        result_path: &Path,
        handle: c_int,
        encrypt: bool,
        mode: ScanMode,
    ) -> Result<i32> {
        type ScanLineFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_int, c_int, c_int) -> c_int;
        let f: ScanLineFn = self.lib.func("KS_ScanLine")?;
        let input = self.lib.path_to_native(path)?;
        let result = self.lib.path_to_native(result_path)?;
        Ok(unsafe {
            f(
                input.as_ptr(),
                result.as_ptr(),
                handle,
                encrypt as c_int,
                mode.code(),
            )
        })
    }

    fn scan_stat_with(&self, result_path: &Path, handle: c_int) -> Result<i32> {
        type StatFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
        let f: StatFn = self.lib.func("KS_ScanStat")?;
        let result = self.lib.path_to_native(result_path)?;
        Ok(unsafe { f(result.as_ptr(), handle) })
    }

    fn scan_add_stat_with(&self, result_path: &Path, handle: c_int) -> Result<i32> {
        type AddStatFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
        let f: AddStatFn = self.lib.func("KS_ScanAddStat")?;
        let result = self.lib.path_to_native(result_path)?;
        Ok(unsafe { f(result.as_ptr(), handle) })
    }

    fn import_user_dict_with(
        &self,
        path: &Path,
        overwrite: bool,
        pinyin_abbrev: bool,
        handle: c_int,
    ) -> Result<i32> {
        type ImportFn = unsafe extern "C" fn(*const c_char, bool, bool, c_int) -> c_int;
        let f: ImportFn = self.lib.func("KS_ImportUserDict")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr(), overwrite, pinyin_abbrev, handle) })
    }

    fn delete_user_dict_with(&self, entries: &str, handle: c_int) -> Result<i32> {
        type DeleteFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
        let f: DeleteFn = self.lib.func("KS_DeleteUserDict")?;
        let entries = self.lib.to_native(entries)?;
        Ok(unsafe { f(entries.as_ptr(), handle) })
    }

    fn export_dict_with(&self, path: &Path, handle: c_int) -> Result<i32> {
        type ExportFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
        let f: ExportFn = self.lib.func("KS_ExportDict")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr(), handle) })
    }

    fn release(&self, handle: c_int) -> Result<()> {
        type DeleteInstanceFn = unsafe extern "C" fn(c_int) -> c_int;
        let f: DeleteInstanceFn = self.lib.func("KS_DeleteInstance")?;
        if unsafe { f(handle) } == 0 {
            return Err(NlpirError::NativeFailure {
                operation: "KS_DeleteInstance",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(())
    }
}

/// One allocated scan context.
///
/// All per-document scanner operations run against the handle owned by this
/// guard. The handle is returned to the native library exactly once: on
/// [`ScanContext::close`] or, failing that, on drop.
pub struct ScanContext {
    scanner: Arc<KeyScanner>,
    handle: c_int,
    released: bool,
}

impl ScanContext {
    /// The raw native handle.
    pub fn raw_handle(&self) -> i32 {
        self.handle
    }

    /// Scan `text` in this context.
    pub fn scan(&self, text: &str) -> Result<Vec<ScanHit>> {
        self.scanner.scan_with(text, self.handle)
    }

    /// Detailed scan of `text` in this context.
    pub fn scan_detail(&self, text: &str, mode: ScanMode) -> Result<ScanReport> {
        self.scanner.scan_detail_with(text, mode, self.handle)
    }

    /// Scan a text file in this context.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<ScanHit>> {
        self.scanner.scan_file_with(path, self.handle)
    }

    /// Detailed scan of a text file in this context.
    pub fn scan_file_detail(&self, path: &Path) -> Result<ScanReport> {
        self.scanner.scan_file_detail_with(path, self.handle)
    }

    /// Line-by-line scan of a file into `result_path`.
    pub fn scan_line(
        &self,
        path: &Path,
        result_path: &Path,
        encrypt: bool,
        mode: ScanMode,
    ) -> Result<i32> {
        self.scanner
            .scan_line_with(path, result_path, self.handle, encrypt, mode)
    }

    /// Write a hit-statistics report for this context's scans.
    pub fn scan_stat(&self, result_path: &Path) -> Result<i32> {
        self.scanner.scan_stat_with(result_path, self.handle)
    }

    /// Merge this context's statistics into the default context.
    pub fn scan_add_stat(&self, result_path: &Path) -> Result<i32> {
        self.scanner.scan_add_stat_with(result_path, self.handle)
    }

    /// Import a `word class weight` filter dictionary. Affects all contexts:
    /// the dictionary is global to the loaded library.
    pub fn import_user_dict(
        &self,
        path: &Path,
        overwrite: bool,
        pinyin_abbrev: bool,
    ) -> Result<i32> {
        self.scanner
            .import_user_dict_with(path, overwrite, pinyin_abbrev, self.handle)
    }

    /// Delete dictionary entries (one word per line). Returns the number of
    /// entries removed. Affects all contexts.
    pub fn delete_user_dict(&self, entries: &str) -> Result<i32> {
        self.scanner.delete_user_dict_with(entries, self.handle)
    }

    /// Export the active filter dictionary. Administrative use.
    pub fn export_dict(&self, path: &Path) -> Result<i32> {
        self.scanner.export_dict_with(path, self.handle)
    }

    /// Release the context now, surfacing any native failure.
    pub fn close(mut self) -> Result<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.scanner.release(self.handle)
    }
}

impl Drop for ScanContext {
    fn drop(&mut self) {
        if let Err(err) = self.release_once() {
            log::warn!("failed to release scan context {}: {}", self.handle, err);
        }
    }
}

/// Parse `label/weight#label/weight#` plain-scan output.
fn parse_scan_hits(raw: &str) -> Vec<ScanHit> {
    raw.split('#')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (label, weight) = entry.rsplit_once('/')?;
            Some(ScanHit {
                label: label.to_string(),
                weight: weight.trim().parse().ok()?,
            })
        })
        .collect()
}

fn parse_scan_report(raw: &str) -> Result<ScanReport> {
    serde_json::from_str(raw).map_err(|err| NlpirError::Parse {
        what: "scan detail",
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hits_parse() {
        let hits = parse_scan_hits("色情/10#暴力/1#");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label, "色情");
        assert_eq!(hits[0].weight, 10.0);
        assert_eq!(hits[1].weight, 1.0);
    }

    #[test]
    fn empty_scan_means_no_hits() {
        assert!(parse_scan_hits("").is_empty());
    }

    #[test]
    fn detail_report_deserializes() {
        let raw = r#"{
            "Details": ["chou傻逼xi禁评"],
            "Rules": ["傻逼", "xi禁评"],
            "filename": "",
            "illegal": {
                "classes": [
                    {"freq": 1, "word": "粗言秽语"},
                    {"freq": 1, "word": "新华社禁用"}
                ],
                "hit_count": 4,
                "keys": ["傻逼", "xi禁评"],
                "scan_val": 13.333333333333332
            },
            "legal": {"hit_count": 0, "scan_val": 0.0},
            "line_id": 0,
            "org_file": "",
            "score": 13.333333333333332
        }"#;
        let report = parse_scan_report(raw).unwrap();
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.illegal.hit_count, 4);
        assert_eq!(report.illegal.classes[1].word, "新华社禁用");
        assert_eq!(report.legal.hit_count, 0);
        assert!(report.score > 13.0);
    }

    #[test]
    fn malformed_detail_report_is_a_parse_error() {
        assert!(matches!(
            parse_scan_report("not json"),
            Err(crate::error::NlpirError::Parse { what: "scan detail", .. })
        ));
    }
}
