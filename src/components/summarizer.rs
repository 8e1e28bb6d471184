//! Single-document summarization (the `LJSummary` library).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_float, c_int};

use crate::components;
use crate::error::Result;
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

/// The summarization component.
pub struct Summarizer {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<Summarizer> = ComponentCell::new();

impl Component for Summarizer {
    const NAME: &'static str = "summarizer";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open("LJSummary", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        components::run_standard_init(
            &lib,
            Self::NAME,
            "DS_Init",
            Some("DS_GetLastErrMsg"),
            &data_dir,
            &config.license_code,
        )?;
        Ok(Self { lib, data_dir })
    }
}

impl Drop for Summarizer {
    fn drop(&mut self) {
        components::run_exit_void(&self.lib, Self::NAME, "DS_Exit");
    }
}

impl Summarizer {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`Summarizer::handle`] call.
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

    /// Summarize `text`.
    ///
    /// `max_ratio` caps the summary length as a fraction of the input
    /// (0.0 = no cap); `max_len` caps it in characters (0 = no cap);
    /// `strip_html` removes markup before summarizing. An empty result means
    /// the library produced no summary.
    pub fn summarize(
        &self,
        text: &str,
        max_ratio: f32,
        max_len: u32,
        strip_html: bool,
    ) -> Result<String> {
        type SingleDocFn =
            unsafe extern "C" fn(*const c_char, c_float, c_int, c_int) -> *const c_char;
        let f: SingleDocFn = self.lib.func("DS_SingleDoc")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe {
            f(
                text.as_ptr(),
                max_ratio,
                max_len as c_int,
                // The native flag is inverted: 0 strips markup.
                if strip_html { 0 } else { 1 },
            )
        };
        Ok(self.lib.from_native(result))
    }

    /// Summarize the contents of a text file.
    pub fn summarize_file(
        &self,
        path: &Path,
        max_ratio: f32,
        max_len: u32,
        strip_html: bool,
    ) -> Result<String> {
        type FileProcessFn =
            unsafe extern "C" fn(*const c_char, c_float, c_int, c_int) -> *const c_char;
        let f: FileProcessFn = self.lib.func("DS_FileProcess")?;
        let path = self.lib.path_to_native(path)?;
        let result = unsafe {
            f(
                path.as_ptr(),
                max_ratio,
                max_len as c_int,
                if strip_html { 0 } else { 1 },
            )
        };
        Ok(self.lib.from_native(result))
    }
}
