//! Rule-based text classification (the `LJClassifier` library).
//!
//! Classification rules live in an XML rule file inside the data directory;
//! the init entry point takes the rule file name rather than an encoding
//! code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_float, c_int};

use crate::components;
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const RULE_FILE: &str = "rulelist.xml";
const LAST_ERROR: &str = "classifier_GetLastErrorMsg";

/// The rule classification component.
pub struct Classifier {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<Classifier> = ComponentCell::new();

impl Component for Classifier {
    const NAME: &'static str = "classifier";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("LJClassifier", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        type InitFn =
            unsafe extern "C" fn(*const c_char, *const c_char, *const c_char) -> bool;
        let init: InitFn = lib.func("classifier_init")?;
        let rules = lib.to_native(RULE_FILE)?;
        let data = lib.path_to_native(&data_dir)?;
        let license = lib.to_native(&config.license_code)?;
        let ok = unsafe { init(rules.as_ptr(), data.as_ptr(), license.as_ptr()) };
        if !ok {
            return Err(NlpirError::InitFailed {
                component: Self::NAME,
                detail: components::last_error(&lib, Some(LAST_ERROR)),
            });
        }
        Ok(Self { lib, data_dir })
    }
}

impl Drop for Classifier {
    fn drop(&mut self) {
        components::run_exit_void(&self.lib, Self::NAME, "classifier_exit");
    }
}

impl Classifier {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`Classifier::handle`] call.
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

    /// Classify a document. `out_type` selects the native output layout
    /// (0 = best class only, 1 = every matching class with details).
    pub fn classify(&self, title: &str, content: &str, out_type: i32) -> Result<String> {
        type ExecFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_int) -> *const c_char;
        let f: ExecFn = self.lib.func("classifier_exec")?;
        let title = self.lib.to_native(title)?;
        let content = self.lib.to_native(content)?;
        let result = unsafe { f(title.as_ptr(), content.as_ptr(), out_type) };
        Ok(self.lib.from_native(result))
    }

    /// Match details for one class of the most recent classification.
    pub fn detail(&self, class_name: &str) -> Result<String> {
        type DetailFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
        let f: DetailFn = self.lib.func("classifier_detail")?;
        let class_name = self.lib.to_native(class_name)?;
        let result = unsafe { f(class_name.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Set the similarity threshold used by rule matching.
    pub fn set_similarity_threshold(&self, threshold: f32) -> Result<()> {
        type ThreshFn = unsafe extern "C" fn(c_float) -> c_int;
        let f: ThreshFn = self.lib.func("classifier_setsimthresh")?;
        unsafe { f(threshold) };
        Ok(())
    }
}
