//! Statistical text classification (the `DeepClassifier` library).
//!
//! The library supports several independent training workspaces, each
//! identified by a native pointer handle; [`Workspace`] wraps one with
//! release-on-drop. [`DeepClassifier::classify`] uses a lazily created
//! default workspace loaded with the pre-trained model shipped in the data
//! directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_int, c_void};
use once_cell::sync::OnceCell;

use crate::components;
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const LAST_ERROR: &str = "DC_GetLastErrorMsg";

/// Feature count of the shipped pre-trained model.
pub const DEFAULT_FEATURE_COUNT: u32 = 800;

type NewInstanceFn = unsafe extern "C" fn(c_int) -> *mut c_void;
type DeleteInstanceFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type HandleOnlyFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// The statistical classification component.
pub struct DeepClassifier {
    lib: NativeLibrary,
    data_dir: PathBuf,
    /// Handle of the lazily created default workspace, as a raw address.
    default_workspace: OnceCell<usize>,
}

static CELL: ComponentCell<DeepClassifier> = ComponentCell::new();

impl Component for DeepClassifier {
    const NAME: &'static str = "deep_classifier";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("DeepClassifier", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        type InitFn =
            unsafe extern "C" fn(*const c_char, c_int, c_int, *const c_char) -> c_int;
        let init: InitFn = lib.func("DC_Init")?;
        let data = lib.path_to_native(&data_dir)?;
        let license = lib.to_native(&config.license_code)?;
        let status = unsafe {
            init(
                data.as_ptr(),
                lib.encoding().native_code(),
                DEFAULT_FEATURE_COUNT as c_int,
                license.as_ptr(),
            )
        };
        if status == 0 {
            return Err(NlpirError::InitFailed {
                component: Self::NAME,
                detail: components::last_error(&lib, Some(LAST_ERROR)),
            });
        }
        Ok(Self {
            lib,
            data_dir,
            default_workspace: OnceCell::new(),
        })
    }
}

impl Drop for DeepClassifier {
    fn drop(&mut self) {
        if let Some(&handle) = self.default_workspace.get() {
            if let Err(err) = self.delete_raw(handle) {
                log::warn!("failed to release default workspace: {}", err);
            }
        }
        components::run_exit_int(&self.lib, Self::NAME, "DC_Exit");
    }
}

impl DeepClassifier {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`DeepClassifier::handle`] call.
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

    /// Classify `text` with the shipped pre-trained model.
    pub fn classify(&self, text: &str) -> Result<String> {
        let handle = *self.default_workspace.get_or_try_init(|| {
            let handle = self.new_raw(DEFAULT_FEATURE_COUNT)?;
            self.call_handle_only("DC_LoadTrainResult", handle)?;
            Ok::<usize, NlpirError>(handle)
        })?;
        self.classify_raw("DC_Classify", text, handle)
    }

    /// Allocate a training workspace with the given feature count.
    pub fn new_workspace(self: &Arc<Self>, feature_count: u32) -> Result<Workspace> {
        let handle = self.new_raw(feature_count)?;
        Ok(Workspace {
            classifier: Arc::clone(self),
            handle,
            released: false,
        })
    }

    fn new_raw(&self, feature_count: u32) -> Result<usize> {
        let f: NewInstanceFn = self.lib.func("DC_NewInstance")?;
        let handle = unsafe { f(feature_count as c_int) };
        if handle.is_null() {
            return Err(NlpirError::NativeFailure {
                operation: "DC_NewInstance",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(handle as usize)
    }

    fn delete_raw(&self, handle: usize) -> Result<()> {
        let f: DeleteInstanceFn = self.lib.func("DC_DeleteInstance")?;
        unsafe { f(handle as *mut c_void) };
        Ok(())
    }

    fn call_handle_only(&self, symbol: &'static str, handle: usize) -> Result<i32> {
        let f: HandleOnlyFn = self.lib.func(symbol)?;
        Ok(unsafe { f(handle as *mut c_void) })
    }

    fn add_train_raw(
        &self,
        symbol: &'static str,
        class_name: &str,
        payload: &str,
        handle: usize,
    ) -> Result<bool> {
        type AddTrainFn =
            unsafe extern "C" fn(*const c_char, *const c_char, *mut c_void) -> c_int;
        let f: AddTrainFn = self.lib.func(symbol)?;
        let class_name = self.lib.to_native(class_name)?;
        let payload = self.lib.to_native(payload)?;
        Ok(unsafe { f(class_name.as_ptr(), payload.as_ptr(), handle as *mut c_void) } != 0)
    }

    fn classify_raw(&self, symbol: &'static str, text: &str, handle: usize) -> Result<String> {
        type ClassifyFn = unsafe extern "C" fn(*const c_char, *mut c_void) -> *const c_char;
        let f: ClassifyFn = self.lib.func(symbol)?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), handle as *mut c_void) };
        Ok(self.lib.from_native(result))
    }

    fn export_features_raw(&self, path: &Path, handle: usize) -> Result<i32> {
        type ExportFn = unsafe extern "C" fn(*const c_char, *mut c_void) -> c_int;
        let f: ExportFn = self.lib.func("DC_ExportFeatures")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr(), handle as *mut c_void) })
    }
}

/// One training workspace inside the loaded classifier.
///
/// The native handle is released exactly once, on [`Workspace::close`] or
/// drop.
pub struct Workspace {
    classifier: Arc<DeepClassifier>,
    handle: usize,
    released: bool,
}

impl Workspace {
    /// Add a labeled training text.
    pub fn add_train(&self, class_name: &str, text: &str) -> Result<bool> {
        self.classifier
            .add_train_raw("DC_AddTrain", class_name, text, self.handle)
    }

    /// Add a labeled training file.
    pub fn add_train_file(&self, class_name: &str, path: &Path) -> Result<bool> {
        self.classifier.add_train_raw(
            "DC_AddTrainFile",
            class_name,
            &path.to_string_lossy(),
            self.handle,
        )
    }

    /// Train on the added samples. Blocks until the native call returns.
    pub fn train(&self) -> Result<i32> {
        self.classifier.call_handle_only("DC_Train", self.handle)
    }

    /// Load the persisted training result for this workspace.
    pub fn load_train_result(&self) -> Result<i32> {
        self.classifier
            .call_handle_only("DC_LoadTrainResult", self.handle)
    }

    /// Export the feature table to a file.
    pub fn export_features(&self, path: &Path) -> Result<i32> {
        self.classifier.export_features_raw(path, self.handle)
    }

    /// Classify `text`, returning the winning class.
    pub fn classify(&self, text: &str) -> Result<String> {
        self.classifier
            .classify_raw("DC_Classify", text, self.handle)
    }

    /// Classify `text`, returning every class with scores.
    pub fn classify_detailed(&self, text: &str) -> Result<String> {
        self.classifier
            .classify_raw("DC_ClassifyEx", text, self.handle)
    }

    /// Classify the contents of a file.
    pub fn classify_file(&self, path: &Path) -> Result<String> {
        self.classifier
            .classify_raw("DC_ClassifyFile", &path.to_string_lossy(), self.handle)
    }

    /// Release the workspace now.
    pub fn close(mut self) -> Result<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.classifier.delete_raw(self.handle)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(err) = self.release_once() {
            log::warn!("failed to release training workspace: {}", err);
        }
    }
}
