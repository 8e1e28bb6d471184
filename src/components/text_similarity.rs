//! Text similarity scoring (the `TextSimilarity` library).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_double, c_int};

use crate::components;
use crate::error::Result;
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

/// Similarity models, fastest to most semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityModel {
    /// Character model: fastest, for short regular text.
    Char,
    /// Word model: the usual choice for regular long documents.
    Word,
    /// Topic-word model: slowest, most semantic, for complex text.
    Key,
}

impl SimilarityModel {
    fn code(self) -> c_int {
        match self {
            SimilarityModel::Char => 1,
            SimilarityModel::Word => 2,
            SimilarityModel::Key => 3,
        }
    }
}

/// The text similarity component.
pub struct TextSimilarity {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<TextSimilarity> = ComponentCell::new();

impl Component for TextSimilarity {
    const NAME: &'static str = "text_similarity";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("TextSimilarity", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        components::run_standard_init(
            &lib,
            Self::NAME,
            "TS_Init",
            Some("TS_GetLastErrorMsg"),
            &data_dir,
            &config.license_code,
        )?;
        Ok(Self { lib, data_dir })
    }
}

impl Drop for TextSimilarity {
    fn drop(&mut self) {
        components::run_exit_void(&self.lib, Self::NAME, "TS_Exit");
    }
}

impl TextSimilarity {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`TextSimilarity::handle`] call.
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

    /// Similarity of two texts under the chosen model.
    pub fn compute(&self, text_a: &str, text_b: &str, model: SimilarityModel) -> Result<f64> {
        type ComputeFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_int) -> c_double;
        let f: ComputeFn = self.lib.func("TS_ComputeSim")?;
        let a = self.lib.to_native(text_a)?;
        let b = self.lib.to_native(text_b)?;
        Ok(unsafe { f(a.as_ptr(), b.as_ptr(), model.code()) })
    }

    /// Similarity of two text files under the chosen model.
    pub fn compute_files(
        &self,
        path_a: &Path,
        path_b: &Path,
        model: SimilarityModel,
    ) -> Result<f64> {
        type ComputeFileFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_int) -> c_double;
        let f: ComputeFileFn = self.lib.func("TS_ComputeSimFile")?;
        let a = self.lib.path_to_native(path_a)?;
        let b = self.lib.path_to_native(path_b)?;
        Ok(unsafe { f(a.as_ptr(), b.as_ptr(), model.code()) })
    }
}
