//! Key-phrase extraction (the `KeyExtract` library).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_int, c_uint, c_ulong};

use crate::components::{self, impl_user_dictionary, Keyword, KeywordBlacklist, FORMAT_JSON};
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const INIT: &str = "KeyExtract_Init";
const EXIT: &str = "KeyExtract_Exit";
const LAST_ERROR: &str = "KeyExtract_GetLastErrorMsg";

/// The keyword extraction component.
pub struct KeyExtractor {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<KeyExtractor> = ComponentCell::new();

impl Component for KeyExtractor {
    const NAME: &'static str = "key_extractor";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open("KeyExtract", config.encoding, &config.resolved_lib_dir())?;
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

impl Drop for KeyExtractor {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, EXIT);
    }
}

impl_user_dictionary!(KeyExtractor, "KeyExtract");

impl KeywordBlacklist for KeyExtractor {
    fn import_blacklist_file(&self, path: &Path, pos_tags: &[&str]) -> Result<u32> {
        type ImportFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_uint;
        let f: ImportFn = self.lib.func("KeyExtract_ImportKeyBlackList")?;
        let path = self.lib.path_to_native(path)?;
        let tags = self.lib.to_native(&pos_tags.join("#"))?;
        Ok(unsafe { f(path.as_ptr(), tags.as_ptr()) })
    }

    fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl KeyExtractor {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`KeyExtractor::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        CELL.shutdown()
    }

    /// Extract at most `max_keywords` keywords from `text`, with weight,
    /// POS and frequency per keyword, heaviest first.
    pub fn keywords(&self, text: &str, max_keywords: u32) -> Result<Vec<Keyword>> {
        let raw = self.keywords_raw(text, max_keywords, FORMAT_JSON)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|err| NlpirError::Parse {
            what: "keyword",
            detail: err.to_string(),
        })
    }

    /// Raw keyword output in the requested native format code.
    pub fn keywords_raw(&self, text: &str, max_keywords: u32, format: c_int) -> Result<String> {
        type KeywordsFn = unsafe extern "C" fn(*const c_char, c_int, c_int) -> *const c_char;
        let f: KeywordsFn = self.lib.func("KeyExtract_GetKeyWords")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), max_keywords as c_int, format) };
        Ok(self.lib.from_native(result))
    }

    /// Begin a batch extraction over multiple documents.
    pub fn batch_start(&self) -> Result<bool> {
        type BatchStartFn = unsafe extern "C" fn() -> c_int;
        let f: BatchStartFn = self.lib.func("KeyExtract_Batch_Start")?;
        Ok(unsafe { f() } == 1)
    }

    /// Feed a file into the running batch. Returns the native document count.
    pub fn batch_add_file(&self, path: &Path) -> Result<u64> {
        type AddFileFn = unsafe extern "C" fn(*const c_char) -> c_ulong;
        let f: AddFileFn = self.lib.func("KeyExtract_Batch_AddFile")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr()) } as u64)
    }

    /// Feed an in-memory document into the running batch.
    pub fn batch_add_text(&self, text: &str) -> Result<bool> {
        type AddMemFn = unsafe extern "C" fn(*const c_char) -> bool;
        let f: AddMemFn = self.lib.func("KeyExtract_Batch_AddMem")?;
        let text = self.lib.to_native(text)?;
        Ok(unsafe { f(text.as_ptr()) })
    }

    /// Finish feeding the batch.
    pub fn batch_complete(&self) -> Result<bool> {
        type CompleteFn = unsafe extern "C" fn() -> c_int;
        let f: CompleteFn = self.lib.func("KeyExtract_Batch_Complete")?;
        Ok(unsafe { f() } == 1)
    }

    /// The raw delimited batch result.
    pub fn batch_result(&self) -> Result<String> {
        type ResultFn = unsafe extern "C" fn() -> *const c_char;
        let f: ResultFn = self.lib.func("KeyExtract_Batch_GetResult")?;
        let result = unsafe { f() };
        Ok(self.lib.from_native(result))
    }

    /// The library's most recent error message, best-effort.
    pub fn last_error_message(&self) -> String {
        components::last_error(&self.lib, Some(LAST_ERROR))
    }
}

#[cfg(test)]
mod tests {
    use crate::components::Keyword;

    #[test]
    fn keyword_json_deserializes() {
        let raw = r#"[
            {"freq": 2, "pos": "n_new", "weight": 7.771335980376418, "word": "国家权力"},
            {"freq": 7, "pos": "n", "weight": 7.438759706600493, "word": "权力"}
        ]"#;
        let keywords: Vec<Keyword> = serde_json::from_str(raw).unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].word, "国家权力");
        assert_eq!(keywords[1].freq, 7);
        assert!(keywords[0].weight > keywords[1].weight);
    }

    #[test]
    fn keyword_json_without_freq_defaults() {
        let raw = r#"[{"pos": "n", "weight": 1.5, "word": "权力"}]"#;
        let keywords: Vec<Keyword> = serde_json::from_str(raw).unwrap();
        assert_eq!(keywords[0].freq, 0);
    }
}
