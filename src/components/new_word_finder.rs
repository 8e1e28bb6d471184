//! New-word discovery (the `NewWordFinder` library).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_int, c_uint, c_ulong};

use crate::components::{self, Keyword, FORMAT_JSON};
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const INIT: &str = "NWF_Init";
const EXIT: &str = "NWF_Exit";
const LAST_ERROR: &str = "NWF_GetLastErrorMsg";

/// The new-word discovery component.
pub struct NewWordFinder {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<NewWordFinder> = ComponentCell::new();

impl Component for NewWordFinder {
    const NAME: &'static str = "new_word_finder";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("NewWordFinder", config.encoding, &config.resolved_lib_dir())?;
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

impl Drop for NewWordFinder {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, EXIT);
    }
}

impl NewWordFinder {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`NewWordFinder::handle`] call.
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

    /// Discover up to `max_words` new words in `text`, heaviest first.
    /// Suited to inputs below ~20 MB; use the batch calls beyond that.
    pub fn new_words(&self, text: &str, max_words: u32) -> Result<Vec<Keyword>> {
        type NewWordsFn = unsafe extern "C" fn(*const c_char, c_int, c_int) -> *const c_char;
        let f: NewWordsFn = self.lib.func("NWF_GetNewWords")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), max_words as c_int, FORMAT_JSON) };
        parse_keywords(&self.lib.from_native(result))
    }

    /// Discover new words in a text file.
    pub fn file_new_words(&self, path: &Path, max_words: u32) -> Result<Vec<Keyword>> {
        type FileNewWordsFn = unsafe extern "C" fn(*const c_char, c_int, c_int) -> *const c_char;
        let f: FileNewWordsFn = self.lib.func("NWF_GetFileNewWords")?;
        let path = self.lib.path_to_native(path)?;
        let result = unsafe { f(path.as_ptr(), max_words as c_int, FORMAT_JSON) };
        parse_keywords(&self.lib.from_native(result))
    }

    /// Begin a batch discovery run.
    pub fn batch_start(&self) -> Result<bool> {
        type StartFn = unsafe extern "C" fn() -> c_int;
        let f: StartFn = self.lib.func("NWF_Batch_Start")?;
        Ok(unsafe { f() } == 1)
    }

    /// Feed a file into the running batch. Returns the native count.
    pub fn batch_add_file(&self, path: &Path) -> Result<u64> {
        type AddFileFn = unsafe extern "C" fn(*const c_char) -> c_ulong;
        let f: AddFileFn = self.lib.func("NWF_Batch_AddFile")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr()) } as u64)
    }

    /// Feed an in-memory document into the running batch.
    pub fn batch_add_text(&self, text: &str) -> Result<u64> {
        type AddMemFn = unsafe extern "C" fn(*const c_char) -> c_ulong;
        let f: AddMemFn = self.lib.func("NWF_Batch_AddMem")?;
        let text = self.lib.to_native(text)?;
        Ok(unsafe { f(text.as_ptr()) } as u64)
    }

    /// Finish feeding the batch.
    pub fn batch_complete(&self) -> Result<bool> {
        type CompleteFn = unsafe extern "C" fn() -> c_int;
        let f: CompleteFn = self.lib.func("NWF_Batch_Complete")?;
        Ok(unsafe { f() } == 1)
    }

    /// Collect the batch result.
    pub fn batch_result(&self) -> Result<Vec<Keyword>> {
        type ResultFn = unsafe extern "C" fn(bool) -> *const c_char;
        let f: ResultFn = self.lib.func("NWF_Batch_GetResult")?;
        let result = unsafe { f(true) };
        parse_keywords(&self.lib.from_native(result))
    }

    /// Promote the latest discovery result into the library's user
    /// dictionary. Returns the native status word.
    pub fn promote_result_to_user_dict(&self) -> Result<u32> {
        type PromoteFn = unsafe extern "C" fn() -> c_uint;
        let f: PromoteFn = self.lib.func("NWF_Result2UserDict")?;
        Ok(unsafe { f() })
    }

    /// The library's most recent error message, best-effort.
    pub fn last_error_message(&self) -> String {
        components::last_error(&self.lib, Some(LAST_ERROR))
    }
}

/// Write a discovery result as a `word\tpos` dictionary file, the format
/// accepted by the user-dictionary import calls.
pub fn write_dict_file(words: &[Keyword], path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    for keyword in words {
        writeln!(file, "{}\t{}", keyword.word, keyword.pos)?;
    }
    Ok(())
}

fn parse_keywords(raw: &str) -> Result<Vec<Keyword>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|err| NlpirError::Parse {
        what: "new word",
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_word_json_parses() {
        let raw = r#"[
            {"freq": 225, "pos": "n_new", "weight": 126.28066602434734, "word": "主权者"},
            {"freq": 103, "pos": "n_new", "weight": 45.549023266744136, "word": "卢梭"}
        ]"#;
        let words = parse_keywords(raw).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "主权者");
        assert_eq!(words[1].freq, 103);
    }

    #[test]
    fn empty_result_is_no_words() {
        assert!(parse_keywords("").unwrap().is_empty());
    }

    #[test]
    fn dict_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new_words.txt");
        let words = vec![
            Keyword {
                word: "主权者".into(),
                pos: "n_new".into(),
                weight: 126.3,
                freq: 225,
            },
            Keyword {
                word: "行政官".into(),
                pos: "n_new".into(),
                weight: 60.8,
                freq: 100,
            },
        ];
        write_dict_file(&words, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "主权者\tn_new\n行政官\tn_new\n");
    }
}
