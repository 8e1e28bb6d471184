//! Wrappers for the individual native libraries.
//!
//! Every component follows the same pattern: a struct owning its
//! [`NativeLibrary`](crate::native::NativeLibrary) and data directory, a
//! static [`ComponentCell`](crate::native::ComponentCell) providing the
//! process-wide instance, `configure`/`handle`/`shutdown` associated
//! functions delegating to the cell, and typed methods over the exported
//! native functions. Components that share exported function families
//! (user dictionaries, keyword blacklists) implement the corresponding
//! trait so helpers in [`crate::dictionary`] work across them.

pub mod classifier;
pub mod cluster;
pub mod deep_classifier;
pub mod doc_extractor;
pub mod key_extract;
pub mod key_scanner;
pub mod new_word_finder;
pub mod segmenter;
pub mod sentiment;
pub mod summarizer;
pub mod text_similarity;

pub use classifier::Classifier;
pub use cluster::{Cluster, ClusterGroup};
pub use deep_classifier::{DeepClassifier, Workspace};
pub use doc_extractor::{DocExtractor, DocField, DocFieldKind, ExtractedDoc};
pub use key_extract::KeyExtractor;
pub use key_scanner::{KeyScanner, ScanContext, ScanHit, ScanMode, ScanReport};
pub use new_word_finder::NewWordFinder;
pub use segmenter::{PosMap, Segmenter, Token, WordFreq};
pub use sentiment::{Emotion, EmotionAnalysis, Sentiment};
pub use summarizer::Summarizer;
pub use text_similarity::{SimilarityModel, TextSimilarity};

use std::path::Path;

use libc::{c_char, c_int};
use serde::{Deserialize, Serialize};

use crate::error::{NlpirError, Result};
use crate::native::NativeLibrary;

/// Output-format codes accepted by the keyword/new-word calls.
pub(crate) const FORMAT_JSON: c_int = 1;

/// A weighted word record as emitted by the keyword-extraction and
/// new-word-finder JSON results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub pos: String,
    pub weight: f64,
    #[serde(default)]
    pub freq: i64,
}

/// Query a component's last-error export, if it has one.
pub(crate) fn last_error(lib: &NativeLibrary, error_symbol: Option<&'static str>) -> String {
    let Some(symbol) = error_symbol else {
        return "no error detail available from this library".into();
    };
    type LastErrorFn = unsafe extern "C" fn() -> *const c_char;
    match lib.func::<LastErrorFn>(symbol) {
        Ok(f) => {
            let message = lib.from_native(unsafe { f() });
            if message.is_empty() {
                "native library reported failure without detail".into()
            } else {
                message
            }
        }
        Err(err) => {
            log::warn!("cannot fetch native error detail: {err}");
            "native error detail unavailable".into()
        }
    }
}

/// Run the common `(data_path, encoding, license) -> int` init entry point.
///
/// Nonzero means success; on failure the component's last-error message (when
/// the library exports one) becomes the error detail. This is the only place
/// native errors are surfaced during startup.
pub(crate) fn run_standard_init(
    lib: &NativeLibrary,
    component: &'static str,
    init_symbol: &'static str,
    error_symbol: Option<&'static str>,
    data_dir: &Path,
    license_code: &str,
) -> Result<()> {
    type InitFn = unsafe extern "C" fn(*const c_char, c_int, *const c_char) -> c_int;
    let init: InitFn = lib.func(init_symbol)?;
    let data = lib.path_to_native(data_dir)?;
    let license = lib.to_native(license_code)?;
    let status = unsafe { init(data.as_ptr(), lib.encoding().native_code(), license.as_ptr()) };
    if status == 0 {
        return Err(NlpirError::InitFailed {
            component,
            detail: last_error(lib, error_symbol),
        });
    }
    log::debug!("component '{}' initialized via {}", component, init_symbol);
    Ok(())
}

/// Invoke an `() -> int` exit entry point, logging rather than raising:
/// teardown is advisory and usually runs during process shutdown.
pub(crate) fn run_exit_int(lib: &NativeLibrary, component: &'static str, symbol: &'static str) {
    type ExitFn = unsafe extern "C" fn() -> c_int;
    match lib.func::<ExitFn>(symbol) {
        Ok(f) => {
            unsafe { f() };
            log::debug!("component '{}' exited via {}", component, symbol);
        }
        Err(err) => log::warn!("skipping native exit for '{}': {}", component, err),
    }
}

/// Invoke an `() -> void` exit entry point.
pub(crate) fn run_exit_void(lib: &NativeLibrary, component: &'static str, symbol: &'static str) {
    type ExitFn = unsafe extern "C" fn();
    match lib.func::<ExitFn>(symbol) {
        Ok(f) => {
            unsafe { f() };
            log::debug!("component '{}' exited via {}", component, symbol);
        }
        Err(err) => log::warn!("skipping native exit for '{}': {}", component, err),
    }
}

/// In-memory user dictionary operations shared by the components whose
/// libraries export the `ImportUserDict`/`AddUserWord`/`DelUsrWord`/
/// `CleanUserWord`/`SaveTheUsrDic` family.
///
/// Implementing this trait is the capability check: a component without the
/// native functions simply does not implement it, so "unsupported operation"
/// is rejected at compile time instead of failing on a missing symbol.
pub trait UserDictionary {
    /// Import a `word[ \t]pos` dictionary file. Returns the native status
    /// word (the library persists the dictionary into its data directory).
    fn import_user_dict(&self, path: &Path, overwrite: bool) -> Result<u32>;

    /// Add a single `word` or `word pos` entry to the in-memory dictionary.
    fn add_user_word(&self, word: &str) -> Result<bool>;

    /// Remove a word from the in-memory dictionary. `Ok(false)` when the
    /// word was not present.
    fn delete_user_word(&self, word: &str) -> Result<bool>;

    /// Discard all words added via [`UserDictionary::add_user_word`].
    fn clean_user_words(&self) -> Result<bool>;

    /// Persist the in-memory additions into the library's user dictionary.
    fn save_user_dict(&self) -> Result<bool>;
}

/// Keyword-blacklist import, exported by the keyword extractor and the
/// document extractor. The surrounding backup/rollback file protocol lives
/// in [`crate::dictionary`].
pub trait KeywordBlacklist {
    /// Invoke the native blacklist import for `path`, restricting to the
    /// given POS tags (empty slice = no restriction). Returns the native
    /// status word.
    fn import_blacklist_file(&self, path: &Path, pos_tags: &[&str]) -> Result<u32>;

    /// The data root this component was initialized with; the blacklist
    /// data file lives beneath it.
    fn data_dir(&self) -> &Path;
}

/// Implement [`UserDictionary`] over the uniformly named native exports.
macro_rules! impl_user_dictionary {
    ($component:ty, $prefix:literal) => {
        impl $crate::components::UserDictionary for $component {
            fn import_user_dict(
                &self,
                path: &::std::path::Path,
                overwrite: bool,
            ) -> $crate::error::Result<u32> {
                type ImportFn =
                    unsafe extern "C" fn(*const ::libc::c_char, bool) -> ::libc::c_uint;
                let f: ImportFn = self.lib.func(concat!($prefix, "_ImportUserDict"))?;
                let path = self.lib.path_to_native(path)?;
                Ok(unsafe { f(path.as_ptr(), overwrite) })
            }

            fn add_user_word(&self, word: &str) -> $crate::error::Result<bool> {
                type AddFn = unsafe extern "C" fn(*const ::libc::c_char) -> ::libc::c_int;
                let f: AddFn = self.lib.func(concat!($prefix, "_AddUserWord"))?;
                let word = self.lib.to_native(word)?;
                Ok(unsafe { f(word.as_ptr()) } == 1)
            }

            fn delete_user_word(&self, word: &str) -> $crate::error::Result<bool> {
                type DelFn = unsafe extern "C" fn(*const ::libc::c_char) -> ::libc::c_int;
                let f: DelFn = self.lib.func(concat!($prefix, "_DelUsrWord"))?;
                let word = self.lib.to_native(word)?;
                // -1 means the word was never in the dictionary; any other
                // value is the handle of the removed entry.
                Ok(unsafe { f(word.as_ptr()) } != -1)
            }

            fn clean_user_words(&self) -> $crate::error::Result<bool> {
                type CleanFn = unsafe extern "C" fn() -> ::libc::c_int;
                let f: CleanFn = self.lib.func(concat!($prefix, "_CleanUserWord"))?;
                Ok(unsafe { f() } == 1)
            }

            fn save_user_dict(&self) -> $crate::error::Result<bool> {
                type SaveFn = unsafe extern "C" fn() -> ::libc::c_int;
                let f: SaveFn = self.lib.func(concat!($prefix, "_SaveTheUsrDic"))?;
                Ok(unsafe { f() } == 1)
            }
        }
    };
}

pub(crate) use impl_user_dictionary;
