//! Document information extraction (the `DocExtractor` library).
//!
//! One extraction pass over a document yields a native handle from which the
//! per-category results (people, places, keywords, abstract, …) can be
//! retrieved repeatedly. The handle is wrapped in an [`ExtractedDoc`] guard
//! released exactly once. User-defined categories are passed `#`-joined at
//! extraction time and addressed by codes following the built-in ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_int, c_uint, size_t};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::components::{self, impl_user_dictionary, KeywordBlacklist};
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const INIT: &str = "DE_Init";
const EXIT: &str = "DE_Exit";
const LAST_ERROR: &str = "DE_GetLastErrorMsg";

/// Request mask covering every built-in extraction category.
pub const ALL_REQUIRED: u32 = 0xffff;

/// Field code of the first user-defined category.
const USER_FIELD_BASE: c_int = 13;

/// Built-in extraction categories, plus user-defined ones by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocFieldKind {
    Person,
    Location,
    Organization,
    Keyword,
    Author,
    Media,
    Country,
    Province,
    Abstract,
    Positive,
    Negative,
    Text,
    Time,
    /// The n-th user-defined category passed to the extraction call.
    User(u32),
}

impl DocFieldKind {
    /// All built-in categories, in native code order.
    pub const BUILT_IN: [DocFieldKind; 13] = [
        DocFieldKind::Person,
        DocFieldKind::Location,
        DocFieldKind::Organization,
        DocFieldKind::Keyword,
        DocFieldKind::Author,
        DocFieldKind::Media,
        DocFieldKind::Country,
        DocFieldKind::Province,
        DocFieldKind::Abstract,
        DocFieldKind::Positive,
        DocFieldKind::Negative,
        DocFieldKind::Text,
        DocFieldKind::Time,
    ];

    fn code(self) -> c_int {
        match self {
            DocFieldKind::Person => 0,
            DocFieldKind::Location => 1,
            DocFieldKind::Organization => 2,
            DocFieldKind::Keyword => 3,
            DocFieldKind::Author => 4,
            DocFieldKind::Media => 5,
            DocFieldKind::Country => 6,
            DocFieldKind::Province => 7,
            DocFieldKind::Abstract => 8,
            DocFieldKind::Positive => 9,
            DocFieldKind::Negative => 10,
            DocFieldKind::Text => 11,
            DocFieldKind::Time => 12,
            DocFieldKind::User(n) => USER_FIELD_BASE + n as c_int,
        }
    }

    /// Stable name for built-in categories, used as result-map key.
    pub fn name(self) -> &'static str {
        match self {
            DocFieldKind::Person => "person",
            DocFieldKind::Location => "location",
            DocFieldKind::Organization => "organization",
            DocFieldKind::Keyword => "keyword",
            DocFieldKind::Author => "author",
            DocFieldKind::Media => "media",
            DocFieldKind::Country => "country",
            DocFieldKind::Province => "province",
            DocFieldKind::Abstract => "abstract",
            DocFieldKind::Positive => "positive",
            DocFieldKind::Negative => "negative",
            DocFieldKind::Text => "text",
            DocFieldKind::Time => "time",
            DocFieldKind::User(_) => "user",
        }
    }
}

/// One extracted entry: surface form, POS, weight and frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct DocField {
    pub word: String,
    pub pos: String,
    pub weight: f64,
    pub freq: u64,
}

/// The document extraction component.
pub struct DocExtractor {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<DocExtractor> = ComponentCell::new();

impl Component for DocExtractor {
    const NAME: &'static str = "doc_extractor";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("DocExtractor", config.encoding, &config.resolved_lib_dir())?;
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

impl Drop for DocExtractor {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, EXIT);
    }
}

impl_user_dictionary!(DocExtractor, "DE");

impl KeywordBlacklist for DocExtractor {
    fn import_blacklist_file(&self, path: &Path, pos_tags: &[&str]) -> Result<u32> {
        type ImportFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_uint;
        let f: ImportFn = self.lib.func("DE_ImportKeyBlackList")?;
        let path = self.lib.path_to_native(path)?;
        let tags = self.lib.to_native(&pos_tags.join("#"))?;
        Ok(unsafe { f(path.as_ptr(), tags.as_ptr()) })
    }

    fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl DocExtractor {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`DocExtractor::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        CELL.shutdown()
    }

    /// Extract every category from `text`, with markup removal on.
    pub fn extract(self: &Arc<Self>, text: &str, user_categories: &[&str]) -> Result<ExtractedDoc> {
        self.extract_with(text, user_categories, true, ALL_REQUIRED)
    }

    /// Extract from `text` with explicit markup handling and category mask.
    pub fn extract_with(
        self: &Arc<Self>,
        text: &str,
        user_categories: &[&str],
        strip_html: bool,
        required_mask: u32,
    ) -> Result<ExtractedDoc> {
        type ParseDocFn =
            unsafe extern "C" fn(*const c_char, *const c_char, bool, c_uint) -> size_t;
        let f: ParseDocFn = self.lib.func("DE_ParseDocE")?;
        let native_text = self.lib.to_native(text)?;
        let categories = self.lib.to_native(&user_categories.join("#"))?;
        let handle = unsafe {
            f(
                native_text.as_ptr(),
                categories.as_ptr(),
                strip_html,
                required_mask as c_uint,
            )
        };
        if handle == 0 {
            return Err(NlpirError::NativeFailure {
                operation: "DE_ParseDocE",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(ExtractedDoc {
            extractor: Arc::clone(self),
            handle,
            user_categories: user_categories.iter().map(|s| s.to_string()).collect(),
            released: false,
        })
    }

    /// Overall sentiment score of `text` without a full extraction pass.
    pub fn compute_sentiment(&self, text: &str) -> Result<i32> {
        type SentimentFn = unsafe extern "C" fn(*const c_char) -> c_int;
        let f: SentimentFn = self.lib.func("DE_ComputeSentimentDoc")?;
        let text = self.lib.to_native(text)?;
        Ok(unsafe { f(text.as_ptr()) })
    }

    /// Import a sentiment dictionary used by the extractor's scoring.
    pub fn import_sentiment_dict(&self, path: &Path) -> Result<bool> {
        type ImportFn = unsafe extern "C" fn(*const c_char) -> c_int;
        let f: ImportFn = self.lib.func("DE_ImportSentimentDict")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr()) } == 1)
    }

    fn field_with(&self, handle: size_t, kind: DocFieldKind) -> Result<Vec<DocField>> {
        type GetResultFn = unsafe extern "C" fn(size_t, c_int) -> *const c_char;
        let f: GetResultFn = self.lib.func("DE_GetResult")?;
        let result = unsafe { f(handle, kind.code()) };
        Ok(parse_doc_fields(&self.lib.from_native(result)))
    }

    fn sentiment_with(&self, handle: size_t) -> Result<i32> {
        type ScoreFn = unsafe extern "C" fn(size_t) -> c_int;
        let f: ScoreFn = self.lib.func("DE_GetSentimentScore")?;
        Ok(unsafe { f(handle) })
    }

    fn release(&self, handle: size_t) -> Result<()> {
        type ReleaseFn = unsafe extern "C" fn(size_t);
        let f: ReleaseFn = self.lib.func("DE_ReleaseHandle")?;
        unsafe { f(handle) };
        Ok(())
    }
}

/// One completed extraction pass.
///
/// Results can be read any number of times while the guard lives; the native
/// handle is released exactly once, on [`ExtractedDoc::close`] or drop.
pub struct ExtractedDoc {
    extractor: Arc<DocExtractor>,
    handle: size_t,
    user_categories: Vec<String>,
    released: bool,
}

impl ExtractedDoc {
    /// Entries extracted for one category.
    pub fn field(&self, kind: DocFieldKind) -> Result<Vec<DocField>> {
        self.extractor.field_with(self.handle, kind)
    }

    /// All categories — built-in plus user-defined — keyed by name.
    pub fn results(&self) -> Result<HashMap<String, Vec<DocField>>> {
        let mut map = HashMap::new();
        for kind in DocFieldKind::BUILT_IN {
            map.insert(kind.name().to_string(), self.field(kind)?);
        }
        for (index, name) in self.user_categories.iter().enumerate() {
            map.insert(name.clone(), self.field(DocFieldKind::User(index as u32))?);
        }
        Ok(map)
    }

    /// Sentiment score of the extracted document.
    pub fn sentiment_score(&self) -> Result<i32> {
        self.extractor.sentiment_with(self.handle)
    }

    /// Release the native handle now.
    pub fn close(mut self) -> Result<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.extractor.release(self.handle)
    }
}

impl Drop for ExtractedDoc {
    fn drop(&mut self) {
        if let Err(err) = self.release_once() {
            log::warn!("failed to release extraction handle: {}", err);
        }
    }
}

/// `word/pos/weight/freq#` rows in extraction results; the frequency part is
/// occasionally absent.
static DOC_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+?)/([a-z0-9A-Z]+?)/([.\d]+?)/(\d+)?#").expect("valid regex"));

fn parse_doc_fields(raw: &str) -> Vec<DocField> {
    DOC_FIELD
        .captures_iter(raw)
        .filter_map(|caps| {
            Some(DocField {
                word: caps[1].to_string(),
                pos: caps[2].to_string(),
                weight: caps[3].parse().ok()?,
                freq: caps
                    .get(4)
                    .map(|m| m.as_str().parse().unwrap_or(0))
                    .unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_rows_parse() {
        let fields = parse_doc_fields("卢梭/n/1.5/100#孟德斯鸠/nrf/5.28/1#");
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields[0],
            DocField {
                word: "卢梭".into(),
                pos: "n".into(),
                weight: 1.5,
                freq: 100
            }
        );
        assert_eq!(fields[1].pos, "nrf");
    }

    #[test]
    fn missing_frequency_defaults_to_zero() {
        let fields = parse_doc_fields("法国/nsf/2.0/#");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].freq, 0);
    }

    #[test]
    fn user_category_codes_follow_built_ins() {
        assert_eq!(DocFieldKind::Time.code(), 12);
        assert_eq!(DocFieldKind::User(0).code(), 13);
        assert_eq!(DocFieldKind::User(2).code(), 15);
    }
}
