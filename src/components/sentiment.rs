//! Sentiment analysis.
//!
//! Two native libraries cover this task: `SentimentNew` scores sentiment for
//! analysis objects inside a document ([`Sentiment`]), and
//! `LJSentimentAnalysis` rates a paragraph over seven emotion categories
//! ([`EmotionAnalysis`]). The latter exports no last-error function, so its
//! startup failures carry a fixed detail.

use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libc::{c_char, c_double, c_int};

use crate::components;
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

/// Result buffer size for the paragraph emotion call, from the vendor
/// samples.
const EMOTION_BUFFER_LEN: usize = 10240;

/// Emotion categories reported by [`EmotionAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Good,
    Anger,
    Sorrow,
    Fear,
    Evil,
    Surprise,
}

impl Emotion {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "EMOTION_HAPPY" => Some(Emotion::Happy),
            "EMOTION_GOOD" => Some(Emotion::Good),
            "EMOTION_ANGER" => Some(Emotion::Anger),
            "EMOTION_SORROW" => Some(Emotion::Sorrow),
            "EMOTION_FEAR" => Some(Emotion::Fear),
            "EMOTION_EVIL" => Some(Emotion::Evil),
            "EMOTION_SURPRISE" => Some(Emotion::Surprise),
            _ => None,
        }
    }
}

/// Object-level sentiment scoring (the `SentimentNew` library).
pub struct Sentiment {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static SENTIMENT_CELL: ComponentCell<Sentiment> = ComponentCell::new();

impl Component for Sentiment {
    const NAME: &'static str = "sentiment";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib =
            NativeLibrary::open("SentimentNew", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        components::run_standard_init(
            &lib,
            Self::NAME,
            "ST_Init",
            Some("ST_GetLastErrMsg"),
            &data_dir,
            &config.license_code,
        )?;
        Ok(Self { lib, data_dir })
    }
}

impl Drop for Sentiment {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, "ST_Exit");
    }
}

impl Sentiment {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        SENTIMENT_CELL.get()
    }

    /// Adjust settings before the first [`Sentiment::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        SENTIMENT_CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        SENTIMENT_CELL.shutdown()
    }

    /// The data root this instance was initialized with.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Sentiment result for one analysis object mentioned in the document.
    /// Returns the raw native markup.
    pub fn one_object_result(&self, title: &str, content: &str, object: &str) -> Result<String> {
        type OneObjectFn =
            unsafe extern "C" fn(*const c_char, *const c_char, *const c_char) -> *const c_char;
        let f: OneObjectFn = self.lib.func("ST_GetOneObjectResult")?;
        let title = self.lib.to_native(title)?;
        let content = self.lib.to_native(content)?;
        let object = self.lib.to_native(object)?;
        let result = unsafe { f(title.as_ptr(), content.as_ptr(), object.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Sentiment results for every object defined in a rule file.
    pub fn multi_object_result(
        &self,
        title: &str,
        content: &str,
        rule_file: &Path,
    ) -> Result<String> {
        type MultiObjectFn =
            unsafe extern "C" fn(*const c_char, *const c_char, *const c_char) -> *const c_char;
        let f: MultiObjectFn = self.lib.func("ST_GetMultiObjectResult")?;
        let title = self.lib.to_native(title)?;
        let content = self.lib.to_native(content)?;
        let rules = self.lib.path_to_native(rule_file)?;
        let result = unsafe { f(title.as_ptr(), content.as_ptr(), rules.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Signed sentiment score of a single sentence.
    pub fn sentence_point(&self, sentence: &str) -> Result<f64> {
        type PointFn = unsafe extern "C" fn(*const c_char) -> c_double;
        let f: PointFn = self.lib.func("ST_GetSentimentPoint")?;
        let sentence = self.lib.to_native(sentence)?;
        Ok(unsafe { f(sentence.as_ptr()) })
    }

    /// Import a sentiment user dictionary file.
    pub fn import_user_dict(&self, path: &Path, overwrite: bool) -> Result<bool> {
        type ImportFn = unsafe extern "C" fn(*const c_char, bool) -> c_int;
        let f: ImportFn = self.lib.func("ST_ImportUserDict")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr(), overwrite) } == 1)
    }
}

/// Paragraph emotion rating (the `LJSentimentAnalysis` library).
pub struct EmotionAnalysis {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static EMOTION_CELL: ComponentCell<EmotionAnalysis> = ComponentCell::new();

impl Component for EmotionAnalysis {
    const NAME: &'static str = "emotion_analysis";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open(
            "LJSentimentAnalysis",
            config.encoding,
            &config.resolved_lib_dir(),
        )?;
        let data_dir = config.resolved_data_dir();
        // This library exports no last-error function.
        components::run_standard_init(
            &lib,
            Self::NAME,
            "LJST_Inits",
            None,
            &data_dir,
            &config.license_code,
        )?;
        Ok(Self { lib, data_dir })
    }
}

impl Drop for EmotionAnalysis {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, "LJST_Exits");
    }
}

impl EmotionAnalysis {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        EMOTION_CELL.get()
    }

    /// Adjust settings before the first [`EmotionAnalysis::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        EMOTION_CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        EMOTION_CELL.shutdown()
    }

    /// The data root this instance was initialized with.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Score a paragraph over the seven emotion categories.
    pub fn paragraph_emotions(&self, text: &str) -> Result<Vec<(Emotion, i32)>> {
        type ParagraphFn = unsafe extern "C" fn(*const c_char, *mut c_char) -> bool;
        let f: ParagraphFn = self.lib.func("LJST_GetParagraphSent")?;
        let text = self.lib.to_native(text)?;
        let mut buffer = vec![0u8; EMOTION_BUFFER_LEN];
        let ok = unsafe { f(text.as_ptr(), buffer.as_mut_ptr() as *mut c_char) };
        if !ok {
            return Err(NlpirError::NativeFailure {
                operation: "LJST_GetParagraphSent",
                detail: "the library reported failure".into(),
            });
        }
        Ok(parse_emotions(&self.lib.buffer_to_string(&buffer)))
    }

    /// Score a text file over the seven emotion categories.
    pub fn file_emotions(&self, path: &Path) -> Result<Vec<(Emotion, i32)>> {
        type FileFn = unsafe extern "C" fn(*const c_char, *mut *const c_char) -> bool;
        let f: FileFn = self.lib.func("LJST_GetFileSent")?;
        let path = self.lib.path_to_native(path)?;
        let mut result: *const c_char = ptr::null();
        let ok = unsafe { f(path.as_ptr(), &mut result) };
        if !ok {
            return Err(NlpirError::NativeFailure {
                operation: "LJST_GetFileSent",
                detail: "the library reported failure".into(),
            });
        }
        Ok(parse_emotions(&self.lib.from_native(result)))
    }

    /// Import an emotion user dictionary file.
    pub fn import_user_dict(&self, path: &Path, overwrite: bool) -> Result<bool> {
        type ImportFn = unsafe extern "C" fn(*const c_char, bool) -> c_int;
        let f: ImportFn = self.lib.func("LJST_ImportUserDict")?;
        let path = self.lib.path_to_native(path)?;
        Ok(unsafe { f(path.as_ptr(), overwrite) } == 1)
    }
}

/// Parse `EMOTION_NAME/score` lines. Unknown labels and malformed lines are
/// skipped; the categories are fixed by the vendor.
fn parse_emotions(raw: &str) -> Vec<(Emotion, i32)> {
    raw.lines()
        .filter_map(|line| {
            let (label, score) = line.trim().split_once('/')?;
            Some((Emotion::from_label(label)?, score.trim().parse().ok()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_lines_parse() {
        let raw = "EMOTION_HAPPY/5\nEMOTION_ANGER/2\nEMOTION_SURPRISE/0\n";
        let emotions = parse_emotions(raw);
        assert_eq!(emotions.len(), 3);
        assert_eq!(emotions[0], (Emotion::Happy, 5));
        assert_eq!(emotions[1], (Emotion::Anger, 2));
        assert_eq!(emotions[2], (Emotion::Surprise, 0));
    }

    #[test]
    fn unknown_labels_are_skipped() {
        let raw = "EMOTION_HAPPY/1\nEMOTION_BOGUS/9\nnot a line\n";
        let emotions = parse_emotions(raw);
        assert_eq!(emotions, vec![(Emotion::Happy, 1)]);
    }
}
