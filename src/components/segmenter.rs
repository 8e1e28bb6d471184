//! Chinese word segmentation (the `NLPIR` library).
//!
//! Multi-process parallel use is the recommended way to scale segmentation:
//! each process holds its own singleton instance. Concurrent calls into one
//! instance from several threads are passed straight to the native library,
//! whose thread safety is not documented; treat them as unsupported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_double, c_int};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::components::{self, impl_user_dictionary};
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const INIT: &str = "NLPIR_Init";
const EXIT: &str = "NLPIR_Exit";
const LAST_ERROR: &str = "NLPIR_GetLastErrorMsg";

/// POS tag sets selectable via [`Segmenter::set_pos_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosMap {
    /// ICT first-level tag set.
    IctFirst,
    /// ICT second-level tag set (the native default).
    IctSecond,
    /// PKU second-level tag set.
    PkuSecond,
    /// PKU first-level tag set.
    PkuFirst,
}

impl PosMap {
    fn code(self) -> c_int {
        match self {
            PosMap::IctSecond => 0,
            PosMap::IctFirst => 1,
            PosMap::PkuSecond => 2,
            PosMap::PkuFirst => 3,
        }
    }
}

/// A segmented word with its POS tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub pos: String,
}

/// One row of a word-frequency statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFreq {
    pub word: String,
    pub pos: String,
    pub freq: u64,
}

/// The word segmentation component.
pub struct Segmenter {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<Segmenter> = ComponentCell::new();

impl Component for Segmenter {
    const NAME: &'static str = "segmenter";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open("NLPIR", config.encoding, &config.resolved_lib_dir())?;
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

impl Drop for Segmenter {
    fn drop(&mut self) {
        components::run_exit_int(&self.lib, Self::NAME, EXIT);
    }
}

impl_user_dictionary!(Segmenter, "NLPIR");

impl Segmenter {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`Segmenter::handle`] call.
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

    /// Segment a paragraph, returning the raw native output: words separated
    /// by spaces, each followed by `/pos` when `pos_tagged` is set.
    pub fn paragraph_process(&self, text: &str, pos_tagged: bool) -> Result<String> {
        type ProcessFn = unsafe extern "C" fn(*const c_char, c_int) -> *const c_char;
        let f: ProcessFn = self.lib.func("NLPIR_ParagraphProcess")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), pos_tagged as c_int) };
        Ok(self.lib.from_native(result))
    }

    /// Segment `text` into words.
    pub fn segment(&self, text: &str) -> Result<Vec<String>> {
        let raw = self.paragraph_process(text, false)?;
        Ok(split_plain(&raw))
    }

    /// Segment `text` into POS-tagged tokens.
    pub fn segment_tagged(&self, text: &str) -> Result<Vec<Token>> {
        let raw = self.paragraph_process(text, true)?;
        Ok(parse_tagged(&raw))
    }

    /// Segment a text file into `result_path`. Returns the native processing
    /// time in seconds.
    pub fn file_process(
        &self,
        source_path: &Path,
        result_path: &Path,
        pos_tagged: bool,
    ) -> Result<f64> {
        type FileProcessFn =
            unsafe extern "C" fn(*const c_char, *const c_char, c_int) -> c_double;
        let f: FileProcessFn = self.lib.func("NLPIR_FileProcess")?;
        let source = self.lib.path_to_native(source_path)?;
        let result = self.lib.path_to_native(result_path)?;
        Ok(unsafe { f(source.as_ptr(), result.as_ptr(), pos_tagged as c_int) })
    }

    /// Unigram probability of `word` in the core dictionary.
    pub fn word_probability(&self, word: &str) -> Result<f64> {
        type ProbFn = unsafe extern "C" fn(*const c_char) -> c_double;
        let f: ProbFn = self.lib.func("NLPIR_GetUniProb")?;
        let word = self.lib.to_native(word)?;
        Ok(unsafe { f(word.as_ptr()) })
    }

    /// Whether `word` exists in the core dictionary.
    pub fn is_word(&self, word: &str) -> Result<bool> {
        type IsWordFn = unsafe extern "C" fn(*const c_char) -> c_int;
        let f: IsWordFn = self.lib.func("NLPIR_IsWord")?;
        let word = self.lib.to_native(word)?;
        Ok(unsafe { f(word.as_ptr()) } == 1)
    }

    /// Whether `word` exists in the user dictionary.
    pub fn is_user_word(&self, word: &str, is_ascii: bool) -> Result<bool> {
        type IsUserWordFn = unsafe extern "C" fn(*const c_char, bool) -> c_int;
        let f: IsUserWordFn = self.lib.func("NLPIR_IsUserWord")?;
        let word = self.lib.to_native(word)?;
        Ok(unsafe { f(word.as_ptr(), is_ascii) } == 1)
    }

    /// POS information for a single word.
    pub fn word_pos(&self, word: &str) -> Result<String> {
        type WordPosFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
        let f: WordPosFn = self.lib.func("NLPIR_GetWordPOS")?;
        let word = self.lib.to_native(word)?;
        let result = unsafe { f(word.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Select the POS tag set used by subsequent segmentation calls.
    pub fn set_pos_map(&self, pos_map: PosMap) -> Result<()> {
        type SetPosMapFn = unsafe extern "C" fn(c_int) -> c_int;
        let f: SetPosMapFn = self.lib.func("NLPIR_SetPOSmap")?;
        if unsafe { f(pos_map.code()) } == 0 {
            return Err(NlpirError::NativeFailure {
                operation: "NLPIR_SetPOSmap",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(())
    }

    /// Split an over-long segment (e.g. a compound proper noun) into finer
    /// pieces. Empty result means the input cannot be subdivided.
    pub fn finer_segment(&self, text: &str) -> Result<String> {
        type FinerFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
        let f: FinerFn = self.lib.func("NLPIR_FinerSegment")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Reduce an inflected English word to its base form.
    pub fn english_word_origin(&self, word: &str) -> Result<String> {
        type OriginFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
        let f: OriginFn = self.lib.func("NLPIR_GetEngWordOrign")?;
        let word = self.lib.to_native(word)?;
        let result = unsafe { f(word.as_ptr()) };
        Ok(self.lib.from_native(result))
    }

    /// Word/POS/frequency statistics over `text`, most frequent first.
    pub fn word_freq_stat(&self, text: &str, remove_stop_words: bool) -> Result<Vec<WordFreq>> {
        type FreqFn = unsafe extern "C" fn(*const c_char, bool) -> *const c_char;
        let f: FreqFn = self.lib.func("NLPIR_WordFreqStat")?;
        let text = self.lib.to_native(text)?;
        let result = unsafe { f(text.as_ptr(), remove_stop_words) };
        Ok(parse_word_freq(&self.lib.from_native(result)))
    }

    /// Like [`Segmenter::word_freq_stat`], reading a file.
    pub fn file_word_freq_stat(
        &self,
        path: &Path,
        remove_stop_words: bool,
    ) -> Result<Vec<WordFreq>> {
        type FreqFn = unsafe extern "C" fn(*const c_char, bool) -> *const c_char;
        let f: FreqFn = self.lib.func("NLPIR_FileWordFreqStat")?;
        let path = self.lib.path_to_native(path)?;
        let result = unsafe { f(path.as_ptr(), remove_stop_words) };
        Ok(parse_word_freq(&self.lib.from_native(result)))
    }

    /// The library's most recent error message, best-effort.
    pub fn last_error_message(&self) -> String {
        components::last_error(&self.lib, Some(LAST_ERROR))
    }
}

/// `word/pos ` pairs in tagged segmentation output.
static TAGGED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+?)/([a-z0-9A-Z]+) ").expect("valid regex"));

fn split_plain(raw: &str) -> Vec<String> {
    raw.split(' ')
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_tagged(raw: &str) -> Vec<Token> {
    TAGGED_TOKEN
        .captures_iter(raw)
        .map(|caps| Token {
            word: caps[1].to_string(),
            pos: caps[2].to_string(),
        })
        .collect()
}

fn parse_word_freq(raw: &str) -> Vec<WordFreq> {
    raw.split('#')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.rsplitn(2, '/');
            let freq = parts.next()?.trim().parse().ok()?;
            let rest = parts.next()?;
            let (word, pos) = rest.rsplit_once('/')?;
            Some(WordFreq {
                word: word.to_string(),
                pos: pos.to_string(),
                freq,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGGED: &str = "法国/nsf 启蒙/vn 思想家/n 孟德斯/nrf 鸠/n 曾/d 说/v 过/uguo ";

    #[test]
    fn tagged_output_parses_to_tokens() {
        let tokens = parse_tagged(TAGGED);
        assert_eq!(tokens.len(), 8);
        assert_eq!(
            tokens[0],
            Token {
                word: "法国".into(),
                pos: "nsf".into()
            }
        );
        assert_eq!(tokens[7].pos, "uguo");
    }

    #[test]
    fn plain_output_splits_on_spaces() {
        let words = split_plain("法国 启蒙 思想家 ");
        assert_eq!(words, vec!["法国", "启蒙", "思想家"]);
    }

    #[test]
    fn word_freq_rows_parse() {
        let rows = parse_word_freq("张华平/nr/10#博士/n/9#分词/n/8");
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            WordFreq {
                word: "张华平".into(),
                pos: "nr".into(),
                freq: 10
            }
        );
        assert_eq!(rows[2].freq, 8);
    }

    #[test]
    fn malformed_freq_rows_are_skipped() {
        let rows = parse_word_freq("好/n/notanumber#权力/n/7#");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].word, "权力");
    }
}
