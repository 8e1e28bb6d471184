//! Rust bindings for the NLPIR family of native Chinese NLP libraries.
//!
//! The actual NLP work — word segmentation, key-phrase extraction,
//! classification, sentiment analysis, summarization, clustering, document
//! extraction, keyword scanning — happens inside precompiled vendor
//! libraries loaded at runtime. This crate contains no NLP algorithms; it
//! locates and loads the right binary for the platform, declares the call
//! signatures of the exported functions, converts strings between Rust and
//! the per-component byte encoding (UTF-8, GBK, BIG5), keeps one live
//! instance per component per process, and reshapes the delimited/JSON/XML
//! text the native calls return into structured records.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ components::*         one wrapper per native lib │
//! │   Segmenter, KeyExtractor, KeyScanner, …         │
//! └───────────────┬──────────────────────────────────┘
//!                 │ typed extern "C" calls
//! ┌───────────────▼──────────────────────────────────┐
//! │ native::NativeLibrary   symbols + marshaling     │
//! │ native::resolver        platform naming table    │
//! │ native::ComponentCell   one instance per process │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use nlpir::{EncodingCode, Segmenter};
//!
//! fn main() -> nlpir::Result<()> {
//!     // Optional, before first use only.
//!     Segmenter::configure(|config| {
//!         config.encoding = EncodingCode::Utf8;
//!         config.data_dir = Some("/opt/nlpir".into());
//!     })?;
//!
//!     let segmenter = Segmenter::handle()?;
//!     for token in segmenter.segment_tagged("法国启蒙思想家孟德斯鸠曾说过")? {
//!         println!("{}/{}", token.word, token.pos);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Native binaries and data
//!
//! Library files are searched in `./lib` (override with `NLPIR_LIB_DIR` or
//! per component via `configure`), named per platform as
//! `{name}64.dll` / `lib{name}64.so` / `lib{name}darwin.so`. Each library
//! reads its models from a `Data` directory under the configured data root.
//!
//! # Threads and processes
//!
//! Native calls block the calling thread until the library returns; there
//! are no timeouts. Construction of each component is synchronized and
//! happens at most once per process. The vendor libraries are not documented
//! to be thread-safe for concurrent calls on one instance — for heavy
//! segmentation workloads prefer multiple processes, each with its own
//! instance.

#![warn(clippy::all)]

pub mod components;
pub mod dictionary;
pub mod encoding;
pub mod error;
pub mod native;

pub use components::{
    Classifier, Cluster, ClusterGroup, DeepClassifier, DocExtractor, DocField, DocFieldKind,
    Emotion, EmotionAnalysis, ExtractedDoc, KeyExtractor, KeyScanner, Keyword, KeywordBlacklist,
    NewWordFinder, PosMap, ScanContext, ScanHit, ScanMode, ScanReport, Segmenter, Sentiment,
    SimilarityModel, Summarizer, TextSimilarity, Token, UserDictionary, WordFreq, Workspace,
};
pub use encoding::EncodingCode;
pub use error::{NlpirError, Result};
pub use native::{Component, ComponentCell, ComponentConfig, Platform};

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Dated log files the native libraries drop next to their data
/// (`20260806.log`, `20260806.err`).
static NATIVE_LOG_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}\.(log|err)$").expect("valid regex"));

/// Delete the dated log files the native libraries write into their data
/// directory (and optionally the working directory).
///
/// The cleanup is advisory: files that cannot be removed are logged and
/// skipped, never raised. Returns the paths that were deleted.
pub fn clean_logs(data_dir: Option<&Path>, include_current_dir: bool) -> Result<Vec<PathBuf>> {
    let mut roots = vec![data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(native::singleton::default_data_dir)];
    if include_current_dir {
        roots.push(std::env::current_dir()?);
    }
    let mut deleted = Vec::new();
    for root in roots {
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("cannot list '{}': {}", root.display(), err);
                continue;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !NATIVE_LOG_FILE.is_match(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => deleted.push(path),
                Err(err) => log::warn!("cannot delete '{}': {}", path.display(), err),
            }
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_logs_removes_only_dated_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("20260806.log");
        let err = dir.path().join("20260806.err");
        let keep = dir.path().join("user_dict.txt");
        for path in [&log, &err, &keep] {
            std::fs::write(path, "x").unwrap();
        }

        let mut deleted = clean_logs(Some(dir.path()), false).unwrap();
        deleted.sort();
        assert_eq!(deleted, vec![err.clone(), log.clone()]);
        assert!(!log.exists());
        assert!(!err.exists());
        assert!(keep.exists());
    }
}
