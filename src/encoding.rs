//! String encodings at the native boundary.
//!
//! Every wrapped library takes an encoding code at init time and expects all
//! subsequent string arguments in that encoding. The codes below mirror the
//! native header values; [`encode_text`]/[`decode_text`] do the transcoding
//! on each call so callers only ever see Rust `&str`/`String`.

use std::ffi::CString;

use encoding_rs::{Encoding, BIG5, GBK, UTF_8};
use libc::c_int;

use crate::error::{NlpirError, Result};

/// Encoding codes understood by the native init entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingCode {
    /// Mixed/unknown input; the native side auto-detects. Slow, discouraged.
    Unknown,
    /// GBK (simplified Chinese), the native default.
    Gbk,
    /// UTF-8.
    Utf8,
    /// BIG5 (traditional Chinese).
    Big5,
    /// GBK containing traditional characters.
    GbkFanti,
    /// UTF-8 with traditional-to-simplified conversion on the native side.
    Utf8Fanti,
}

impl EncodingCode {
    /// The integer value passed to the native init call.
    pub fn native_code(self) -> c_int {
        match self {
            EncodingCode::Unknown => -1,
            EncodingCode::Gbk => 0,
            EncodingCode::Utf8 => 1,
            EncodingCode::Big5 => 2,
            EncodingCode::GbkFanti => 3,
            EncodingCode::Utf8Fanti => 4,
        }
    }

    /// The byte encoding used when marshaling strings for this code.
    fn charset(self) -> &'static Encoding {
        match self {
            EncodingCode::Gbk | EncodingCode::GbkFanti => GBK,
            EncodingCode::Big5 => BIG5,
            // Auto-detect mode still hands UTF-8 bytes to the native side.
            EncodingCode::Unknown | EncodingCode::Utf8 | EncodingCode::Utf8Fanti => UTF_8,
        }
    }
}

/// Encode `text` into a NUL-terminated byte string in the given encoding.
///
/// Characters with no representation in the target encoding are substituted
/// by the encoder; interior NUL bytes are rejected because the native calls
/// take C strings.
pub(crate) fn encode_text(code: EncodingCode, text: &str) -> Result<CString> {
    let (bytes, _, had_errors) = code.charset().encode(text);
    if had_errors {
        log::warn!(
            "input text contains characters not representable in {:?}; substituted",
            code
        );
    }
    CString::new(bytes.into_owned())
        .map_err(|_| NlpirError::Encoding("input text contains an interior NUL byte".into()))
}

/// Decode bytes returned by a native call back into a `String`.
///
/// Malformed sequences are replaced rather than failing: the bytes come from
/// an opaque library and are surfaced best-effort.
pub(crate) fn decode_text(code: EncodingCode, bytes: &[u8]) -> String {
    let (text, _, had_errors) = code.charset().decode(bytes);
    if had_errors {
        log::warn!("native result contained malformed {:?} bytes; replaced", code);
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_codes_match_header_values() {
        assert_eq!(EncodingCode::Unknown.native_code(), -1);
        assert_eq!(EncodingCode::Gbk.native_code(), 0);
        assert_eq!(EncodingCode::Utf8.native_code(), 1);
        assert_eq!(EncodingCode::Big5.native_code(), 2);
        assert_eq!(EncodingCode::GbkFanti.native_code(), 3);
        assert_eq!(EncodingCode::Utf8Fanti.native_code(), 4);
    }

    #[test]
    fn utf8_round_trip() {
        let text = "法国启蒙思想家孟德斯鸠曾说过";
        let encoded = encode_text(EncodingCode::Utf8, text).unwrap();
        assert_eq!(decode_text(EncodingCode::Utf8, encoded.as_bytes()), text);
    }

    #[test]
    fn gbk_round_trip() {
        let text = "中文分词系统";
        let encoded = encode_text(EncodingCode::Gbk, text).unwrap();
        // GBK uses two bytes per CJK character.
        assert_eq!(encoded.as_bytes().len(), text.chars().count() * 2);
        assert_eq!(decode_text(EncodingCode::Gbk, encoded.as_bytes()), text);
    }

    #[test]
    fn big5_round_trip() {
        let text = "中華民國";
        let encoded = encode_text(EncodingCode::Big5, text).unwrap();
        assert_eq!(decode_text(EncodingCode::Big5, encoded.as_bytes()), text);
    }

    #[test]
    fn interior_nul_is_rejected() {
        let err = encode_text(EncodingCode::Utf8, "abc\0def").unwrap_err();
        assert!(matches!(err, NlpirError::Encoding(_)));
    }
}
