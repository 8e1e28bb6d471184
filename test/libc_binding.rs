//! Drives the loader/adapter path against a real shared library.
//!
//! The vendor binaries are not redistributable, so these tests bind libc
//! instead: the same loading, symbol resolution and string marshaling code
//! paths, against exports that exist on every Linux host.

#![cfg(target_os = "linux")]

use std::path::Path;

use nlpir::native::NativeLibrary;
use nlpir::{EncodingCode, NlpirError};

fn open_libc(encoding: EncodingCode) -> Option<NativeLibrary> {
    // Resolved through the loader's normal search path.
    match NativeLibrary::open_at(Path::new("libc.so.6"), encoding) {
        Ok(lib) => Some(lib),
        Err(err) => {
            eprintln!("skipping libc-backed test: {err}");
            None
        }
    }
}

#[test]
fn symbol_resolution_and_call() {
    let Some(lib) = open_libc(EncodingCode::Utf8) else {
        return;
    };
    type GetPidFn = unsafe extern "C" fn() -> i32;
    let getpid: GetPidFn = lib.func("getpid").expect("libc exports getpid");
    let pid = unsafe { getpid() };
    assert_eq!(pid as u32, std::process::id());

    // Second lookup hits the symbol cache and must agree.
    let again: GetPidFn = lib.func("getpid").unwrap();
    assert_eq!(unsafe { again() }, pid);
}

#[test]
fn missing_symbol_is_reported_not_crashed() {
    let Some(lib) = open_libc(EncodingCode::Utf8) else {
        return;
    };
    type AnyFn = unsafe extern "C" fn() -> i32;
    let err = lib.func::<AnyFn>("nlpir_no_such_symbol").unwrap_err();
    match err {
        NlpirError::MissingSymbol { symbol, .. } => {
            assert_eq!(symbol, "nlpir_no_such_symbol");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn string_marshaling_respects_the_configured_encoding() {
    type StrlenFn = unsafe extern "C" fn(*const libc::c_char) -> usize;

    // UTF-8: three bytes per CJK character.
    let Some(utf8) = open_libc(EncodingCode::Utf8) else {
        return;
    };
    let strlen: StrlenFn = utf8.func("strlen").unwrap();
    let text = utf8.to_native("中文").unwrap();
    assert_eq!(unsafe { strlen(text.as_ptr()) }, 6);

    // GBK: two bytes per CJK character, through the same call.
    let Some(gbk) = open_libc(EncodingCode::Gbk) else {
        return;
    };
    let strlen: StrlenFn = gbk.func("strlen").unwrap();
    let text = gbk.to_native("中文").unwrap();
    assert_eq!(unsafe { strlen(text.as_ptr()) }, 4);
}

#[test]
fn load_rejection_carries_platform_and_path() {
    let err = NativeLibrary::open_at(Path::new("/dev/null"), EncodingCode::Utf8).unwrap_err();
    match err {
        NlpirError::Load { path, .. } => assert_eq!(path, Path::new("/dev/null")),
        other => panic!("unexpected error: {other}"),
    }
}
