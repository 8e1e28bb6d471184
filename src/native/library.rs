//! Loaded-library wrapper: typed symbols and string marshaling.
//!
//! [`NativeLibrary`] owns one loaded vendor library together with the string
//! encoding its component was initialized with. Exported functions are looked
//! up by name, cached, and handed out as typed `extern "C"` function pointers;
//! the declared pointer type is the call signature, so argument and return
//! types are checked where the call is made. String arguments and results
//! cross the boundary through [`NativeLibrary::to_native`] and
//! [`NativeLibrary::from_native`], which apply the component encoding.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::mem;
use std::path::{Path, PathBuf};

use libc::c_char;
use libloading::Library;
use parking_lot::Mutex;

use crate::encoding::{self, EncodingCode};
use crate::error::{NlpirError, Result};
use crate::native::resolver;

/// One loaded native library plus its marshaling encoding.
#[derive(Debug)]
pub struct NativeLibrary {
    name: String,
    path: PathBuf,
    encoding: EncodingCode,
    /// Resolved symbol addresses. Addresses stay valid for the lifetime of
    /// `library`, which is dropped last.
    symbols: Mutex<HashMap<&'static str, usize>>,
    library: Library,
}

impl NativeLibrary {
    /// Resolve `name` inside `lib_dir` for the current platform and load it.
    pub fn open(name: &str, encoding: EncodingCode, lib_dir: &Path) -> Result<Self> {
        let path = resolver::resolve(name, lib_dir)?;
        let library = resolver::load(&path)?;
        Ok(Self {
            name: name.to_string(),
            path,
            encoding,
            symbols: Mutex::new(HashMap::new()),
            library,
        })
    }

    /// Load a library from an explicit path, bypassing the naming table.
    pub fn open_at(path: &Path, encoding: EncodingCode) -> Result<Self> {
        let library = resolver::load(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: path.to_path_buf(),
            encoding,
            symbols: Mutex::new(HashMap::new()),
            library,
        })
    }

    /// The logical library name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The encoding used for all string marshaling on this library.
    pub fn encoding(&self) -> EncodingCode {
        self.encoding
    }

    /// Look up the exported function `symbol` as the function-pointer type
    /// `F`.
    ///
    /// `F` must be an `extern "C"` function pointer matching the exported
    /// signature; a missing export fails with the symbol and library name
    /// rather than crashing at call time.
    pub fn func<F: Copy>(&self, symbol: &'static str) -> Result<F> {
        // A non-pointer F would be a bug at the call site, not runtime input.
        assert_eq!(
            mem::size_of::<F>(),
            mem::size_of::<usize>(),
            "native signature types must be function pointers"
        );
        let addr = self.symbol_addr(symbol)?;
        // Safety: addr was produced by the loader for this symbol and the
        // library is still loaded; the caller declared the signature.
        Ok(unsafe { mem::transmute_copy::<usize, F>(&addr) })
    }

    fn symbol_addr(&self, symbol: &'static str) -> Result<usize> {
        let mut cache = self.symbols.lock();
        if let Some(&addr) = cache.get(symbol) {
            return Ok(addr);
        }
        let c_name = CString::new(symbol).expect("symbol names contain no NUL");
        // Safety: the symbol is only used through `func`, where the caller
        // supplies the concrete signature.
        let sym: libloading::Symbol<'_, *const ()> = unsafe {
            self.library
                .get(c_name.as_bytes_with_nul())
                .map_err(|source| NlpirError::MissingSymbol {
                    symbol,
                    library: self.name.clone(),
                    source,
                })?
        };
        let addr = *sym as usize;
        log::debug!("resolved symbol '{}' in '{}'", symbol, self.name);
        cache.insert(symbol, addr);
        Ok(addr)
    }

    /// Encode a string argument for a native call.
    pub fn to_native(&self, text: &str) -> Result<CString> {
        encoding::encode_text(self.encoding, text)
    }

    /// Encode a filesystem path for a native call.
    pub fn path_to_native(&self, path: &Path) -> Result<CString> {
        self.to_native(&path.to_string_lossy())
    }

    /// Decode a C string returned by a native call.
    ///
    /// A NULL pointer decodes to the empty string; several native calls
    /// return NULL to mean "no result".
    pub fn from_native(&self, ptr: *const c_char) -> String {
        if ptr.is_null() {
            return String::new();
        }
        // Safety: non-null pointers returned by the wrapped calls point to
        // NUL-terminated buffers owned by the native library; they are copied
        // out before the next call into the same library.
        let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
        encoding::decode_text(self.encoding, bytes)
    }

    /// Decode a caller-provided output buffer filled by a native call.
    pub fn buffer_to_string(&self, buffer: &[u8]) -> String {
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        encoding::decode_text(self.encoding, &buffer[..end])
    }
}
