//! Native library resolution.
//!
//! Maps a logical library name plus the current platform and pointer width to
//! the file the vendor ships for that combination, then loads it. The naming
//! table is fixed by the vendor's packaging, not derived:
//!
//! - Windows: `{name}64.dll` / `{name}32.dll`
//! - Linux:   `lib{name}64.so` / `lib{name}32.so`
//! - macOS:   `lib{name}darwin.so`
//!
//! Anything else is an unsupported platform and fails before touching the
//! filesystem.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{NlpirError, Result};

/// Operating systems the vendor ships binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// The platform this process is running on.
    pub fn current() -> Result<Self> {
        if cfg!(windows) {
            Ok(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::MacOs)
        } else {
            Err(NlpirError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ))
        }
    }

    /// Parse a platform identifier string (e.g. `"win32"`, `"linux"`,
    /// `"darwin"`). Unknown identifiers fail without any filesystem access.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        if identifier.starts_with("win") {
            Ok(Platform::Windows)
        } else if identifier.starts_with("linux") {
            Ok(Platform::Linux)
        } else if identifier == "darwin" || identifier == "macos" {
            Ok(Platform::MacOs)
        } else {
            Err(NlpirError::UnsupportedPlatform(identifier.to_string()))
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Linux => write!(f, "linux"),
            Platform::MacOs => write!(f, "darwin"),
        }
    }
}

/// Whether this process is a 64-bit build.
pub fn is_64bit() -> bool {
    cfg!(target_pointer_width = "64")
}

/// Construct the vendor file name for `name` on the given platform.
pub fn library_file_name(name: &str, platform: Platform, wide: bool) -> String {
    match (platform, wide) {
        (Platform::Windows, true) => format!("{}64.dll", name),
        (Platform::Windows, false) => format!("{}32.dll", name),
        (Platform::Linux, true) => format!("lib{}64.so", name),
        (Platform::Linux, false) => format!("lib{}32.so", name),
        // macOS builds are shipped 64-bit only, with a `.so` suffix kept for
        // uniformity with the Linux packaging.
        (Platform::MacOs, _) => format!("lib{}darwin.so", name),
    }
}

/// Resolve the absolute path of the native library `name` inside `lib_dir`.
pub fn resolve(name: &str, lib_dir: &Path) -> Result<PathBuf> {
    let platform = Platform::current()?;
    let file_name = library_file_name(name, platform, is_64bit());
    let path = lib_dir.join(file_name);
    log::debug!("using '{}' for library '{}' on {}", path.display(), name, platform);
    if !path.exists() {
        return Err(NlpirError::LibraryNotFound {
            name: name.to_string(),
            platform,
            path,
        });
    }
    Ok(path)
}

/// Load the library at `path` into the process.
///
/// Loader rejections (wrong architecture, unresolved native dependencies) are
/// reported with the platform and path; they are not retried.
pub fn load(path: &Path) -> Result<Library> {
    let platform = Platform::current()?;
    // Safety: loading a shared library runs its initializers. The files are
    // the vendor binaries this crate exists to bind; the caller chose the
    // directory they are read from.
    let library = unsafe {
        Library::new(path).map_err(|source| NlpirError::Load {
            platform,
            path: path.to_path_buf(),
            source,
        })?
    };
    log::debug!("library file '{}' loaded", path.display());
    Ok(library)
}
