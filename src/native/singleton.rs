//! Per-component lifecycle: configuration, lazy construction, teardown.
//!
//! Each wrapped library gets one process-wide instance, built on first
//! access. Construction parameters may be adjusted any number of times before
//! that first access and never afterwards:
//!
//! ```text
//! Unconfigured ──configure()──▶ Configured ──get()──▶ Active (terminal)
//!        └────────────get()────────────┘                 │
//!                                                   shutdown()
//!                                                        ▼
//!                                                   Terminated
//! ```
//!
//! The native libraries are not known to survive double initialization, so
//! construction is guarded by a per-component lock with an explicit
//! re-check after acquisition: a relaxed read on the hot path, then the write
//! lock, then a second look at the state before building. The native exit
//! entry point runs in the component's `Drop`, at most once, and never if the
//! instance was never built.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::encoding::EncodingCode;
use crate::error::{NlpirError, Result};

/// Environment variable overriding the default native library directory.
pub const LIB_DIR_ENV: &str = "NLPIR_LIB_DIR";
/// Environment variable overriding the default data root.
pub const DATA_DIR_ENV: &str = "NLPIR_DATA_DIR";

/// Construction parameters for one component.
///
/// Owned by the component's [`ComponentCell`]; immutable once the instance
/// exists.
#[derive(Debug, Clone)]
pub struct ComponentConfig {
    /// Encoding used for every string crossing into this component.
    pub encoding: EncodingCode,
    /// Directory searched for the native library file. `None` means
    /// `$NLPIR_LIB_DIR`, falling back to `./lib`.
    pub lib_dir: Option<PathBuf>,
    /// Directory the native library reads its `Data` models/dictionaries
    /// from. `None` means `$NLPIR_DATA_DIR`, falling back to the working
    /// directory.
    pub data_dir: Option<PathBuf>,
    /// License code forwarded to the native init call. Empty for the
    /// evaluation license.
    pub license_code: String,
}

impl ComponentConfig {
    pub const fn new(encoding: EncodingCode) -> Self {
        Self {
            encoding,
            lib_dir: None,
            data_dir: None,
            license_code: String::new(),
        }
    }

    /// The library directory after applying defaults.
    pub fn resolved_lib_dir(&self) -> PathBuf {
        self.lib_dir.clone().unwrap_or_else(|| {
            env::var_os(LIB_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("lib"))
        })
    }

    /// The data root after applying defaults.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// The data root used when neither `configure` nor the environment names one.
pub fn default_data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// A wrapped native component with a process-wide instance.
pub trait Component: Sized + Send + Sync + 'static {
    /// Logical component name used in errors and logging.
    const NAME: &'static str;

    /// Encoding assumed when `configure` never ran.
    const DEFAULT_ENCODING: EncodingCode = EncodingCode::Utf8;

    /// Load the native library and run its init entry point.
    ///
    /// Called at most once per process, under the component's construction
    /// lock.
    fn boot(config: &ComponentConfig) -> Result<Self>;
}

enum State<T> {
    Configurable(ComponentConfig),
    Active(Arc<T>),
    Terminated,
}

/// Holder of one component's configuration and instance.
pub struct ComponentCell<T: Component> {
    state: RwLock<State<T>>,
}

impl<T: Component> ComponentCell<T> {
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(State::Configurable(ComponentConfig::new(
                T::DEFAULT_ENCODING,
            ))),
        }
    }

    /// Adjust construction parameters before the first access.
    ///
    /// Fails with [`NlpirError::AlreadyInitialized`] once the instance
    /// exists, regardless of whether the new values differ.
    pub fn configure(&self, apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        let mut state = self.state.write();
        match &mut *state {
            State::Configurable(config) => {
                apply(config);
                Ok(())
            }
            State::Active(_) | State::Terminated => {
                Err(NlpirError::AlreadyInitialized(T::NAME))
            }
        }
    }

    /// Return the component instance, building it on first call.
    pub fn get(&self) -> Result<Arc<T>> {
        // Fast path: already built.
        if let State::Active(instance) = &*self.state.read() {
            return Ok(Arc::clone(instance));
        }
        let mut state = self.state.write();
        // Re-check: another thread may have built the instance while we
        // waited for the lock.
        match &*state {
            State::Active(instance) => Ok(Arc::clone(instance)),
            State::Terminated => Err(NlpirError::ShutDown(T::NAME)),
            State::Configurable(config) => {
                log::debug!("constructing component '{}'", T::NAME);
                let instance = Arc::new(T::boot(config)?);
                *state = State::Active(Arc::clone(&instance));
                Ok(instance)
            }
        }
    }

    /// Tear the component down for the remainder of the process.
    ///
    /// Returns whether a live instance was released. The native exit entry
    /// point runs when the last outstanding reference drops; if the instance
    /// was never built, no native call is made and the cell stays
    /// configurable.
    pub fn shutdown(&self) -> bool {
        let mut state = self.state.write();
        match std::mem::replace(&mut *state, State::Terminated) {
            State::Active(instance) => {
                drop(instance);
                true
            }
            State::Configurable(config) => {
                *state = State::Configurable(config);
                false
            }
            State::Terminated => false,
        }
    }
}

impl<T: Component> Default for ComponentCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
