//! Binding-core tests: naming table, lifecycle state machine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::resolver::{library_file_name, Platform};
use super::singleton::{Component, ComponentCell, ComponentConfig};
use crate::encoding::EncodingCode;
use crate::error::{NlpirError, Result};

#[test]
fn naming_table_is_deterministic() {
    assert_eq!(
        library_file_name("NLPIR", Platform::Windows, true),
        "NLPIR64.dll"
    );
    assert_eq!(
        library_file_name("NLPIR", Platform::Windows, false),
        "NLPIR32.dll"
    );
    assert_eq!(
        library_file_name("NLPIR", Platform::Linux, true),
        "libNLPIR64.so"
    );
    assert_eq!(
        library_file_name("NLPIR", Platform::Linux, false),
        "libNLPIR32.so"
    );
    assert_eq!(
        library_file_name("KeyScanAPI", Platform::MacOs, true),
        "libKeyScanAPIdarwin.so"
    );
    assert_eq!(
        library_file_name("KeyScanAPI", Platform::MacOs, false),
        "libKeyScanAPIdarwin.so"
    );
}

#[test]
fn platform_identifiers() {
    assert_eq!(Platform::from_identifier("win32").unwrap(), Platform::Windows);
    assert_eq!(Platform::from_identifier("windows").unwrap(), Platform::Windows);
    assert_eq!(Platform::from_identifier("linux2").unwrap(), Platform::Linux);
    assert_eq!(Platform::from_identifier("darwin").unwrap(), Platform::MacOs);
}

#[test]
fn unsupported_platform_fails_immediately() {
    let err = Platform::from_identifier("freebsd").unwrap_err();
    match err {
        NlpirError::UnsupportedPlatform(id) => assert_eq!(id, "freebsd"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_library_error_names_platform_and_path() {
    let err = super::resolver::resolve("NoSuchLib", Path::new("/definitely/not/here"))
        .unwrap_err();
    match err {
        NlpirError::LibraryNotFound { name, path, .. } => {
            assert_eq!(name, "NoSuchLib");
            assert!(path.starts_with("/definitely/not/here"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// Lifecycle tests run against a stub component so no native code is needed.

static BOOT_COUNT: AtomicUsize = AtomicUsize::new(0);

struct StubComponent {
    config: ComponentConfig,
}

impl Component for StubComponent {
    const NAME: &'static str = "stub";
    const DEFAULT_ENCODING: EncodingCode = EncodingCode::Gbk;

    fn boot(config: &ComponentConfig) -> Result<Self> {
        BOOT_COUNT.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            config: config.clone(),
        })
    }
}

#[test]
fn access_is_idempotent_and_configure_locks() {
    static CELL: ComponentCell<StubComponent> = ComponentCell::new();

    CELL.configure(|config| {
        config.data_dir = Some(PathBuf::from("/tmp/stub-data"));
        config.license_code = "abc".into();
    })
    .unwrap();

    let first = CELL.get().unwrap();
    let second = CELL.get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(BOOT_COUNT.load(Ordering::SeqCst), 1);
    assert_eq!(first.config.encoding, EncodingCode::Gbk);
    assert_eq!(
        first.config.data_dir.as_deref(),
        Some(Path::new("/tmp/stub-data"))
    );
    assert_eq!(first.config.license_code, "abc");

    // Reconfiguration after construction fails, even with identical values.
    let err = CELL
        .configure(|config| config.license_code = "abc".into())
        .unwrap_err();
    assert!(matches!(err, NlpirError::AlreadyInitialized("stub")));
}

#[test]
fn construction_races_build_exactly_once() {
    struct Racer;
    static RACER_BOOTS: AtomicUsize = AtomicUsize::new(0);
    impl Component for Racer {
        const NAME: &'static str = "racer";
        fn boot(_: &ComponentConfig) -> Result<Self> {
            RACER_BOOTS.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(Racer)
        }
    }
    static CELL: ComponentCell<Racer> = ComponentCell::new();

    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| CELL.get().map(|_| ())))
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(RACER_BOOTS.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_semantics() {
    #[derive(Debug)]
    struct Ephemeral;
    impl Component for Ephemeral {
        const NAME: &'static str = "ephemeral";
        fn boot(_: &ComponentConfig) -> Result<Self> {
            Ok(Ephemeral)
        }
    }
    static CELL: ComponentCell<Ephemeral> = ComponentCell::new();

    // Shutdown before construction releases nothing and keeps the cell
    // configurable.
    assert!(!CELL.shutdown());
    CELL.configure(|config| config.encoding = EncodingCode::Utf8)
        .unwrap();

    let instance = CELL.get().unwrap();
    assert!(CELL.shutdown());
    drop(instance);

    // Active is terminal: no reconstruction after teardown.
    assert!(matches!(
        CELL.get().unwrap_err(),
        NlpirError::ShutDown("ephemeral")
    ));
    assert!(!CELL.shutdown());
}

#[test]
fn failed_boot_leaves_cell_configurable() {
    struct Flaky;
    static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
    impl Component for Flaky {
        const NAME: &'static str = "flaky";
        fn boot(_: &ComponentConfig) -> Result<Self> {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(NlpirError::InitFailed {
                    component: Self::NAME,
                    detail: "transient".into(),
                })
            } else {
                Ok(Flaky)
            }
        }
    }
    static CELL: ComponentCell<Flaky> = ComponentCell::new();

    assert!(CELL.get().is_err());
    // The failure did not consume the configuration; a caller may retry.
    assert!(CELL.get().is_ok());
    assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
}
