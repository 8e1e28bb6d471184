//! Component lifecycle from the public API: one instance per process,
//! configuration locked after first access, terminal shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nlpir::native::{Component, ComponentCell, ComponentConfig};
use nlpir::{EncodingCode, NlpirError};

struct Probe {
    encoding: EncodingCode,
    license: String,
}

static BOOTS: AtomicUsize = AtomicUsize::new(0);

impl Component for Probe {
    const NAME: &'static str = "probe";
    const DEFAULT_ENCODING: EncodingCode = EncodingCode::Gbk;

    fn boot(config: &ComponentConfig) -> nlpir::Result<Self> {
        BOOTS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(5));
        Ok(Self {
            encoding: config.encoding,
            license: config.license_code.clone(),
        })
    }
}

static CELL: ComponentCell<Probe> = ComponentCell::new();

#[test]
fn configure_once_then_shared_instance_for_the_process() {
    CELL.configure(|config| config.license_code = "team-license".into())
        .unwrap();

    // Many threads race the first access; exactly one boot happens.
    let instances: Vec<Arc<Probe>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| CELL.get().unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(BOOTS.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }

    // The configured values reached the boot, defaults filled the rest.
    assert_eq!(instances[0].license, "team-license");
    assert_eq!(instances[0].encoding, EncodingCode::Gbk);

    // Configuration is locked now, even with identical values.
    let err = CELL
        .configure(|config| config.license_code = "team-license".into())
        .unwrap_err();
    assert!(matches!(err, NlpirError::AlreadyInitialized("probe")));

    // Teardown is terminal.
    assert!(CELL.shutdown());
    assert!(matches!(CELL.get(), Err(NlpirError::ShutDown("probe"))));
    assert!(!CELL.shutdown());
}
