//! Property-based tests for richlet loading and path mapping

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
    time::Duration,
};

use canopy_engine::*;
use parking_lot::Mutex;
use proptest::prelude::*;

/// Route engine logs to the test harness output
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Counts constructions, inits and destroys across all instances
#[derive(Default)]
struct Counters {
    built: AtomicUsize,
    inits: AtomicUsize,
    destroyed: AtomicUsize,
}

struct Counted {
    counters: Arc<Counters>,
    init_delay: Duration,
}

impl Richlet for Counted {
    fn init(&self, _config: &RichletConfig) -> HandlerResult<()> {
        thread::sleep(self.init_delay);
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self) -> HandlerResult<()> {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counted(counters: &Arc<Counters>, init_delay: Duration) -> RichletSource {
    let counters = Arc::clone(counters);
    RichletSource::Factory(Arc::new(move || {
        counters.built.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Counted {
            counters: Arc::clone(&counters),
            init_delay,
        }) as Arc<dyn Richlet>)
    }))
}

/// Signals when its init starts, then blocks until released
struct Gated {
    started: Mutex<mpsc::Sender<()>>,
    release: Arc<Mutex<mpsc::Receiver<()>>>,
    fail: bool,
}

impl Richlet for Gated {
    fn init(&self, _config: &RichletConfig) -> HandlerResult<()> {
        let _ = self.started.lock().send(());
        self.release.lock().recv().map_err(|e| e.to_string())?;
        if self.fail {
            return Err("boom".into());
        }
        Ok(())
    }
}

/// Source whose first instance blocks in init; later instances do not
fn gated(fail: bool) -> (RichletSource, mpsc::Receiver<()>, mpsc::Sender<()>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let release = Arc::new(Mutex::new(release_rx));
    let built = AtomicUsize::new(0);
    let started_tx = Mutex::new(started_tx);
    let source = RichletSource::Factory(Arc::new(move || {
        let first = built.fetch_add(1, Ordering::SeqCst) == 0;
        let release = if first {
            Arc::clone(&release)
        } else {
            // Already released; later loads pass straight through
            let (tx, rx) = mpsc::channel();
            let _ = tx.send(());
            Arc::new(Mutex::new(rx))
        };
        Ok(Arc::new(Gated {
            started: Mutex::new(started_tx.lock().clone()),
            release,
            fail,
        }) as Arc<dyn Richlet>)
    }));
    (source, started_rx, release_tx)
}

#[test]
fn test_concurrent_resolvers_share_one_load() {
    let config = Arc::new(Configuration::new());
    let counters = Arc::new(Counters::default());
    config
        .add_richlet("main", counted(&counters, Duration::from_millis(50)), BTreeMap::new())
        .unwrap();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let config = Arc::clone(&config);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                config.richlet("main").ok()
            })
        })
        .collect();
    let loaded: Vec<Arc<dyn Richlet>> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(counters.built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    for richlet in &loaded {
        assert!(Arc::ptr_eq(richlet, &loaded[0]));
    }
}

/// Fails the first init, succeeds afterwards
struct Flaky {
    attempt: usize,
}

impl Richlet for Flaky {
    fn init(&self, _config: &RichletConfig) -> HandlerResult<()> {
        if self.attempt == 0 {
            return Err("not ready".into());
        }
        Ok(())
    }
}

#[test]
fn test_failed_load_is_retried() {
    let config = Configuration::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let source = RichletSource::Factory(Arc::new(move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Flaky { attempt }) as Arc<dyn Richlet>)
    }));
    config.add_richlet("flaky", source, BTreeMap::new()).unwrap();

    match config.richlet("flaky").err().unwrap() {
        EngineError::RichletLoad { name, reason } => {
            assert_eq!(name, "flaky");
            assert!(reason.contains("not ready"));
        }
        other => panic!("expected load error, got {:?}", other),
    }
    assert!(config.richlet("flaky").is_ok());
    assert!(config.richlet("flaky").is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_slow_load_is_reported_as_suspected_deadlock() {
    init_tracing();
    let config = Arc::new(Configuration::new());
    config.update_settings(|s| s.richlet_load_timeout_secs = 0);
    let (source, started, release) = gated(false);
    config.add_richlet("slow", source, BTreeMap::new()).unwrap();

    let loader = {
        let config = Arc::clone(&config);
        thread::spawn(move || config.richlet("slow").is_ok())
    };
    started.recv().unwrap();

    match config.richlet("slow").err().unwrap() {
        EngineError::DeadlockSuspected { name, waited } => {
            assert_eq!(name, "slow");
            assert_eq!(waited, Duration::ZERO);
        }
        other => panic!("expected deadlock suspicion, got {:?}", other),
    }

    release.send(()).unwrap();
    assert!(loader.join().unwrap());
    assert!(config.richlet("slow").is_ok());
}

#[test]
fn test_waiters_receive_load_error() {
    init_tracing();
    let config = Arc::new(Configuration::new());
    let (source, started, release) = gated(true);
    config.add_richlet("broken", source, BTreeMap::new()).unwrap();

    let spawn = |config: &Arc<Configuration>| {
        let config = Arc::clone(config);
        thread::spawn(move || config.richlet("broken").err())
    };
    let loader = spawn(&config);
    started.recv().unwrap();
    let waiter = spawn(&config);
    thread::sleep(Duration::from_millis(100));
    release.send(()).unwrap();

    for handle in [loader, waiter] {
        match handle.join().unwrap() {
            Some(EngineError::RichletLoad { reason, .. }) => assert!(reason.contains("boom")),
            other => panic!("expected load error, got {:?}", other),
        }
    }
}

#[test]
fn test_huge_timeout_waits_for_the_load() {
    init_tracing();
    let config = Arc::new(Configuration::new());
    config.update_settings(|s| s.richlet_load_timeout_secs = u64::MAX);
    let (source, started, release) = gated(false);
    config.add_richlet("slow", source, BTreeMap::new()).unwrap();

    let spawn = |config: &Arc<Configuration>| {
        let config = Arc::clone(config);
        thread::spawn(move || config.richlet("slow").ok())
    };
    let loader = spawn(&config);
    started.recv().unwrap();
    let waiter = spawn(&config);
    thread::sleep(Duration::from_millis(100));
    release.send(()).unwrap();

    let loaded = loader.join().unwrap().unwrap();
    let waited = waiter.join().unwrap().unwrap();
    assert!(Arc::ptr_eq(&loaded, &waited));
}

#[test]
fn test_redefinition_destroys_loaded_instance() {
    let config = Configuration::new();
    let counters = Arc::new(Counters::default());
    config
        .add_richlet("main", counted(&counters, Duration::ZERO), BTreeMap::new())
        .unwrap();
    let first = config.richlet("main").unwrap();

    let previous = config
        .add_richlet("main", counted(&counters, Duration::ZERO), BTreeMap::new())
        .unwrap();
    assert!(previous.is_some());
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

    let second = config.richlet("main").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(counters.built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_shutdown_destroys_every_loaded_richlet() {
    let config = Configuration::new();
    let counters = Arc::new(Counters::default());
    for name in ["a", "b", "c"] {
        config
            .add_richlet(name, counted(&counters, Duration::ZERO), BTreeMap::new())
            .unwrap();
    }
    config.richlet("a").unwrap();
    config.richlet("b").unwrap();

    let app = WebApp::bind("demo", config).unwrap();
    app.shutdown();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
}

#[derive(Default)]
struct Echo;

impl Richlet for Echo {}

#[test]
fn test_init_receives_params_and_app_name() {
    let config = Configuration::new();
    let seen: Arc<Mutex<Option<RichletConfig>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let source = RichletSource::Factory(Arc::new(move || {
        let sink = Arc::clone(&sink);
        Ok(Arc::new(Recorded(sink)) as Arc<dyn Richlet>)
    }));
    let params = BTreeMap::from([("greeting".to_string(), "hi".to_string())]);
    config.add_richlet("echo", source, params).unwrap();
    let app = WebApp::bind("demo", config).unwrap();

    app.configuration().richlet("echo").unwrap();
    let seen = seen.lock().clone().unwrap();
    assert_eq!(seen.name, "echo");
    assert_eq!(seen.app_name.as_deref(), Some("demo"));
    assert_eq!(seen.param("greeting"), Some("hi"));
}

/// Copies its init config into a shared slot
struct Recorded(Arc<Mutex<Option<RichletConfig>>>);

impl Richlet for Recorded {
    fn init(&self, config: &RichletConfig) -> HandlerResult<()> {
        *self.0.lock() = Some(config.clone());
        Ok(())
    }
}

#[test]
fn test_named_class_resolves_through_catalog() {
    let mut catalog = TypeCatalog::new();
    catalog.add_richlet::<Echo>("demo.Echo");
    let config = Configuration::new();
    config
        .add_richlet("echo", RichletSource::named("demo.Echo"), BTreeMap::new())
        .unwrap();

    assert!(matches!(
        config.richlet("echo").err().unwrap(),
        EngineError::RichletLoad { .. }
    ));
    config.set_catalog(Arc::new(catalog));
    assert!(config.richlet("echo").is_ok());
}

#[test]
fn test_path_lookup_prefers_longest_mapping() {
    let config = Configuration::new();
    let counters = Arc::new(Counters::default());
    for name in ["app", "admin"] {
        config
            .add_richlet(name, counted(&counters, Duration::ZERO), BTreeMap::new())
            .unwrap();
    }
    config.add_richlet_mapping("app", "/app/*").unwrap();
    config.add_richlet_mapping("admin", "/app/admin").unwrap();

    let admin = config.richlet("admin").unwrap();
    let app = config.richlet("app").unwrap();
    let hit = |path: &str| config.richlet_by_path(path).unwrap();

    assert!(Arc::ptr_eq(&hit("/app/admin").unwrap(), &admin));
    assert!(Arc::ptr_eq(&hit("/app/admin/users").unwrap(), &app));
    assert!(Arc::ptr_eq(&hit("/app").unwrap(), &app));
    assert!(hit("/other").is_none());
}

#[test]
fn test_mapping_to_undefined_richlet_is_rejected() {
    let config = Configuration::new();
    let err = config.add_richlet_mapping("ghost", "/ghost/*").unwrap_err();
    assert!(matches!(err, EngineError::RichletNotDefined(_)));
}

proptest! {
    /// Resolving any number of times builds the richlet once.
    #[test]
    fn prop_resolve_builds_once(calls in 1usize..20) {
        let config = Configuration::new();
        let counters = Arc::new(Counters::default());
        config.add_richlet("main", counted(&counters, Duration::ZERO), BTreeMap::new()).unwrap();

        for _ in 0..calls {
            prop_assert!(config.richlet("main").is_ok());
        }
        prop_assert_eq!(counters.built.load(Ordering::SeqCst), 1);
    }

    /// Paths under a wildcard mapping resolve to it; others find nothing.
    #[test]
    fn prop_wildcard_covers_subtree(
        segments in prop::collection::vec("[a-z]{1,5}", 0..4),
        other in "[A-Z]{1,5}",
    ) {
        let config = Configuration::new();
        let counters = Arc::new(Counters::default());
        config.add_richlet("app", counted(&counters, Duration::ZERO), BTreeMap::new()).unwrap();
        config.add_richlet_mapping("app", "/app/*").unwrap();

        let mut path = "/app".to_string();
        for segment in &segments {
            path.push('/');
            path.push_str(segment);
        }
        prop_assert!(config.richlet_by_path(&path).unwrap().is_some());
        let outside = format!("/{}", other);
        prop_assert!(config.richlet_by_path(&outside).unwrap().is_none());
    }
}
