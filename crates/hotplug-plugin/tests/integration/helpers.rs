//! Shared test helpers for integration tests.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use hotplug_core::{Client, ClientHandle, Message};
use hotplug_plugin::bus::{EventHandler, HandlerResult, LocalBus, Subscription};
use hotplug_plugin::contract::{ConstructContext, Plugin, PluginClass};
use hotplug_plugin::discovery::{STATIC_ENTRY_FILE, StaticLoader, UnitLoader};
use hotplug_plugin::error::PluginError;
use hotplug_plugin::manager::{ManagerOptions, PluginManager};

/// Marker file that makes a test plugin report itself disabled.
pub const SELF_DISABLED_MARKER: &str = "disabled";

/// File a test plugin reads its greeting from at construction.
pub const GREETING_FILE: &str = "greeting.txt";

/// Hook invocations observed for one plugin directory.
#[derive(Debug, Default)]
pub struct Counters {
    pub constructed: AtomicUsize,
    pub enabled: AtomicUsize,
    pub initialized: AtomicUsize,
    pub disabled: AtomicUsize,
    pub handled: AtomicUsize,
    pub greeting: Mutex<String>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl Counters {
    pub fn enabled(&self) -> usize {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn disabled(&self) -> usize {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn greeting(&self) -> String {
        self.greeting.lock().expect("lock").clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, call: &'static str, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().expect("lock").push(call);
    }
}

/// Counters keyed by plugin directory, so parallel tests never share them.
pub fn counters_for(dir: &Path) -> Arc<Counters> {
    static COUNTERS: OnceLock<Mutex<HashMap<PathBuf, Arc<Counters>>>> = OnceLock::new();
    let mut map = COUNTERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .expect("lock");
    map.entry(dir.to_path_buf()).or_default().clone()
}

#[derive(Debug)]
struct Count(Arc<Counters>);

#[async_trait]
impl EventHandler for Count {
    async fn handle(&self, _client: &ClientHandle, message: &Message) -> HandlerResult {
        self.0.handled.fetch_add(1, Ordering::SeqCst);
        HandlerResult::continue_with_output(serde_json::json!({
            "echo": message.content(),
        }))
    }
}

macro_rules! counting_plugin {
    ($name:ident, $delay:expr) => {
        counting_plugin!($name, $delay, None);
    };
    ($name:ident, $delay:expr, $stop_delay:expr) => {
        #[derive(Debug)]
        pub struct $name {
            counters: Arc<Counters>,
            enable: bool,
        }

        #[async_trait]
        impl Plugin for $name {
            fn enabled(&self) -> bool {
                self.enable
            }

            fn subscriptions(&self) -> Vec<Subscription> {
                vec![Subscription::new(
                    "text",
                    Arc::new(Count(self.counters.clone())),
                )]
            }

            async fn on_enable(&self, _client: Option<ClientHandle>) -> Result<(), PluginError> {
                let delay: Option<Duration> = $delay;
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.counters.record("on_enable", &self.counters.enabled);
                Ok(())
            }

            async fn on_disable(&self) -> Result<(), PluginError> {
                let delay: Option<Duration> = $stop_delay;
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.counters.record("on_disable", &self.counters.disabled);
                Ok(())
            }

            async fn async_init(&self) -> Result<(), PluginError> {
                self.counters.record("async_init", &self.counters.initialized);
                Ok(())
            }
        }

        impl PluginClass for $name {
            const ID: &'static str = stringify!($name);
            const DESCRIPTION: &'static str = concat!(stringify!($name), " test plugin");
            const AUTHOR: &'static str = "tests";

            fn construct(ctx: &ConstructContext) -> Result<Self, PluginError> {
                let dir = ctx.directory.clone().unwrap_or_default();
                let counters = counters_for(&dir);
                counters.constructed.fetch_add(1, Ordering::SeqCst);

                if let Ok(greeting) = std::fs::read_to_string(dir.join(GREETING_FILE)) {
                    *counters.greeting.lock().expect("lock") = greeting.trim().to_string();
                }

                Ok(Self {
                    enable: !dir.join(SELF_DISABLED_MARKER).exists(),
                    counters,
                })
            }
        }
    };
}

counting_plugin!(Echo, None);
counting_plugin!(Dice, None);
counting_plugin!(ManagePlugin, None);
counting_plugin!(Slow, Some(Duration::from_millis(300)));
counting_plugin!(SlowStop, None, Some(Duration::from_millis(300)));

/// A plugin whose constructor always fails.
#[derive(Debug)]
pub struct Broken;

#[async_trait]
impl Plugin for Broken {
    fn enabled(&self) -> bool {
        true
    }

    async fn on_enable(&self, _client: Option<ClientHandle>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_disable(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

impl PluginClass for Broken {
    const ID: &'static str = "Broken";

    fn construct(_ctx: &ConstructContext) -> Result<Self, PluginError> {
        Err(PluginError::new("missing api key"))
    }
}

/// Transport stand-in.
#[derive(Debug)]
pub struct TestClient;

impl Client for TestClient {
    fn id(&self) -> &str {
        "test-client"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Catalog of every test unit, keyed by directory name.
pub fn loader() -> Arc<dyn UnitLoader> {
    Arc::new(
        StaticLoader::new()
            .with_unit("echo", |r| {
                r.register::<Echo>();
                Ok(())
            })
            .with_unit("dice", |r| {
                r.register::<Dice>();
                Ok(())
            })
            .with_unit("manage", |r| {
                r.register::<ManagePlugin>();
                Ok(())
            })
            .with_unit("slow", |r| {
                r.register::<Slow>();
                Ok(())
            })
            .with_unit("slowstop", |r| {
                r.register::<SlowStop>();
                Ok(())
            })
            .with_unit("broken", |r| {
                r.register::<Broken>();
                Ok(())
            }),
    )
}

/// A manager over a temporary plugin root.
pub struct TestHost {
    /// Keeps the root alive.
    _temp: TempDir,
    /// Plugin root.
    pub root: PathBuf,
    /// Manager under test.
    pub manager: PluginManager,
    /// The bus the manager binds into.
    pub bus: Arc<LocalBus>,
}

impl TestHost {
    /// Host with the given unit directories and no exclusions.
    pub fn new(units: &[&str]) -> Self {
        Self::with_exclusions(units, &[])
    }

    /// Host with the given unit directories and exclusion set.
    pub fn with_exclusions(units: &[&str], disabled: &[&str]) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("plugins");
        std::fs::create_dir_all(&root).expect("create root");

        for unit in units {
            add_unit(&root, unit);
        }

        let options = ManagerOptions {
            roots: vec![root.clone()],
            disabled: disabled.iter().map(|s| s.to_string()).collect(),
            always_on: "ManagePlugin".to_string(),
            auto_create: true,
        };
        let bus = Arc::new(LocalBus::new(Duration::from_secs(1)));
        let manager = PluginManager::new(options, vec![loader()], bus.clone());

        Self {
            _temp: temp,
            root,
            manager,
            bus,
        }
    }

    /// Counters of a unit directory.
    pub fn counters(&self, unit: &str) -> Arc<Counters> {
        counters_for(&self.root.join(unit))
    }

    /// Makes the plugin in `unit` report itself disabled.
    pub fn disable_self(&self, unit: &str) {
        std::fs::write(self.root.join(unit).join(SELF_DISABLED_MARKER), "").expect("marker");
    }

    /// Writes the greeting a unit's plugin picks up at construction.
    pub fn set_greeting(&self, unit: &str, greeting: &str) {
        std::fs::write(self.root.join(unit).join(GREETING_FILE), greeting).expect("greeting");
    }

    /// Removes a unit's entry file, making it undiscoverable.
    pub fn remove_entry(&self, unit: &str) {
        std::fs::remove_file(self.root.join(unit).join(STATIC_ENTRY_FILE)).expect("remove entry");
    }
}

/// Creates a unit directory with the static entry file.
pub fn add_unit(root: &Path, unit: &str) {
    let dir = root.join(unit);
    std::fs::create_dir_all(&dir).expect("create unit");
    std::fs::write(dir.join(STATIC_ENTRY_FILE), "").expect("write entry");
}

/// A client handle for routing.
pub fn client() -> ClientHandle {
    Arc::new(TestClient)
}
