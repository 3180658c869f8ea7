//! Connection Tests
//!
//! Tests verify:
//! - get/put/delete/exists and their absent outcomes
//! - The per-connection status after every call
//! - keys()/values() ordering, and their bound by the statistics snapshot
//! - Engine faults surface with the engine's code and message
//! - Stores opened inside an environment
//! - Store before environment on close, every cursor before any connection on teardown

use std::path::Path;
use std::sync::{Arc, Mutex};

use handlekv::status;
use handlekv::storage::{
    DiskEngine, Engine, EngineCursor, EngineFault, EngineResult, Environment, Store, StoreStat,
};
use handlekv::{Config, KvError, Record, Registry, Removal};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Registry, u32) {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::new(Config::default()).unwrap();
    let id = registry.open(dir.path().join("test.db"), None).unwrap();
    (dir, registry, id)
}

/// Engine whose stores can misreport counts or refuse writes
struct Tweaked {
    inner: DiskEngine,
    reported_count: Option<u64>,
    fail_puts: bool,
}

struct TweakedStore {
    inner: Box<dyn Store>,
    reported_count: Option<u64>,
    fail_puts: bool,
}

impl Engine for Tweaked {
    fn name(&self) -> &'static str {
        "tweaked"
    }

    fn open_environment(&self, home: &Path) -> EngineResult<Box<dyn Environment>> {
        self.inner.open_environment(home)
    }

    fn open_store(&self, path: &Path, env: Option<&dyn Environment>) -> EngineResult<Box<dyn Store>> {
        Ok(Box::new(TweakedStore {
            inner: self.inner.open_store(path, env)?,
            reported_count: self.reported_count,
            fail_puts: self.fail_puts,
        }))
    }
}

impl Store for TweakedStore {
    fn get(&self, record: &mut Record) -> EngineResult<bool> {
        self.inner.get(record)
    }

    fn put(&mut self, record: &Record) -> EngineResult<()> {
        if self.fail_puts {
            return Err(EngineFault::new(28, "No space left on device"));
        }
        self.inner.put(record)
    }

    fn delete(&mut self, record: &Record) -> EngineResult<bool> {
        self.inner.delete(record)
    }

    fn exists(&self, record: &Record) -> EngineResult<bool> {
        self.inner.exists(record)
    }

    fn stat(&self) -> EngineResult<StoreStat> {
        let mut stat = self.inner.stat()?;
        if let Some(count) = self.reported_count {
            stat.key_count = count;
            stat.record_count = count;
        }
        Ok(stat)
    }

    fn compact(&mut self) -> EngineResult<()> {
        self.inner.compact()
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.inner.sync()
    }

    fn cursor(&self) -> EngineResult<Box<dyn EngineCursor>> {
        self.inner.cursor()
    }

    fn close(&mut self) -> EngineResult<()> {
        self.inner.close()
    }
}

fn tweaked(reported_count: Option<u64>, fail_puts: bool) -> (TempDir, Registry, u32) {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    let engine = Tweaked {
        inner: DiskEngine::new(config.clone()),
        reported_count,
        fail_puts,
    };
    let mut registry = Registry::with_engine(config, engine).unwrap();
    let id = registry.open(dir.path().join("tweaked.db"), None).unwrap();
    (dir, registry, id)
}

fn fill(registry: &mut Registry, id: u32, keys: &[&str]) {
    let connection = registry.get(id).unwrap();
    for key in keys {
        connection.put(*key, &key.to_uppercase()).unwrap();
    }
}

// =============================================================================
// Point operations
// =============================================================================

#[test]
fn test_delete_then_lookups() {
    let (_dir, mut registry, id) = setup();
    fill(&mut registry, id, &["a", "b", "c"]);
    let connection = registry.get(id).unwrap();

    assert_eq!(connection.delete("b").unwrap(), Removal::Removed);

    assert!(!connection.exists("b").unwrap());
    assert!(connection.last_status().is_ok());

    let value: Option<String> = connection.get("b").unwrap();
    assert_eq!(value, None);
    assert!(connection.last_status().is_not_found());
    assert!(connection.last_status().is_ok());

    assert_eq!(connection.stat().unwrap().key_count, 2);
    assert_eq!(connection.last_status().code(), status::OK);
}

#[test]
fn test_delete_absent_key_is_reported() {
    let (_dir, mut registry, id) = setup();
    let connection = registry.get(id).unwrap();

    assert_eq!(connection.delete("ghost").unwrap(), Removal::Absent);
    assert_eq!(connection.last_status().code(), status::NOT_FOUND);
}

#[test]
fn test_put_overwrites() {
    let (_dir, mut registry, id) = setup();
    let connection = registry.get(id).unwrap();

    connection.put("k", &1u32).unwrap();
    connection.put("k", &2u32).unwrap();

    assert_eq!(connection.get::<str, u32>("k").unwrap(), Some(2));
    assert_eq!(connection.stat().unwrap().record_count, 1);
}

#[test]
fn test_structured_values() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        sku: String,
        quantity: u16,
        notes: Option<String>,
    }

    let (_dir, mut registry, id) = setup();
    let connection = registry.get(id).unwrap();
    let order = Order {
        sku: "X-1".to_string(),
        quantity: 3,
        notes: None,
    };

    connection.put(&("orders", 17u32), &order).unwrap();
    let loaded: Option<Order> = connection.get(&("orders", 17u32)).unwrap();
    assert_eq!(loaded, Some(order));
}

#[test]
fn test_wrong_value_type_is_codec_error() {
    let (_dir, mut registry, id) = setup();
    let connection = registry.get(id).unwrap();
    connection.put("k", &7u8).unwrap();

    let result = connection.get::<str, String>("k");
    assert!(matches!(result, Err(KvError::Codec(_))));
}

// =============================================================================
// Enumeration
// =============================================================================

#[test]
fn test_keys_and_values_in_key_order() {
    let (_dir, mut registry, id) = setup();
    fill(&mut registry, id, &["m", "c", "x", "a"]);
    let connection = registry.get(id).unwrap();

    assert_eq!(connection.keys::<String>().unwrap(), vec!["a", "c", "m", "x"]);
    assert_eq!(connection.values::<String>().unwrap(), vec!["A", "C", "M", "X"]);
    assert_eq!(connection.last_status().code(), status::OK);
}

#[test]
fn test_keys_of_empty_store() {
    let (_dir, mut registry, id) = setup();
    assert!(registry.get(id).unwrap().keys::<String>().unwrap().is_empty());
}

#[test]
fn test_keys_bounded_by_stale_count() {
    let (_dir, mut registry, id) = tweaked(Some(3), false);
    fill(&mut registry, id, &["a", "b", "c", "d", "e"]);
    let connection = registry.get(id).unwrap();

    assert_eq!(connection.keys::<String>().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(connection.values::<String>().unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn test_overstated_count_stops_at_exhaustion() {
    let (_dir, mut registry, id) = tweaked(Some(10), false);
    fill(&mut registry, id, &["a", "b", "c", "d", "e"]);

    assert_eq!(registry.get(id).unwrap().keys::<String>().unwrap().len(), 5);
}

#[test]
fn test_huge_count_does_not_preallocate() {
    let (_dir, mut registry, id) = tweaked(Some(u64::MAX), false);
    fill(&mut registry, id, &["a"]);

    assert_eq!(registry.get(id).unwrap().keys::<String>().unwrap(), vec!["a"]);
}

// =============================================================================
// Faults and status
// =============================================================================

#[test]
fn test_engine_fault_surfaces_code_and_message() {
    let (_dir, mut registry, id) = tweaked(None, true);
    let connection = registry.get(id).unwrap();

    match connection.put("k", "v") {
        Err(KvError::Store { code, message }) => {
            assert_eq!(code, 28);
            assert_eq!(message, "No space left on device");
        }
        other => panic!("expected store fault, got {:?}", other),
    }
    assert!(!connection.last_status().is_ok());
    assert_eq!(connection.last_status().code(), 28);
    assert_eq!(connection.last_status().message(), "No space left on device");

    // The next successful call replaces the status
    assert!(!connection.exists("k").unwrap());
    assert!(connection.last_status().is_ok());
}

#[test]
fn test_undecodable_value_sets_fault_status() {
    let (_dir, mut registry, id) = setup();
    let connection = registry.get(id).unwrap();
    connection.put("k", "a string, not a number").unwrap();
    assert!(connection.last_status().is_ok());

    assert!(matches!(connection.get::<str, u32>("k"), Err(KvError::Codec(_))));
    assert!(!connection.last_status().is_ok());
    assert_eq!(connection.last_status().code(), status::UNDECODABLE);

    assert!(matches!(connection.keys::<u32>(), Err(KvError::Codec(_))));
    assert_eq!(connection.last_status().code(), status::UNDECODABLE);

    let value: Option<String> = connection.get("k").unwrap();
    assert_eq!(value.as_deref(), Some("a string, not a number"));
    assert!(connection.last_status().is_ok());
}

// =============================================================================
// Whole-store operations
// =============================================================================

#[test]
fn test_sync_makes_writes_visible_to_another_open() {
    let (dir, mut registry, id) = setup();
    registry.get(id).unwrap().put("k", "v").unwrap();
    registry.get(id).unwrap().sync().unwrap();

    let other = registry.open(dir.path().join("test.db"), None).unwrap();
    let value: Option<String> = registry.get(other).unwrap().get("k").unwrap();
    assert_eq!(value.as_deref(), Some("v"));
}

#[test]
fn test_compact_keeps_records() {
    let (_dir, mut registry, id) = setup();
    fill(&mut registry, id, &["a", "b"]);
    let connection = registry.get(id).unwrap();
    connection.delete("a").unwrap();

    connection.compact().unwrap();
    assert_eq!(connection.keys::<String>().unwrap(), vec!["b"]);
}

#[test]
fn test_environment_connection() {
    let dir = TempDir::new().unwrap();
    let home = dir.path().join("home");
    let mut registry = Registry::new(Config::default()).unwrap();

    let id = registry.open("env.db", Some(home.as_path())).unwrap();
    let connection = registry.connection(id).unwrap();
    assert!(connection.has_environment());
    assert_eq!(connection.env_dir(), Some(home.as_path()));
    assert_eq!(connection.path(), Path::new("env.db"));

    registry.get(id).unwrap().put("k", "v").unwrap();
    registry.close(id).unwrap();
    assert!(home.join("env.db").exists());

    let id = registry.open("env.db", Some(home.as_path())).unwrap();
    let value: Option<String> = registry.get(id).unwrap().get("k").unwrap();
    assert_eq!(value.as_deref(), Some("v"));
}

// =============================================================================
// Release order
// =============================================================================

type Events = Arc<Mutex<Vec<String>>>;

/// Engine that logs every close of a store, environment or cursor
struct Recording {
    inner: DiskEngine,
    events: Events,
}

struct RecordingEnv {
    inner: Box<dyn Environment>,
    events: Events,
}

struct RecordingStore {
    inner: Box<dyn Store>,
    name: String,
    events: Events,
}

struct RecordingCursor {
    inner: Box<dyn EngineCursor>,
    events: Events,
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl Engine for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn open_environment(&self, home: &Path) -> EngineResult<Box<dyn Environment>> {
        Ok(Box::new(RecordingEnv {
            inner: self.inner.open_environment(home)?,
            events: self.events.clone(),
        }))
    }

    fn open_store(&self, path: &Path, env: Option<&dyn Environment>) -> EngineResult<Box<dyn Store>> {
        Ok(Box::new(RecordingStore {
            inner: self.inner.open_store(path, env)?,
            name: file_name(path),
            events: self.events.clone(),
        }))
    }
}

impl Environment for RecordingEnv {
    fn home(&self) -> &Path {
        self.inner.home()
    }

    fn close(&mut self) -> EngineResult<()> {
        let name = file_name(self.inner.home());
        self.events.lock().unwrap().push(format!("env {}", name));
        self.inner.close()
    }
}

impl Store for RecordingStore {
    fn get(&self, record: &mut Record) -> EngineResult<bool> {
        self.inner.get(record)
    }

    fn put(&mut self, record: &Record) -> EngineResult<()> {
        self.inner.put(record)
    }

    fn delete(&mut self, record: &Record) -> EngineResult<bool> {
        self.inner.delete(record)
    }

    fn exists(&self, record: &Record) -> EngineResult<bool> {
        self.inner.exists(record)
    }

    fn stat(&self) -> EngineResult<StoreStat> {
        self.inner.stat()
    }

    fn compact(&mut self) -> EngineResult<()> {
        self.inner.compact()
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.inner.sync()
    }

    fn cursor(&self) -> EngineResult<Box<dyn EngineCursor>> {
        Ok(Box::new(RecordingCursor {
            inner: self.inner.cursor()?,
            events: self.events.clone(),
        }))
    }

    fn close(&mut self) -> EngineResult<()> {
        self.events.lock().unwrap().push(format!("store {}", self.name));
        self.inner.close()
    }
}

impl EngineCursor for RecordingCursor {
    fn next(&mut self, record: &mut Record) -> EngineResult<bool> {
        self.inner.next(record)
    }

    fn prev(&mut self, record: &mut Record) -> EngineResult<bool> {
        self.inner.prev(record)
    }

    fn close(&mut self) -> EngineResult<()> {
        self.events.lock().unwrap().push("cursor".to_string());
        self.inner.close()
    }
}

fn recording() -> (TempDir, Registry, Events) {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    let events = Events::default();
    let engine = Recording {
        inner: DiskEngine::new(config.clone()),
        events: events.clone(),
    };
    let registry = Registry::with_engine(config, engine).unwrap();
    (dir, registry, events)
}

fn taken(events: &Events) -> Vec<String> {
    std::mem::take(&mut *events.lock().unwrap())
}

#[test]
fn test_close_releases_store_before_environment() {
    let (dir, mut registry, events) = recording();
    let home = dir.path().join("home-a");

    let id = registry.open("a.db", Some(home.as_path())).unwrap();
    registry.get(id).unwrap().put("k", "v").unwrap();
    assert!(taken(&events).is_empty());

    registry.close(id).unwrap();
    assert_eq!(taken(&events), vec!["store a.db", "env home-a"]);
}

#[test]
fn test_busy_close_releases_nothing() {
    let (dir, mut registry, events) = recording();
    let home = dir.path().join("home-a");

    let id = registry.open("a.db", Some(home.as_path())).unwrap();
    let cursor = registry.open_cursor(id).unwrap();

    assert!(matches!(registry.close(id), Err(KvError::ConnectionBusy { .. })));
    assert!(taken(&events).is_empty());

    registry.close_cursor(cursor).unwrap();
    registry.close(id).unwrap();
    assert_eq!(taken(&events), vec!["cursor", "store a.db", "env home-a"]);
}

#[test]
fn test_drop_closes_all_cursors_before_any_connection() {
    let (dir, mut registry, events) = recording();
    let home_a = dir.path().join("home-a");
    let home_b = dir.path().join("home-b");

    let a = registry.open("a.db", Some(home_a.as_path())).unwrap();
    let b = registry.open("b.db", Some(home_b.as_path())).unwrap();
    registry.get(a).unwrap().put("k", "v").unwrap();
    registry.open_cursor(a).unwrap();
    registry.open_cursor(b).unwrap();
    let positioned = registry.open_cursor(a).unwrap();
    registry.get_cursor(positioned).unwrap().next().unwrap();

    drop(registry);

    assert_eq!(
        taken(&events),
        vec![
            "cursor",
            "cursor",
            "cursor",
            "store b.db",
            "env home-b",
            "store a.db",
            "env home-a",
        ]
    );
}
