//! Doubles shared by the unit tests of this crate.

// Not every test module uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use vigil_storage::{PersistenceError, StatsPersistence};

use crate::clock::Clock;
use crate::error::AssertionError;
use crate::power::{Assertion, SleepInhibitor};
use crate::presentation::PresentationSink;
use crate::tracker::{SessionTracker, SharedTracker};

/// Clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    offset_ns: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            offset_ns: AtomicU64::new(0),
        })
    }

    pub fn advance(&self, by: Duration) {
        let ns = u64::try_from(by.as_nanos()).unwrap();
        self.offset_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }
}

/// Counts acquisitions and releases; can be told to refuse.
#[derive(Clone, Default)]
pub struct FakeInhibitor {
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub deny: Arc<AtomicBool>,
    pub last_reason: Arc<Mutex<Option<String>>>,
}

impl FakeInhibitor {
    pub fn held(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

struct FakeAssertion {
    released: Arc<AtomicUsize>,
}

impl Assertion for FakeAssertion {}

impl Drop for FakeAssertion {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl SleepInhibitor for FakeInhibitor {
    fn acquire(&mut self, reason: &str) -> Result<Box<dyn Assertion>, AssertionError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(AssertionError::Denied(String::from("denied by test")));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        *self.last_reason.lock().unwrap() = Some(reason.to_string());
        Ok(Box::new(FakeAssertion {
            released: self.released.clone(),
        }))
    }
}

/// In-memory persistence with a write counter and a failure switch.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub value: Arc<Mutex<Option<Duration>>>,
    pub writes: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn with_total(total: Duration) -> Self {
        let store = Self::default();
        *store.value.lock().unwrap() = Some(total);
        store
    }

    pub fn saved(&self) -> Option<Duration> {
        *self.value.lock().unwrap()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StatsPersistence for MemoryStore {
    fn load(&self) -> Duration {
        self.saved().unwrap_or(Duration::ZERO)
    }

    fn save(&self, total: Duration) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::InvalidValue {
                key: String::from("test"),
                value: String::from("write refused"),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap() = Some(total);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Activity(bool),
    Total(String),
    FirstLaunch,
}

/// Records everything pushed to it.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn activity_events(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Activity(active) => Some(active),
                _ => None,
            })
            .collect()
    }

    pub fn totals(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Total(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn activity_changed(&self, active: bool) {
        self.events.lock().unwrap().push(SinkEvent::Activity(active));
    }

    fn total_changed(&self, text: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Total(text.to_string()));
    }

    fn first_launch(&self) {
        self.events.lock().unwrap().push(SinkEvent::FirstLaunch);
    }
}

/// A tracker wired to fresh doubles.
pub struct Harness {
    pub tracker: SessionTracker,
    pub clock: Arc<ManualClock>,
    pub inhibitor: FakeInhibitor,
    pub store: MemoryStore,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::default())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let clock = ManualClock::new();
        let inhibitor = FakeInhibitor::default();
        let sink = RecordingSink::new();
        let tracker = SessionTracker::new(
            Box::new(inhibitor.clone()),
            Box::new(store.clone()),
            sink.clone(),
            clock.clone(),
            "test assertion",
        );
        Self {
            tracker,
            clock,
            inhibitor,
            store,
            sink,
        }
    }
}

/// The doubles of a [`Harness`] whose tracker has been moved elsewhere.
pub struct Doubles {
    pub clock: Arc<ManualClock>,
    pub inhibitor: FakeInhibitor,
    pub store: MemoryStore,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Share the tracker and keep the doubles for assertions.
    pub fn into_shared(self) -> (SharedTracker, Doubles) {
        let Self {
            tracker,
            clock,
            inhibitor,
            store,
            sink,
        } = self;
        (
            tracker.into_shared(),
            Doubles {
                clock,
                inhibitor,
                store,
                sink,
            },
        )
    }
}
