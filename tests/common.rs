//! Test utilities & fixtures.
//! Scripted in-memory link, connector and profile store for driving the
//! session controller without hardware.
#![allow(dead_code)]

use plantmon::device::{Connector, Transport};
use plantmon::error::MonitorError;
use plantmon::profiles::{PlantProfile, ProfileStore};
use plantmon::session::{Notice, SessionController, SessionEvent, SessionSettings};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const PORT: &str = "/dev/ttyTEST0";

enum Chunk {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

/// Shared view of the fake wire. Clones observe the same buffers.
#[derive(Clone, Default)]
pub struct Link {
    inbound: Arc<Mutex<VecDeque<Chunk>>>,
    written: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl Link {
    /// Queue bytes for the next read.
    pub fn push(&self, data: &str) {
        self.inbound
            .lock()
            .unwrap()
            .push_back(Chunk::Data(data.as_bytes().to_vec()));
    }

    pub fn push_bytes(&self, data: &[u8]) {
        self.inbound
            .lock()
            .unwrap()
            .push_back(Chunk::Data(data.to_vec()));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.inbound.lock().unwrap().push_back(Chunk::Error(kind));
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
    }

    pub fn take_written(&self) -> String {
        let mut guard = self.written.lock().unwrap();
        let out = String::from_utf8_lossy(&guard).into_owned();
        guard.clear();
        out
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

pub struct ScriptedTransport {
    link: Link,
}

impl Transport for ScriptedTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.link.inbound.lock().unwrap();
        match queue.pop_front() {
            None => Ok(0),
            Some(Chunk::Error(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            Some(Chunk::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    queue.push_front(Chunk::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.link.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        self.link.written.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.link.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub link: Link,
    pub refuse: Arc<AtomicBool>,
    pub opened: Arc<Mutex<Vec<(String, u32)>>>,
}

impl Connector for ScriptedConnector {
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, MonitorError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(MonitorError::Connection {
                port: port.to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        self.opened
            .lock()
            .unwrap()
            .push((port.to_string(), baud_rate));
        self.link.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(ScriptedTransport {
            link: self.link.clone(),
        }))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub profiles: Arc<Mutex<Vec<PlantProfile>>>,
    pub saves: Arc<AtomicUsize>,
    pub fail_saves: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn with(profiles: Vec<PlantProfile>) -> Self {
        let store = Self::default();
        *store.profiles.lock().unwrap() = profiles;
        store
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored_names(&self) -> Vec<String> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<PlantProfile>, MonitorError> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    fn save(&mut self, profiles: &[PlantProfile]) -> Result<(), MonitorError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(MonitorError::Store("disk full".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.profiles.lock().unwrap() = profiles.to_vec();
        Ok(())
    }
}

pub type TestController = SessionController<ScriptedConnector, MemoryStore>;

/// Reference profile: thresholds `18,25,40,60,1,300,700`.
pub fn basil() -> PlantProfile {
    PlantProfile::new("Basil", (18.0, 25.0), (40.0, 60.0))
        .with_moisture(300.0, 700.0)
        .with_air_quality_min(1.0)
}

pub fn fern() -> PlantProfile {
    PlantProfile::new("Fern", (16.0, 24.0), (50.0, 80.0)).with_moisture(450.0, 850.0)
}

/// Telemetry line with the given live readings and no alarms raised.
pub fn telemetry(temperature: f64, humidity: f64, moisture: f64, air_quality: u8) -> String {
    format!(
        "{},{},{},{},{},{},{},0,0,0,0,0,0,0\n",
        temperature, humidity, moisture, air_quality, temperature, humidity, moisture
    )
}

pub struct Harness {
    pub controller: TestController,
    pub link: Link,
    pub connector: ScriptedConnector,
    pub store: MemoryStore,
    pub t0: Instant,
}

impl Harness {
    pub fn new(profiles: Vec<PlantProfile>) -> Self {
        let connector = ScriptedConnector::default();
        let store = MemoryStore::with(profiles);
        let controller =
            SessionController::new(connector.clone(), store.clone(), SessionSettings::default())
                .unwrap();
        Self {
            controller,
            link: connector.link.clone(),
            connector,
            store,
            t0: Instant::now(),
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Notice> {
        let now = self.t0;
        self.controller.handle(event, now)
    }

    pub fn handle_at(&mut self, event: SessionEvent, secs: u64) -> Vec<Notice> {
        self.controller
            .handle(event, self.t0 + std::time::Duration::from_secs(secs))
    }

    pub fn connect(&mut self) -> Vec<Notice> {
        self.handle(SessionEvent::UserConnect {
            port: PORT.to_string(),
            baud_rate: 9600,
        })
    }

    /// Queue `data` and poll once.
    pub fn receive(&mut self, data: &str) -> Vec<Notice> {
        self.link.push(data);
        self.handle(SessionEvent::TimerTick)
    }
}

pub fn has_failure(notices: &[Notice], pred: impl Fn(&MonitorError) -> bool) -> bool {
    notices
        .iter()
        .any(|n| matches!(n, Notice::Failure(e) if pred(e)))
}
