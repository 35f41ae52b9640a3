//! # Session Controller
//!
//! Owns the connection lifecycle and every piece of mutable monitor state.
//! All input arrives as a [`SessionEvent`]; all output leaves as a list of
//! [`Notice`]s for whatever display layer is attached. Nothing here touches
//! a terminal or a widget.
//!
//! ## Session Lifecycle
//!
//! A [`Session`] exists only while a port is open:
//! 1. **UserConnect** - the connector opens the port; no thresholds are sent
//!    yet because the board is not listening until it prints its handshake.
//! 2. **Handshake** (`Sensor ready.`) - the active profile's thresholds are
//!    pushed.
//! 3. **TimerTick** - one bounded read per tick; framed lines are routed by
//!    mode (Normal or Collecting); the analysis deadline is checked.
//! 4. **UserDisconnect** or a read failure - the collector is cancelled,
//!    partial bulk frames are discarded and the port is released.
//!
//! Profile changes re-send thresholds immediately when connected.
//!
//! ## Ordering
//!
//! The controller is driven from a single task. Lines are processed strictly
//! in arrival order, which the mode switch depends on: a bulk frame that
//! lands in Normal mode is dropped, and telemetry that lands while
//! collecting is not recorded.

pub mod commands;
pub mod runner;

use crate::analysis::{self, AnalysisCollector, AnalysisReport, Collected};
use crate::device::framer::LineFramer;
use crate::device::{Connector, Transport};
use crate::error::MonitorError;
use crate::logutil::preview;
use crate::metrics;
use crate::profiles::{PlantProfile, ProfileList, ProfileStore};
use crate::protocol::telemetry::{self, NormalLine, TelemetryRecord};
use crate::protocol::{thresholds, Command, BULK_FRAME_COUNT};
use crate::series::{Forecast, SensorHistory};
use log::{debug, error, info, trace, warn};
use std::time::{Duration, Instant};

const READ_CHUNK_BYTES: usize = 1024;

/// Inbound events, from the user or the poll timer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    UserConnect { port: String, baud_rate: u32 },
    UserDisconnect,
    /// Bytes obtained outside the poll path (already read from the link).
    BytesReceived(Vec<u8>),
    /// Poll the link once and check the analysis deadline.
    TimerTick,
    UserStartAnalysis,
    UserSelectProfile(usize),
    UserAddProfile(PlantProfile),
    UserRemoveProfile,
    UserReset,
    UserSendText(String),
}

/// Threshold lines drawn on the live plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayThresholds {
    pub temperature_low: f64,
    pub temperature_high: f64,
    pub humidity_low: f64,
    pub humidity_high: f64,
}

impl DisplayThresholds {
    pub fn from_profile(profile: Option<&PlantProfile>) -> Self {
        match profile {
            Some(p) => Self {
                temperature_low: p.temperature_low,
                temperature_high: p.temperature_high,
                humidity_low: p.humidity_low,
                humidity_high: p.humidity_high,
            },
            None => Self {
                temperature_low: 0.0,
                temperature_high: 100.0,
                humidity_low: 0.0,
                humidity_high: 100.0,
            },
        }
    }
}

/// Output for the display layer.
#[derive(Debug)]
pub enum Notice {
    Connected { port: String, baud_rate: u32 },
    Disconnected { port: String },
    Telemetry {
        record: TelemetryRecord,
        forecast: Forecast,
    },
    Handshake,
    ThresholdsSent { plant: String, line: String },
    ResetAcknowledged,
    DisplayThresholds(DisplayThresholds),
    ProfilesChanged {
        names: Vec<String>,
        current: Option<usize>,
    },
    AnalysisStarted { timeout: Duration },
    AnalysisProgress { received: usize, expected: usize },
    AnalysisComplete(AnalysisReport),
    Info(String),
    Failure(MonitorError),
}

/// Tunables copied out of the configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub analysis_timeout: Duration,
    pub history_len: usize,
    pub forecast_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            analysis_timeout: analysis::DEFAULT_TIMEOUT,
            history_len: crate::series::DEFAULT_CAPACITY,
            forecast_window: crate::series::DEFAULT_FORECAST_WINDOW,
        }
    }
}

impl From<&crate::config::Config> for SessionSettings {
    fn from(cfg: &crate::config::Config) -> Self {
        Self {
            analysis_timeout: cfg.analysis.timeout(),
            history_len: cfg.display.history_len,
            forecast_window: cfg.display.forecast_window,
        }
    }
}

/// State bound to one open connection.
pub struct Session {
    pub port: String,
    pub baud_rate: u32,
    transport: Box<dyn Transport>,
    framer: LineFramer,
    collector: AnalysisCollector,
    /// Most recent live air-quality score, reused by analysis.
    last_air_quality: Option<f64>,
    handshake_seen: bool,
}

impl Session {
    fn new(port: String, baud_rate: u32, transport: Box<dyn Transport>, timeout: Duration) -> Self {
        Self {
            port,
            baud_rate,
            transport,
            framer: LineFramer::new(),
            collector: AnalysisCollector::new(timeout),
            last_air_quality: None,
            handshake_seen: false,
        }
    }

    fn write(&mut self, command: &Command) -> Result<(), MonitorError> {
        self.transport.write_all(&command.encode()).map_err(|e| {
            metrics::inc_write_failures();
            warn!("Failed to send {} to {}: {}", command.label(), self.port, e);
            MonitorError::Write(e)
        })?;
        debug!("TX {}: {}", command.label(), preview(&String::from_utf8_lossy(&command.encode())));
        Ok(())
    }
}

pub struct SessionController<C: Connector, S: ProfileStore> {
    connector: C,
    store: S,
    profiles: ProfileList,
    history: SensorHistory,
    session: Option<Session>,
    settings: SessionSettings,
}

impl<C: Connector, S: ProfileStore> SessionController<C, S> {
    /// Build a controller, loading profiles from `store`.
    pub fn new(connector: C, mut store: S, settings: SessionSettings) -> Result<Self, MonitorError> {
        let profiles = ProfileList::new(store.load()?);
        Ok(Self {
            connector,
            store,
            profiles,
            history: SensorHistory::new(settings.history_len),
            session: None,
            settings,
        })
    }

    pub fn profiles(&self) -> &ProfileList {
        &self.profiles
    }

    pub fn history(&self) -> &SensorHistory {
        &self.history
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_collecting(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.collector.is_collecting())
            .unwrap_or(false)
    }

    pub fn analysis_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(|s| s.collector.deadline())
    }

    pub fn latched_air_quality(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.last_air_quality)
    }

    pub fn handshake_seen(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.handshake_seen)
            .unwrap_or(false)
    }

    pub fn display_thresholds(&self) -> DisplayThresholds {
        DisplayThresholds::from_profile(self.profiles.current())
    }

    /// Apply one event and return what the display should show.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Vec<Notice> {
        let mut out = Vec::new();
        match event {
            SessionEvent::UserConnect { port, baud_rate } => self.connect(port, baud_rate, &mut out),
            SessionEvent::UserDisconnect => self.disconnect(&mut out),
            SessionEvent::BytesReceived(bytes) => self.ingest(&bytes, &mut out),
            SessionEvent::TimerTick => self.tick(now, &mut out),
            SessionEvent::UserStartAnalysis => self.start_analysis(now, &mut out),
            SessionEvent::UserSelectProfile(idx) => self.select_profile(idx, &mut out),
            SessionEvent::UserAddProfile(profile) => self.add_profile(profile, &mut out),
            SessionEvent::UserRemoveProfile => self.remove_profile(&mut out),
            SessionEvent::UserReset => self.send(Command::Reset, &mut out),
            SessionEvent::UserSendText(text) => self.send(Command::Text(text), &mut out),
        }
        out
    }

    fn connect(&mut self, port: String, baud_rate: u32, out: &mut Vec<Notice>) {
        if let Some(existing) = &self.session {
            out.push(Notice::Info(format!(
                "Already connected to {}; disconnect first",
                existing.port
            )));
            return;
        }
        match self.connector.open(&port, baud_rate) {
            Ok(transport) => {
                info!("Connected to {} at {} baud", port, baud_rate);
                self.session = Some(Session::new(
                    port.clone(),
                    baud_rate,
                    transport,
                    self.settings.analysis_timeout,
                ));
                out.push(Notice::Connected { port, baud_rate });
                out.push(Notice::DisplayThresholds(self.display_thresholds()));
            }
            Err(e) => {
                error!("{}", e);
                out.push(Notice::Failure(e));
            }
        }
    }

    fn disconnect(&mut self, out: &mut Vec<Notice>) {
        if let Some(port) = self.teardown() {
            out.push(Notice::Disconnected { port });
        }
    }

    /// Release the current session, if any. Returns its port name.
    fn teardown(&mut self) -> Option<String> {
        let mut session = self.session.take()?;
        if session.collector.cancel() {
            info!("Discarding in-flight analysis on disconnect");
        }
        session.framer.reset();
        session.transport.close();
        info!("Disconnected from {} ({})", session.port, metrics::snapshot());
        Some(session.port)
    }

    fn tick(&mut self, now: Instant, out: &mut Vec<Notice>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut buf = [0u8; READ_CHUNK_BYTES];
        match session.transport.read_chunk(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                trace!("RAW {} bytes: {}", n, crate::logutil::hex_snippet(&buf[..n], 32));
                self.ingest(&buf[..n], out);
            }
            Err(e) => {
                error!("Serial read error: {}", e);
                let _ = self.teardown();
                out.push(Notice::Failure(MonitorError::ConnectionLost(e.to_string())));
                return;
            }
        }
        if let Some(session) = self.session.as_mut() {
            if let Some(err) = session.collector.check_deadline(now) {
                metrics::inc_analyses_timed_out();
                warn!("{}", err);
                out.push(Notice::Failure(err));
            }
        }
    }

    fn ingest(&mut self, bytes: &[u8], out: &mut Vec<Notice>) {
        let lines = match self.session.as_mut() {
            Some(session) => session.framer.feed(bytes),
            None => {
                debug!("Dropping {} bytes received while disconnected", bytes.len());
                return;
            }
        };
        metrics::inc_lines_framed(lines.len() as u64);
        for line in lines {
            debug!("RX {}", preview(&line));
            self.dispatch_line(&line, out);
        }
    }

    fn dispatch_line(&mut self, line: &str, out: &mut Vec<Notice>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.collector.is_collecting() {
            match session.collector.observe(line) {
                Collected::Ignored => trace!("Line ignored during collection"),
                Collected::Progress { received } => {
                    metrics::inc_bulk_frames();
                    out.push(Notice::AnalysisProgress {
                        received,
                        expected: BULK_FRAME_COUNT,
                    });
                }
                Collected::Complete(frames) => {
                    metrics::inc_bulk_frames();
                    let latched = session.last_air_quality;
                    self.finish_analysis(&frames, latched, out);
                }
            }
            return;
        }

        match telemetry::classify(line) {
            NormalLine::Handshake => {
                info!("Device handshake received");
                session.handshake_seen = true;
                out.push(Notice::Handshake);
                self.push_thresholds(out);
            }
            NormalLine::ResetAck => {
                info!("Device acknowledged reset");
                self.history.clear();
                out.push(Notice::ResetAcknowledged);
            }
            NormalLine::Telemetry(record) => {
                metrics::inc_telemetry_records();
                session.last_air_quality = Some(f64::from(record.air_quality));
                self.history
                    .record(record.temperature, record.humidity, record.moisture);
                let forecast = self.history.forecast(self.settings.forecast_window);
                out.push(Notice::Telemetry { record, forecast });
            }
            NormalLine::StrayBulk | NormalLine::Noise => {
                metrics::inc_noise_dropped();
            }
        }
    }

    fn finish_analysis(&mut self, frames: &[String], latched: Option<f64>, out: &mut Vec<Notice>) {
        match analysis::finalize(frames, latched, self.profiles.as_slice()) {
            Ok(report) => {
                metrics::inc_analyses_completed();
                info!(
                    "Analysis complete: avg temp {:.1}, humidity {:.1}, moisture {:.1}, aq {}",
                    report.aggregate.temperature,
                    report.aggregate.humidity,
                    report.aggregate.moisture,
                    report.aggregate.air_quality
                );
                out.push(Notice::AnalysisComplete(report));
            }
            Err(e) => {
                metrics::inc_analyses_failed();
                warn!("Analysis failed: {}", e);
                out.push(Notice::Failure(e));
            }
        }
    }

    fn start_analysis(&mut self, now: Instant, out: &mut Vec<Notice>) {
        let Some(session) = self.session.as_mut() else {
            out.push(Notice::Failure(MonitorError::NotConnected));
            return;
        };
        if let Err(e) = session.collector.start(now) {
            out.push(Notice::Failure(e));
            return;
        }
        if let Err(e) = session.write(&Command::RequestBulk) {
            session.collector.cancel();
            out.push(Notice::Failure(e));
            return;
        }
        info!("Requested bulk data from {}", session.port);
        out.push(Notice::AnalysisStarted {
            timeout: session.collector.timeout(),
        });
    }

    /// Send the active profile's thresholds. A missing profile is logged only.
    fn push_thresholds(&mut self, out: &mut Vec<Notice>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(profile) = self.profiles.current() else {
            info!("No active plant profile; thresholds not sent");
            out.push(Notice::Info("No active plant profile; thresholds not sent".to_string()));
            return;
        };
        let line = thresholds::encode(profile);
        match session.write(&Command::Thresholds(line.clone())) {
            Ok(()) => {
                metrics::inc_threshold_pushes();
                info!("Sent thresholds for '{}': {}", profile.name, line);
                out.push(Notice::ThresholdsSent {
                    plant: profile.name.clone(),
                    line,
                });
            }
            Err(e) => out.push(Notice::Failure(e)),
        }
    }

    fn send(&mut self, command: Command, out: &mut Vec<Notice>) {
        let Some(session) = self.session.as_mut() else {
            out.push(Notice::Failure(MonitorError::NotConnected));
            return;
        };
        match session.write(&command) {
            Ok(()) => out.push(Notice::Info(format!("Sent {}", command.label()))),
            Err(e) => out.push(Notice::Failure(e)),
        }
    }

    /// Common tail of every change to the active profile.
    fn active_profile_changed(&mut self, out: &mut Vec<Notice>) {
        out.push(Notice::ProfilesChanged {
            names: self.profiles.as_slice().iter().map(|p| p.name.clone()).collect(),
            current: self.profiles.current_index(),
        });
        out.push(Notice::DisplayThresholds(self.display_thresholds()));
        if self.session.is_some() {
            self.push_thresholds(out);
        }
    }

    fn persist(&mut self, out: &mut Vec<Notice>) {
        if let Err(e) = self.store.save(self.profiles.as_slice()) {
            error!("{}", e);
            out.push(Notice::Failure(e));
        }
    }

    fn select_profile(&mut self, index: usize, out: &mut Vec<Notice>) {
        match self.profiles.select(index) {
            Ok(p) => {
                info!("Active plant profile: {}", p.name);
                self.active_profile_changed(out);
            }
            Err(e) => out.push(Notice::Failure(e)),
        }
    }

    fn add_profile(&mut self, profile: PlantProfile, out: &mut Vec<Notice>) {
        match self.profiles.add(profile) {
            Ok(p) => {
                info!("Added plant profile '{}'", p.name);
                self.persist(out);
                self.active_profile_changed(out);
            }
            Err(e) => out.push(Notice::Failure(e)),
        }
    }

    fn remove_profile(&mut self, out: &mut Vec<Notice>) {
        match self.profiles.remove_current() {
            Ok(removed) => {
                info!("Removed plant profile '{}'", removed.name);
                self.persist(out);
                self.active_profile_changed(out);
            }
            Err(e) => out.push(Notice::Failure(e)),
        }
    }
}
