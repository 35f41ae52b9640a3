//! # Plantmon - Serial Environmental Monitor
//!
//! Plantmon talks to an Arduino sensor board over a serial link, plots its
//! live temperature, humidity, soil-moisture and air-quality telemetry, and
//! matches the board's historical averages against a list of plant profiles.
//!
//! ## Features
//!
//! - **Line Protocol**: Newline-delimited ASCII traffic, tolerant of invalid bytes and partial lines.
//! - **Threshold Sync**: The active profile's ranges are pushed to the board after its `Sensor ready.` handshake and on every profile change.
//! - **Analysis**: Bulk history dump (`d`) collected into three frames, averaged and scored against every profile.
//! - **Rolling History**: Fixed-length windows with interpolated display and a one-step linear forecast.
//! - **Profile Store**: JSON file of plant preferences with locked atomic writes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plantmon::config::Config;
//! use plantmon::device::SerialConnector;
//! use plantmon::profiles::JsonProfileStore;
//! use plantmon::session::{SessionController, SessionEvent, SessionSettings};
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let connector = SerialConnector::new(config.device.read_timeout(), config.device.settle());
//!     let store = JsonProfileStore::new(&config.profiles.path);
//!     let mut controller = SessionController::new(connector, store, SessionSettings::from(&config))?;
//!
//!     controller.handle(
//!         SessionEvent::UserConnect { port: "/dev/ttyACM0".into(), baud_rate: 9600 },
//!         Instant::now(),
//!     );
//!     for notice in controller.handle(SessionEvent::TimerTick, Instant::now()) {
//!         println!("{:?}", notice);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`session`] - Session controller, event set, console commands and the poll loop
//! - [`device`] - Serial transport seam and line framing
//! - [`protocol`] - Wire constants, telemetry and bulk parsing, threshold encoding
//! - [`analysis`] - Bulk collection state machine and plant matching
//! - [`series`] - Rolling sample windows and forecasting
//! - [`profiles`] - Plant profiles and their persistence
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input validation for profile data
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Monitor loop   │ ← poll timer, deadline, console input
//! └─────────────────┘
//!          │ SessionEvent
//! ┌─────────────────┐
//! │   Session       │ ← mode dispatch, thresholds, analysis
//! │   Controller    │
//! └─────────────────┘
//!     │          │
//! ┌────────┐ ┌──────────┐
//! │ Device │ │ Profiles │ ← serial link / JSON store
//! └────────┘ └──────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod device;
pub mod error;
pub mod logutil;
pub mod metrics;
pub mod profiles;
pub mod protocol;
pub mod series;
pub mod session;
pub mod validation;
