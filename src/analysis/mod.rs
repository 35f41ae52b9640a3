//! # Analysis Workflow
//!
//! An analysis asks the board for its historical sample buffers and scores
//! every plant profile against their averages.
//!
//! ## Collector States
//!
//! ```text
//!            start()                    3rd "d," frame
//!   Idle ─────────────▶ Collecting ──────────────────▶ (frames handed out) ─▶ Idle
//!                           │
//!                           │ deadline passed / cancel()
//!                           ▼
//!                   (failure reported) ─▶ Idle
//! ```
//!
//! While collecting, only `d,`-prefixed lines are kept; everything else is
//! observed and dropped. Raw frames are parsed only once all three have
//! arrived ([`finalize`]), since a partial set produces no usable result.
//!
//! The air-quality input is the latched live reading: bulk frames carry no
//! air-quality channel of their own.

pub mod matcher;

use crate::error::MonitorError;
use crate::profiles::PlantProfile;
use crate::protocol::{bulk, BULK_FRAME_COUNT, BULK_PREFIX};
use log::{debug, info};
use matcher::{Aggregate, MatchOutcome};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const CHANNEL_NAMES: [&str; BULK_FRAME_COUNT] = ["temperature", "humidity", "moisture"];

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Collecting {
        frames: Vec<String>,
        deadline: Instant,
    },
}

/// Result of feeding one line to the collector.
#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    /// Not collecting, or the line is not a bulk frame.
    Ignored,
    /// Frame stored; `received` of [`BULK_FRAME_COUNT`] so far.
    Progress { received: usize },
    /// Final frame arrived. The collector is idle again.
    Complete(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AnalysisCollector {
    state: State,
    timeout: Duration,
}

impl AnalysisCollector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: State::Idle,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, State::Collecting { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Collecting { deadline, .. } => Some(*deadline),
            State::Idle => None,
        }
    }

    pub fn received(&self) -> usize {
        match &self.state {
            State::Collecting { frames, .. } => frames.len(),
            State::Idle => 0,
        }
    }

    /// Enter collecting mode with an empty frame buffer and a fresh deadline.
    pub fn start(&mut self, now: Instant) -> Result<(), MonitorError> {
        if self.is_collecting() {
            return Err(MonitorError::AnalysisBusy);
        }
        self.state = State::Collecting {
            frames: Vec::with_capacity(BULK_FRAME_COUNT),
            deadline: now + self.timeout,
        };
        debug!("Analysis collection armed for {:?}", self.timeout);
        Ok(())
    }

    pub fn observe(&mut self, line: &str) -> Collected {
        let State::Collecting { frames, .. } = &mut self.state else {
            return Collected::Ignored;
        };
        if !line.starts_with(BULK_PREFIX) {
            return Collected::Ignored;
        }
        frames.push(line.to_string());
        if frames.len() < BULK_FRAME_COUNT {
            return Collected::Progress {
                received: frames.len(),
            };
        }
        let frames = std::mem::take(frames);
        self.state = State::Idle;
        Collected::Complete(frames)
    }

    /// Fail the collection if the deadline has passed. Partial frames are discarded.
    pub fn check_deadline(&mut self, now: Instant) -> Option<MonitorError> {
        match &self.state {
            State::Collecting { deadline, frames } if now >= *deadline => {
                info!(
                    "Analysis timed out with {}/{} frames",
                    frames.len(),
                    BULK_FRAME_COUNT
                );
                self.state = State::Idle;
                Some(MonitorError::AnalysisTimeout {
                    secs: self.timeout.as_secs(),
                })
            }
            _ => None,
        }
    }

    /// Drop any in-flight collection. Safe to call when idle.
    pub fn cancel(&mut self) -> bool {
        let was_collecting = self.is_collecting();
        self.state = State::Idle;
        was_collecting
    }
}

impl Default for AnalysisCollector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Finished analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub aggregate: Aggregate,
    /// Cleaned sample count per channel.
    pub sample_counts: [usize; BULK_FRAME_COUNT],
    pub outcome: MatchOutcome,
}

/// Parse the three raw frames, average them and score every profile.
pub fn finalize(
    raw_frames: &[String],
    latched_air_quality: Option<f64>,
    profiles: &[PlantProfile],
) -> Result<AnalysisReport, MonitorError> {
    if raw_frames.len() != BULK_FRAME_COUNT {
        return Err(MonitorError::AnalysisData(format!(
            "expected {} frames, got {}",
            BULK_FRAME_COUNT,
            raw_frames.len()
        )));
    }
    let mut means = [0.0; BULK_FRAME_COUNT];
    let mut sample_counts = [0usize; BULK_FRAME_COUNT];
    for (i, raw) in raw_frames.iter().enumerate() {
        let values = bulk::parse_frame(raw);
        sample_counts[i] = values.len();
        means[i] = bulk::mean(&values).ok_or_else(|| {
            MonitorError::AnalysisData(format!("no valid {} samples", CHANNEL_NAMES[i]))
        })?;
    }
    let air_quality = latched_air_quality
        .ok_or_else(|| MonitorError::AnalysisData("no air quality reading yet".to_string()))?
        .round();

    let aggregate = Aggregate {
        temperature: means[0],
        humidity: means[1],
        moisture: means[2],
        air_quality,
    };
    let outcome = matcher::match_profiles(profiles, &aggregate);
    Ok(AnalysisReport {
        aggregate,
        sample_counts,
        outcome,
    })
}
