//! Interactive monitor loop.
//!
//! Drives a [`SessionController`] from a tokio task: a fixed poll interval,
//! a one-shot sleep aimed at the analysis deadline, console input lines and
//! Ctrl-C. Every event is applied on this one task, so the controller needs
//! no locking.
use super::commands::{CommandParser, ConsoleCommand, HELP_TEXT};
use super::{Notice, SessionController, SessionEvent};
use crate::analysis::matcher::MatchOutcome;
use crate::analysis::AnalysisReport;
use crate::device::Connector;
use crate::metrics;
use crate::profiles::ProfileStore;
use crate::protocol::telemetry::air_quality_label;
use crate::series::RollingSeries;
use anyhow::Result;
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;

const SPARK_WIDTH: usize = 60;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Where `connect` points, and how often the link is polled.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub port: String,
    pub baud_rate: u32,
    pub poll_interval: Duration,
    pub resample_factor: usize,
}

pub struct Monitor<C: Connector, S: ProfileStore> {
    controller: SessionController<C, S>,
    options: RunnerOptions,
    parser: CommandParser,
}

impl<C: Connector, S: ProfileStore> Monitor<C, S> {
    pub fn new(controller: SessionController<C, S>, options: RunnerOptions) -> Self {
        Self {
            controller,
            options,
            parser: CommandParser::new(),
        }
    }

    pub fn controller(&self) -> &SessionController<C, S> {
        &self.controller
    }

    /// Run until `quit`, end of input or Ctrl-C. The port is released on exit.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        if self.options.port.is_empty() {
            println!("No serial port configured; pass --port or set [device] port, then 'connect'.");
        } else {
            self.apply(SessionEvent::UserConnect {
                port: self.options.port.clone(),
                baud_rate: self.options.baud_rate,
            });
        }
        println!("Type 'help' for commands.");

        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = input.lines();

        loop {
            let deadline = self.controller.analysis_deadline();
            tokio::select! {
                _ = ticker.tick() => {
                    self.apply(SessionEvent::TimerTick);
                }
                _ = async {
                    match deadline {
                        Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
                        None => std::future::pending().await,
                    }
                } => {
                    debug!("Analysis deadline reached");
                    self.apply(SessionEvent::TimerTick);
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.on_command(&line) {
                                break;
                            }
                        }
                        Ok(None) => {
                            info!("Console input closed");
                            break;
                        }
                        Err(e) => {
                            warn!("Console read error: {}", e);
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    break;
                }
            }
        }

        self.apply(SessionEvent::UserDisconnect);
        Ok(())
    }

    fn apply(&mut self, event: SessionEvent) {
        for notice in self.controller.handle(event, Instant::now()) {
            for line in render_notice(&notice) {
                println!("{}", line);
            }
        }
    }

    /// Returns false when the loop should stop.
    fn on_command(&mut self, raw: &str) -> bool {
        match self.parser.parse(raw) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Help => println!("{}", HELP_TEXT),
            ConsoleCommand::Analyze => self.apply(SessionEvent::UserStartAnalysis),
            ConsoleCommand::Reset => self.apply(SessionEvent::UserReset),
            ConsoleCommand::Profiles => {
                for line in render_profiles(
                    self.controller.profiles().as_slice().iter().map(|p| p.name.as_str()),
                    self.controller.profiles().current_index(),
                ) {
                    println!("{}", line);
                }
            }
            ConsoleCommand::SelectProfile(idx) => self.apply(SessionEvent::UserSelectProfile(idx)),
            ConsoleCommand::AddProfile(profile) => self.apply(SessionEvent::UserAddProfile(profile)),
            ConsoleCommand::RemoveProfile => self.apply(SessionEvent::UserRemoveProfile),
            ConsoleCommand::Send(text) => self.apply(SessionEvent::UserSendText(text)),
            ConsoleCommand::Connect => {
                if self.options.port.is_empty() {
                    println!("No serial port configured.");
                } else {
                    self.apply(SessionEvent::UserConnect {
                        port: self.options.port.clone(),
                        baud_rate: self.options.baud_rate,
                    });
                }
            }
            ConsoleCommand::Disconnect => self.apply(SessionEvent::UserDisconnect),
            ConsoleCommand::Status => {
                for line in self.status_lines() {
                    println!("{}", line);
                }
            }
            ConsoleCommand::Quit => return false,
            ConsoleCommand::Unknown(word) => println!("Unknown command '{}'. Type 'help'.", word),
            ConsoleCommand::Invalid(msg) => println!("{}", msg),
        }
        true
    }

    fn status_lines(&self) -> Vec<String> {
        let c = &self.controller;
        let mut out = Vec::new();
        match c.session() {
            Some(s) => out.push(format!(
                "Connected to {} at {} baud (handshake {})",
                s.port,
                s.baud_rate,
                if c.handshake_seen() { "received" } else { "pending" }
            )),
            None => out.push("Disconnected".to_string()),
        }
        out.push(format!(
            "Active profile: {}",
            c.profiles().current().map(|p| p.name.as_str()).unwrap_or("none")
        ));
        if c.is_collecting() {
            out.push("Analysis: collecting".to_string());
        }
        let history = c.history();
        let factor = self.options.resample_factor;
        out.push(format!("Temp     {}", sparkline(&history.temperature, factor)));
        out.push(format!("Humidity {}", sparkline(&history.humidity, factor)));
        out.push(format!("Moisture {}", sparkline(&history.moisture, factor)));
        out.push(format!("Counters: {}", metrics::snapshot()));
        out
    }
}

/// Smoothed one-line plot of a rolling window.
pub fn sparkline(series: &RollingSeries, resample_factor: usize) -> String {
    let points = series.resample(resample_factor);
    if points.is_empty() {
        return String::new();
    }
    let width = points.len().min(SPARK_WIDTH);
    let picked: Vec<f64> = (0..width)
        .map(|i| points[i * (points.len() - 1) / (width - 1).max(1)].1)
        .collect();
    let min = picked.iter().copied().fold(f64::INFINITY, f64::min);
    let max = picked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let top = SPARK_LEVELS.len() - 1;
    picked
        .iter()
        .map(|v| {
            if max <= min {
                SPARK_LEVELS[0]
            } else {
                let level = ((v - min) / (max - min) * top as f64).round() as usize;
                SPARK_LEVELS[level.min(top)]
            }
        })
        .collect()
}

pub fn render_profiles<'a>(names: impl Iterator<Item = &'a str>, current: Option<usize>) -> Vec<String> {
    let lines: Vec<String> = names
        .enumerate()
        .map(|(i, name)| {
            let marker = if Some(i) == current { "*" } else { " " };
            format!("{} {}. {}", marker, i + 1, name)
        })
        .collect();
    if lines.is_empty() {
        vec!["No plant profiles. Use 'add' to create one.".to_string()]
    } else {
        lines
    }
}

fn render_report(report: &AnalysisReport) -> Vec<String> {
    let agg = &report.aggregate;
    let mut out = vec![format!(
        "Analysis: avg temp {:.1}°C, humidity {:.1}%, moisture {:.1}, air quality {} ({})",
        agg.temperature,
        agg.humidity,
        agg.moisture,
        agg.air_quality,
        air_quality_label(agg.air_quality as u8)
    )];
    match &report.outcome {
        MatchOutcome::Suitable(names) => {
            out.push(format!("Suitable plants: {}", names.join(", ")));
        }
        MatchOutcome::Closest(results) if results.is_empty() => {
            out.push("No plant profiles to compare.".to_string());
        }
        MatchOutcome::Closest(results) => {
            out.push("No plant fully matches. Closest:".to_string());
            for r in results {
                out.push(format!("  {} ({}/4)", r.plant_name, r.score));
                for unmet in &r.unmet {
                    out.push(format!("    - {}", unmet));
                }
            }
        }
    }
    out
}

/// Console lines for one notice. Empty for notices with nothing to show.
pub fn render_notice(notice: &Notice) -> Vec<String> {
    match notice {
        Notice::Connected { port, baud_rate } => {
            vec![format!("Connected to {} at {} baud; waiting for the board.", port, baud_rate)]
        }
        Notice::Disconnected { port } => vec![format!("Disconnected from {}.", port)],
        Notice::Telemetry { record, forecast } => {
            let mut line = format!(
                "T {:.1}°C (avg {:.1}, next {:.1}) | H {:.1}% (avg {:.1}, next {:.1}) | M {:.0} (avg {:.0}, next {:.0}) | AQ {}",
                record.temperature,
                record.temp_avg,
                forecast.temperature,
                record.humidity,
                record.humidity_avg,
                forecast.humidity,
                record.moisture,
                record.moisture_avg,
                forecast.moisture,
                air_quality_label(record.air_quality)
            );
            if record.alarms.any() {
                line.push_str(&format!(" | ALERT {}", record.alarms.raised().join(", ")));
            }
            vec![line]
        }
        Notice::Handshake => vec!["Board ready.".to_string()],
        Notice::ThresholdsSent { plant, line } => {
            vec![format!("Sent thresholds for {}: {}", plant, line)]
        }
        Notice::ResetAcknowledged => vec!["Board reset; history cleared.".to_string()],
        Notice::DisplayThresholds(t) => vec![format!(
            "Plot limits: temperature {}-{}, humidity {}-{}",
            t.temperature_low, t.temperature_high, t.humidity_low, t.humidity_high
        )],
        Notice::ProfilesChanged { names, current } => {
            render_profiles(names.iter().map(String::as_str), *current)
        }
        Notice::AnalysisStarted { timeout } => vec![format!(
            "Analyzing... waiting up to {}s for data.",
            timeout.as_secs()
        )],
        Notice::AnalysisProgress { received, expected } => {
            vec![format!("Received data frame {}/{}", received, expected)]
        }
        Notice::AnalysisComplete(report) => render_report(report),
        Notice::Info(msg) => vec![msg.clone()],
        Notice::Failure(e) => vec![format!("Error: {}", e)],
    }
}
