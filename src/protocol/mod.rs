//! # Sensor Line Protocol
//!
//! One newline-delimited ASCII stream carries every message kind the board
//! emits. How a line is interpreted depends on the session mode:
//!
//! | Inbound line                     | Normal mode            | Collecting mode        |
//! |----------------------------------|------------------------|------------------------|
//! | `Sensor ready.`                  | handshake              | ignored                |
//! | `Reset data`                     | reset acknowledgement  | ignored                |
//! | `t,h,m,aq,...` (14 fields)       | telemetry record       | ignored                |
//! | `d,[v1,v2,...]`                  | ignored                | bulk frame             |
//!
//! Outbound traffic is a small set of [`Command`]s, each one line.
//!
//! - [`telemetry`] classifies Normal-mode lines.
//! - [`bulk`] cleans one bulk frame into numbers.
//! - [`thresholds`] encodes a plant profile for the board.

pub mod bulk;
pub mod telemetry;
pub mod thresholds;

/// Readiness announcement printed by the board after reset.
pub const HANDSHAKE_LINE: &str = "Sensor ready.";
/// Board acknowledgement of a reset command.
pub const RESET_ACK_LINE: &str = "Reset data";
/// Prefix of every bulk-data frame.
pub const BULK_PREFIX: &str = "d,";
/// Bulk frames per analysis: temperature, humidity, moisture.
pub const BULK_FRAME_COUNT: usize = 3;

/// Line sent to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Request the historical sample dump.
    RequestBulk,
    /// Clear the board's smoothing buffers.
    Reset,
    /// Pre-encoded threshold line.
    Thresholds(String),
    /// Arbitrary user text.
    Text(String),
}

impl Command {
    /// Wire bytes, always newline-terminated.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = match self {
            Command::RequestBulk => "d".to_string(),
            Command::Reset => "r".to_string(),
            Command::Thresholds(s) | Command::Text(s) => s.clone(),
        };
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line.into_bytes()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Command::RequestBulk => "bulk request",
            Command::Reset => "reset",
            Command::Thresholds(_) => "thresholds",
            Command::Text(_) => "text",
        }
    }
}
