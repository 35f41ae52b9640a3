use thiserror::Error;

/// Errors surfaced by the monitor core.
///
/// Malformed inbound lines are not represented here: they are expected
/// traffic on the serial link and are dropped at the parser.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The serial port could not be opened. The connection attempt is aborted.
    #[error("failed to open {port}: {reason}")]
    Connection { port: String, reason: String },

    /// The link failed while reading; the session has been torn down.
    #[error("lost connection: {0}")]
    ConnectionLost(String),

    /// An operation needed an open session.
    #[error("not connected")]
    NotConnected,

    /// A command or threshold write failed. The connection stays up.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    /// The device did not deliver every bulk frame before the deadline.
    #[error("analysis timed out after {secs}s")]
    AnalysisTimeout { secs: u64 },

    /// Bulk data arrived but could not be turned into a result.
    #[error("analysis data error: {0}")]
    AnalysisData(String),

    /// An analysis is already collecting.
    #[error("analysis already in progress")]
    AnalysisBusy,

    /// Profile list rejected a change.
    #[error("profile error: {0}")]
    Profile(String),

    /// The profile store could not load or save.
    #[error("profile store error: {0}")]
    Store(String),
}

impl MonitorError {
    /// True for failures that end an analysis cycle but leave the session usable.
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            MonitorError::AnalysisTimeout { .. } | MonitorError::AnalysisData(_)
        )
    }
}
