use thiserror::Error;

use super::types::{ProbeFailure, ProbeStage};

/// Failures that end a probe before `RCPT TO` yields a reply code. The prober
/// folds these into a [`ProbeResult`](super::ProbeResult); they never reach
/// the caller as `Err`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: ProbeStage,
        #[source]
        source: std::io::Error,
    },
    #[error("protocol error during {stage}: {message}")]
    Protocol { stage: ProbeStage, message: String },
}

impl ProbeError {
    pub fn failure(&self) -> ProbeFailure {
        match self {
            Self::Resolve { .. } | Self::Connect { .. } => ProbeFailure::Connection,
            Self::Io { .. } | Self::Protocol { .. } => ProbeFailure::Protocol,
        }
    }

    /// `true` when the transport itself broke, so waiting for a `QUIT` reply
    /// would only burn another timeout.
    pub(crate) fn is_transport(&self) -> bool {
        !matches!(self, Self::Protocol { .. })
    }

    pub(crate) fn io(stage: ProbeStage, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::InvalidData => Self::Protocol {
                stage,
                message: source.to_string(),
            },
            _ => Self::Io { stage, source },
        }
    }
}
