//! Error taxonomy for the agent.

use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected before connecting
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Broker unreachable or connection refused at startup
    #[error("failed to connect to broker at {address}")]
    Connection {
        address: String,
        #[source]
        source: rumqttc::ConnectionError,
    },

    /// An OS metrics source could not be read
    #[error("failed to read {path}")]
    Sampling {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An OS metrics source was readable but not understood
    #[error("malformed {path}: {reason}")]
    Malformed {
        path: &'static str,
        reason: &'static str,
    },

    #[error("failed to encode metrics record")]
    Encode(#[from] serde_json::Error),

    /// Publishing a payload failed
    #[error("failed to publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Whether the error must stop the agent.
    ///
    /// Only publish failures are recoverable: the cycle is skipped and the
    /// next one proceeds as scheduled.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Publish { .. })
    }
}
