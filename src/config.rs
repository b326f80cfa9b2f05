use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BROKER_HOST: &str = "localhost";
pub const DEFAULT_BROKER_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "home/computer/metrics";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_secs(1);
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    /// MQTT broker hostname or ip address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Topic every record is published to.
    pub topic: String,
    /// MQTT client identifier.
    pub client_id: String,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// CPU measurement window.
    pub sample_window: Duration,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
}

impl AgentConfig {
    /// Broker address as `host:port`.
    pub fn broker_address(&self) -> String {
        format!("{}:{}", self.broker_host, self.broker_port)
    }

    pub fn validate(&self) -> Result {
        if self.broker_host.is_empty() {
            return Err(Error::InvalidConfig("broker host is empty".to_string()));
        }
        if self.topic.is_empty() {
            return Err(Error::InvalidConfig("topic is empty".to_string()));
        }
        if !rumqttc::valid_topic(&self.topic) {
            return Err(Error::InvalidConfig(format!(
                "topic '{}' contains wildcard characters",
                self.topic
            )));
        }
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig("client id is empty".to_string()));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig("interval must be positive".to_string()));
        }
        if self.keep_alive < Duration::from_secs(1) {
            return Err(Error::InvalidConfig(
                "keep-alive must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: default_client_id(),
            interval: DEFAULT_INTERVAL,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

/// Client identifier unique per process on this host.
pub fn default_client_id() -> String {
    format!("{}-{}", env!("CARGO_PKG_NAME"), std::process::id())
}
