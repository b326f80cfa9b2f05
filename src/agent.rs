//! The sample-publish-sleep loop.

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::metrics::{resolve_hostname, MetricsRecord, MetricsSource};
use crate::publish::Publisher;

pub struct Agent<S, P> {
    config: AgentConfig,
    source: S,
    publisher: P,
}

impl<S: MetricsSource, P: Publisher> Agent<S, P> {
    pub fn new(config: AgentConfig, source: S, publisher: P) -> Self {
        Self {
            config,
            source,
            publisher,
        }
    }

    /// Give back the publisher, e.g. to disconnect it.
    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Sample, encode and publish one record.
    ///
    /// A failed publish is returned as an error like any other; the caller
    /// decides whether it is fatal.
    pub async fn cycle(&mut self) -> Result<MetricsRecord> {
        let reading = self.source.sample().await?;
        let record = MetricsRecord::new(resolve_hostname(), reading);

        let payload = record.to_json()?;
        self.publisher
            .publish(&self.config.topic, payload.clone().into_bytes())
            .await?;

        info!("Sent to {}: {}", self.config.topic, payload);

        Ok(record)
    }

    /// Run cycles until `shutdown` fires or is dropped.
    ///
    /// Returns the number of cycles run, skipped ones included. Publish
    /// failures skip the cycle, every other error ends the loop.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<u64> {
        let mut cycles = 0;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                result = self.cycle() => match result {
                    Ok(_) => {}
                    Err(e) if !e.is_fatal() => warn!("Skipping cycle: {}", e),
                    Err(e) => return Err(e),
                },
            }

            cycles += 1;

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        debug!("Stopped after {} cycles", cycles);

        Ok(cycles)
    }
}
