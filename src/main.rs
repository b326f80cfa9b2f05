//! hostpulse - host telemetry agent.
//!
//! Samples CPU and memory utilization at a fixed cadence and publishes each
//! reading as JSON to an MQTT broker.

mod agent;
mod config;
mod error;
mod logging;
mod metrics;
mod publish;

use agent::Agent;
use anyhow::{Context, Result};
use clap::Parser;
use config::AgentConfig;
use metrics::SystemSampler;
use publish::MqttPublisher;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;

/// Publish host CPU and memory utilization to an MQTT broker
#[derive(Parser, Debug)]
#[command(name = "hostpulse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MQTT broker address
    #[arg(long, env = "MQTT_BROKER_HOST", default_value = config::DEFAULT_BROKER_HOST)]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, env = "MQTT_BROKER_PORT", default_value_t = config::DEFAULT_BROKER_PORT)]
    broker_port: u16,

    /// Topic the metrics are published to
    #[arg(short, long, env = "MQTT_TOPIC", default_value = config::DEFAULT_TOPIC)]
    topic: String,

    /// MQTT client identifier (default: hostpulse-<pid>)
    #[arg(long, env = "MQTT_CLIENT_ID")]
    client_id: Option<String>,

    /// Seconds to wait between publishes
    #[arg(short, long, env = "PUBLISH_INTERVAL", default_value_t = config::DEFAULT_INTERVAL.as_secs())]
    interval: u64,

    /// MQTT keep-alive in seconds
    #[arg(long, env = "MQTT_KEEP_ALIVE", default_value_t = config::DEFAULT_KEEP_ALIVE.as_secs())]
    keep_alive: u64,

    /// Level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> AgentConfig {
        AgentConfig {
            broker_host: self.broker_host,
            broker_port: self.broker_port,
            topic: self.topic,
            client_id: self.client_id.unwrap_or_else(config::default_client_id),
            interval: Duration::from_secs(self.interval),
            keep_alive: Duration::from_secs(self.keep_alive),
            ..Default::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.verbose)?;

    let config = args.into_config();
    config.validate()?;

    log::trace!("{:#?}", config);
    log::info!(
        "Publishing to {} on {} every {:?}",
        config.topic,
        config.broker_address(),
        config.interval
    );

    let publisher = MqttPublisher::connect(&config).await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(forward_interrupt(tokio::signal::ctrl_c(), shutdown_tx));

    let sampler = SystemSampler::new(config.sample_window);
    let mut agent = Agent::new(config, sampler, publisher);

    let outcome = agent.run(shutdown_rx).await;

    agent.into_publisher().disconnect().await;

    let cycles = outcome.context("Metrics agent stopped")?;
    log::debug!("Published {} cycles", cycles);

    Ok(())
}

/// Turn the interrupt signal into a shutdown request.
///
/// If the signal cannot be listened for, the sender is held forever so the
/// agent keeps running until the process is killed.
async fn forward_interrupt<F>(signal: F, shutdown: broadcast::Sender<()>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            log::info!("Received interrupt, shutting down");
            let _ = shutdown.send(());
        }
        Err(e) => {
            log::error!("Failed to listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_arguments() {
        let args = Args::try_parse_from(["hostpulse"]).unwrap();
        let config = args.into_config();

        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.sample_window, Duration::from_secs(1));
        assert!(config.client_id.starts_with("hostpulse-"));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "hostpulse",
            "--broker-host",
            "10.0.0.2",
            "--broker-port",
            "11883",
            "--topic",
            "lab/rack1/metrics",
            "--client-id",
            "rack1",
            "--interval",
            "30",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);

        let config = args.into_config();
        assert_eq!(config.broker_address(), "10.0.0.2:11883");
        assert_eq!(config.topic, "lab/rack1/metrics");
        assert_eq!(config.client_id, "rack1");
        assert_eq!(config.interval, Duration::from_secs(30));
    }

    #[test]
    fn args_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_requests_shutdown() {
        let (tx, mut rx) = broadcast::channel(1);

        tokio::spawn(forward_interrupt(async { Ok(()) }, tx));

        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn signal_setup_failure_keeps_agent_running() {
        let (tx, mut rx) = broadcast::channel::<()>(1);

        tokio::spawn(forward_interrupt(
            async {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no signal handler",
                ))
            },
            tx,
        ));

        // Neither a shutdown nor a closed channel within a day of uptime
        let outcome = tokio::time::timeout(Duration::from_secs(86_400), rx.recv()).await;
        assert!(outcome.is_err());
    }
}
