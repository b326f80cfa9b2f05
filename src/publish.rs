//! Publishing payloads to the MQTT broker.

use async_trait::async_trait;
use log::{debug, error, info, trace, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::AgentConfig;
use crate::error::{Error, Result};

/// Outstanding requests the client buffers before `publish` fails.
const REQUEST_CAPACITY: usize = 10;

/// How long a disconnect may take to reach the broker.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Sink for serialized records.
#[async_trait]
pub trait Publisher: Send {
    /// Publish `payload` to `topic` without waiting for delivery.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result;
}

/// MQTT publisher on a single broker connection.
///
/// The connection is established once. If the broker goes away the network
/// event loop stops and every later publish fails; there is no reconnect.
pub struct MqttPublisher {
    client: AsyncClient,
    driver: JoinHandle<()>,
}

impl MqttPublisher {
    /// Connect to the broker and wait for it to accept the session.
    pub async fn connect(config: &AgentConfig) -> Result<Self> {
        let address = config.broker_address();

        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        debug!("Connecting to broker {} as {}", address, config.client_id);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    trace!("Broker acknowledged connection: {:?}", connack);
                    break;
                }
                Ok(event) => trace!("Event before acknowledgement: {:?}", event),
                Err(source) => return Err(Error::Connection { address, source }),
            }
        }

        info!("Connected to broker {}", address);

        let driver = tokio::spawn(drive(eventloop, address));

        Ok(Self { client, driver })
    }

    /// Send a disconnect and stop the network event loop.
    pub async fn disconnect(self) {
        if let Err(e) = self.client.try_disconnect() {
            warn!("Failed to request disconnect: {}", e);
        }

        let mut driver = self.driver;
        if tokio::time::timeout(DISCONNECT_GRACE, &mut driver)
            .await
            .is_err()
        {
            driver.abort();
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| Error::Publish {
                topic: topic.to_string(),
                source: Box::new(e),
            })
    }
}

/// Poll the event loop until the connection ends.
///
/// Dropping the event loop closes the request channel, which makes every
/// later publish fail immediately.
async fn drive(mut eventloop: EventLoop, address: String) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Disconnected from broker {}", address);
                break;
            }
            Ok(event) => trace!("{:?}", event),
            Err(e) => {
                error!("Lost connection to broker {}: {}", address, e);
                break;
            }
        }
    }
}
