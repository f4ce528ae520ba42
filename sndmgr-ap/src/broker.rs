//! MQTT broker client
//!
//! Connects to one broker endpoint, subscribes to `<base_topic>/#` and routes
//! every message on `<base_topic>/sound` or `<base_topic>/speech` into the
//! matching [`CommandQueue`](crate::queue::CommandQueue). Connection failures
//! are retried forever with a fixed delay.
//!
//! The rumqttc event loop runs in its own task once connected; message
//! delivery needs no further action from the caller.

use crate::error::{Error, Result};
use crate::queue::ChannelQueues;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use sndmgr_common::config::BrokerConfig;
use sndmgr_common::{Channel, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capacity of the request channel between client handles and the event loop
const REQUEST_CAPACITY: usize = 32;

/// How long `disconnect` waits for the event loop to flush DISCONNECT
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Decodes inbound payloads and pushes them into per-channel queues
#[derive(Debug)]
pub struct MessageRouter {
    base_topic: String,
    queues: Arc<ChannelQueues>,
}

impl MessageRouter {
    pub fn new(base_topic: impl Into<String>, queues: Arc<ChannelQueues>) -> Self {
        Self {
            base_topic: base_topic.into(),
            queues,
        }
    }

    pub fn queues(&self) -> &Arc<ChannelQueues> {
        &self.queues
    }

    /// Route one message.
    ///
    /// Returns the channel the command was queued on, `Ok(None)` for topics
    /// outside the recognised channels, or the decode/format error.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Result<Option<Channel>> {
        let Some(channel) = Channel::from_topic(&self.base_topic, topic) else {
            debug!("[MQTT]: ignoring message on unrouted topic {}", topic);
            return Ok(None);
        };

        let command = Command::from_payload(payload)?;
        info!("[MQTT]: {} was put into {} queue...", command, channel);
        self.queues.get(channel).push(command);
        Ok(Some(channel))
    }

    /// Message handler for the event loop; never fails.
    ///
    /// Malformed messages are logged and dropped.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> Option<Channel> {
        info!(
            "[MQTT]: received {} on topic {}",
            String::from_utf8_lossy(payload),
            topic
        );
        match self.route(topic, payload) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("[MQTT]: dropped message on {}: {}", topic, e);
                None
            }
        }
    }
}

/// Live connection: a client handle plus the task driving its event loop
struct Connection {
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

/// Broker client with blind reconnect
pub struct BrokerClient {
    config: BrokerConfig,
    client_id: String,
    router: Arc<MessageRouter>,
    connection: Mutex<Option<Connection>>,
}

impl BrokerClient {
    /// Create a client; nothing is connected until [`BrokerClient::connect`]
    pub fn new(config: BrokerConfig, queues: Arc<ChannelQueues>) -> Self {
        let client_id = config.client_id.clone().unwrap_or_else(|| {
            let id = Uuid::new_v4().simple().to_string();
            format!("sndmgr-{}", &id[..12])
        });
        let router = Arc::new(MessageRouter::new(config.base_topic.clone(), queues));

        Self {
            config,
            client_id,
            router,
            connection: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn queues(&self) -> &Arc<ChannelQueues> {
        self.router.queues()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    fn options(&self) -> MqttOptions {
        let mut options =
            MqttOptions::new(self.client_id.clone(), self.config.host.clone(), self.config.port);
        options.set_keep_alive(self.config.keep_alive());
        options.set_clean_session(true);
        options
    }

    /// Connect, retrying forever with the configured fixed delay.
    ///
    /// Returns once the broker acknowledged the connection and the event
    /// loop task is running.
    pub async fn connect(&self) {
        let address = self.config.address();
        let retry = self.config.retry_interval();

        loop {
            info!("[MQTT]: Connecting to broker: {}", address);
            match self.try_connect().await {
                Ok(connection) => {
                    *self.connection.lock().await = Some(connection);
                    return;
                }
                Err(e) => {
                    warn!(
                        "[MQTT]: broker {} could not be reached ({}), retrying...",
                        address, e
                    );
                    tokio::time::sleep(retry).await;
                }
            }
        }
    }

    /// One connection attempt: wait for CONNACK, subscribe, spawn the loop
    async fn try_connect(&self) -> Result<Connection> {
        let (client, mut event_loop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let subscription = self.config.subscription();

        loop {
            if let Event::Incoming(Packet::ConnAck(ack)) = event_loop.poll().await? {
                on_connect(&client, &subscription, ack.code)?;
                break;
            }
        }

        let task = EventLoopTask {
            client: client.clone(),
            event_loop,
            router: Arc::clone(&self.router),
            subscription,
            retry_interval: self.config.retry_interval(),
        };
        let event_loop = tokio::spawn(task.run());

        Ok(Connection { client, event_loop })
    }

    /// Fire-and-forget publish (QoS 0).
    ///
    /// Without a client (never connected, or disconnected) nothing is sent.
    /// A failed hand-off to the event loop tears the connection down and
    /// reconnects with the `connect` retry policy; the message is not resent.
    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        let payload = payload.into();
        let client = self
            .connection
            .lock()
            .await
            .as_ref()
            .map(|connection| connection.client.clone());

        let Some(client) = client else {
            warn!(
                "[MQTT]: not connected, dropping {} for {}",
                String::from_utf8_lossy(&payload),
                topic
            );
            return;
        };

        let result = client
            .publish(topic, QoS::AtMostOnce, false, payload.clone())
            .await
            .map_err(Error::from);

        match result {
            Ok(()) => info!(
                "[MQTT]: published {} on {}...",
                String::from_utf8_lossy(&payload),
                topic
            ),
            Err(e) if e.is_transient() => {
                warn!("[MQTT]: publish on {} failed ({}), reconnecting...", topic, e);
                self.disconnect().await;
                self.connect().await;
            }
            Err(e) => error!("[MQTT]: publish on {} failed: {}", topic, e),
        }
    }

    /// Tear down the connection and clear the client handle
    pub async fn disconnect(&self) {
        let Some(mut connection) = self.connection.lock().await.take() else {
            debug!("[MQTT]: disconnect requested while not connected");
            return;
        };

        if let Err(e) = connection.client.disconnect().await {
            debug!("[MQTT]: event loop already gone: {}", e);
        }

        if tokio::time::timeout(DISCONNECT_GRACE, &mut connection.event_loop)
            .await
            .is_err()
        {
            warn!("[MQTT]: event loop did not stop in time, aborting it");
            connection.event_loop.abort();
        }

        info!("[MQTT]: disconnected...");
    }
}

/// Subscribe on every connection acknowledgement.
///
/// Only accepted connections get here: rumqttc turns a refused CONNACK into
/// `ConnectionError::ConnectionRefused`, which surfaces in the retry warning.
fn on_connect(client: &AsyncClient, subscription: &str, code: ConnectReturnCode) -> Result<()> {
    client.try_subscribe(subscription, QoS::AtMostOnce)?;
    info!("[MQTT]: Connected to {} with Code: {:?}", subscription, code);
    Ok(())
}

struct EventLoopTask {
    client: AsyncClient,
    event_loop: EventLoop,
    router: Arc<MessageRouter>,
    subscription: String,
    retry_interval: Duration,
}

impl EventLoopTask {
    async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    // Clean sessions forget subscriptions across reconnects
                    if let Err(e) = on_connect(&self.client, &self.subscription, ack.code) {
                        error!("[MQTT]: could not resubscribe to {}: {}", self.subscription, e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.router.on_message(&publish.topic, &publish.payload);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("[MQTT]: event loop finished after DISCONNECT");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("[MQTT]: connection to broker lost ({}), retrying...", e);
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> MessageRouter {
        MessageRouter::new("manager", Arc::new(ChannelQueues::new()))
    }

    #[test]
    fn test_route_sound_start() {
        let router = router();
        let channel = router
            .route("manager/sound", br#"{"cmd":"start","audio":"x"}"#)
            .unwrap();

        assert_eq!(channel, Some(Channel::Sound));
        assert_eq!(router.queues().sound().peek(), Some(Command::start("x")));
        assert!(router.queues().speech().is_empty());
    }

    #[test]
    fn test_unrouted_topic_is_ignored() {
        let router = router();
        assert_eq!(router.route("manager/lights", b"{}").unwrap(), None);
        assert_eq!(router.route("manager/lights", b"\xff").unwrap(), None);
        assert!(router.queues().sound().is_empty());
        assert!(router.queues().speech().is_empty());
    }

    #[test]
    fn test_route_reports_decode_error() {
        let router = router();
        let err = router.route("manager/sound", b"{oops").unwrap_err();
        assert!(matches!(
            err,
            Error::Common(sndmgr_common::Error::Decode(_))
        ));
        assert!(router.queues().sound().is_empty());
    }

    #[test]
    fn test_client_id_from_config() {
        let config = BrokerConfig {
            client_id: Some("speaker-1".to_string()),
            ..BrokerConfig::default()
        };
        let client = BrokerClient::new(config, Arc::new(ChannelQueues::new()));
        assert_eq!(client.client_id(), "speaker-1");
    }

    #[test]
    fn test_generated_client_id() {
        let client = BrokerClient::new(BrokerConfig::default(), Arc::new(ChannelQueues::new()));
        assert!(client.client_id().starts_with("sndmgr-"));
        assert_eq!(client.client_id().len(), "sndmgr-".len() + 12);
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected_is_noop() {
        let client = BrokerClient::new(BrokerConfig::default(), Arc::new(ChannelQueues::new()));
        assert!(!client.is_connected().await);
        client.disconnect().await;
        assert!(!client.is_connected().await);
    }

    /// Nothing listens on port 1 of the loopback interface
    fn unreachable_client() -> BrokerClient {
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            retry_interval_ms: 50,
            ..BrokerConfig::default()
        };
        BrokerClient::new(config, Arc::new(ChannelQueues::new()))
    }

    #[tokio::test]
    async fn test_publish_when_not_connected_returns_promptly() {
        let client = unreachable_client();

        let result = tokio::time::timeout(
            Duration::from_millis(600),
            client.publish("manager/sound", r#"{"cmd":"stop"}"#),
        )
        .await;

        assert!(result.is_ok(), "publish should not wait for a broker");
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_keeps_retrying_unreachable_broker() {
        let client = unreachable_client();

        // Several retry intervals pass without connect giving up
        let result = tokio::time::timeout(Duration::from_millis(600), client.connect()).await;

        assert!(result.is_err(), "connect should still be retrying");
        assert!(!client.is_connected().await);
    }
}
