//! Broker connection lifecycle.
//!
//! [`connect`] splits a connection into a cloneable [`BrokerConnection`]
//! handle used for publishing and a [`BrokerEventLoop`] that owns the
//! socket. The event loop forwards every inbound publish to the router and
//! re-subscribes after each (re)connect.
//!
//! ```text
//! disconnected → connecting → connected → disconnected → connecting → …
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{Notify, mpsc, watch};

use homebus_app::ports::CommandPublisher;
use homebus_domain::error::PublishError;
use homebus_domain::inbound::InboundMessage;
use homebus_domain::time::now;
use homebus_domain::topic::TopicCodec;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Observable state of the broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Create a connection handle and the event loop driving it.
///
/// Nothing touches the network until [`BrokerEventLoop::run`] is polled.
#[must_use]
pub fn connect(config: &MqttConfig) -> (BrokerConnection, BrokerEventLoop) {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.broker_host.clone(),
        config.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs.max(5))));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username.clone(), password.clone());
    }

    let (client, eventloop) = AsyncClient::new(options, config.channel_capacity.max(1));
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let shutdown = Arc::new(Notify::new());

    let connection = BrokerConnection {
        client: client.clone(),
        state: state_rx,
        shutdown: Arc::clone(&shutdown),
    };
    let event_loop = BrokerEventLoop {
        eventloop,
        client,
        state: state_tx,
        shutdown,
        subscriptions: TopicCodec::new(config.base_topic.clone()).subscriptions(),
        reconnect_interval: Duration::from_secs(config.reconnect_interval_secs),
    };
    (connection, event_loop)
}

/// Cloneable handle for publishing and observing the session.
#[derive(Clone)]
pub struct BrokerConnection {
    client: AsyncClient,
    state: watch::Receiver<ConnectionState>,
    shutdown: Arc<Notify>,
}

impl BrokerConnection {
    /// Current session state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Hand a message to the client without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::NotConnected`] unless the session is connected;
    /// nothing is queued for later delivery.
    pub fn try_send(&self, topic: String, payload: Vec<u8>) -> Result<(), MqttError> {
        if self.state() != ConnectionState::Connected {
            return Err(MqttError::NotConnected);
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(MqttError::Client)
    }

    /// Stop the event loop. Pending inbound messages are not delivered.
    pub fn shutdown(&self) {
        if let Err(err) = self.client.try_disconnect() {
            tracing::debug!(error = %err, "disconnect request not queued");
        }
        self.shutdown.notify_one();
    }
}

impl CommandPublisher for BrokerConnection {
    fn publish(
        &self,
        topic: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send {
        let result = self.try_send(topic, payload).map_err(PublishError::from);
        async move { result }
    }
}

/// Owns the broker socket; run it on its own task.
pub struct BrokerEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    state: watch::Sender<ConnectionState>,
    shutdown: Arc<Notify>,
    subscriptions: Vec<String>,
    reconnect_interval: Duration,
}

impl BrokerEventLoop {
    /// Topic filters subscribed on every connect.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Drive the session until shutdown or until `inbound` is closed.
    pub async fn run(mut self, inbound: mpsc::Sender<InboundMessage>) {
        self.set_state(ConnectionState::Connecting);
        loop {
            tokio::select! {
                () = self.shutdown.notified() => {
                    tracing::info!("broker connection shut down");
                    break;
                }
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        self.set_state(ConnectionState::Connected);
                        self.subscribe();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message =
                            InboundMessage::new(publish.topic, publish.payload.to_vec(), now());
                        if inbound.send(message).await.is_err() {
                            tracing::info!("inbound channel closed, stopping broker loop");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        self.set_state(ConnectionState::Disconnected);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            retry_in_secs = self.reconnect_interval.as_secs(),
                            "broker connection lost"
                        );
                        self.set_state(ConnectionState::Disconnected);
                        if !self.backoff().await {
                            tracing::info!("broker connection shut down");
                            break;
                        }
                        self.set_state(ConnectionState::Connecting);
                    }
                },
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Wait for the reconnect interval. Returns `false` on shutdown.
    async fn backoff(&mut self) -> bool {
        tokio::select! {
            () = self.shutdown.notified() => false,
            () = tokio::time::sleep(self.reconnect_interval) => true,
        }
    }

    fn subscribe(&self) {
        for filter in &self.subscriptions {
            match self.client.try_subscribe(filter.as_str(), QoS::AtMostOnce) {
                Ok(()) => tracing::debug!(%filter, "subscribed"),
                Err(err) => tracing::warn!(%filter, error = %err, "subscribe request failed"),
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "broker connection state changed");
        }
    }
}
