use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::store::FrameStore;

/// Outcome of one event-loop notification.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Broker acknowledged the connection; the topic subscription must be
    /// (re)issued. Emitted on every ConnAck, so a reconnect after a broker
    /// drop resubscribes without special-casing.
    Resubscribe,
    /// A frame of this many bytes was stored.
    Stored(usize),
    /// A frame of this many bytes exceeded the configured cap and was dropped.
    Oversized(usize),
    /// Pings, acks, outgoing notifications.
    Ignored,
}

/// Map one MQTT notification onto the store.
///
/// Kept free of the client handle so the message path is testable without a
/// broker; `Subscriber::run` performs the subscribe call when this returns
/// [`Dispatch::Resubscribe`].
pub fn dispatch(store: &FrameStore, max_frame_bytes: usize, event: &Event) -> Dispatch {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => Dispatch::Resubscribe,
        Event::Incoming(Packet::Publish(publish)) => {
            let len = publish.payload.len();
            if max_frame_bytes > 0 && len > max_frame_bytes {
                return Dispatch::Oversized(len);
            }
            store.set(publish.payload.clone());
            Dispatch::Stored(len)
        }
        _ => Dispatch::Ignored,
    }
}

/// Long-lived MQTT consumer: one connection, one topic, every payload into
/// the [`FrameStore`].
pub struct Subscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    max_frame_bytes: usize,
    store: FrameStore,
}

impl Subscriber {
    /// Build the client and event loop. No network traffic happens until
    /// [`run`](Self::run) starts polling.
    pub fn new(config: &MqttConfig, store: FrameStore) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if config.max_frame_bytes > 0 {
            // Transport-level cap; dispatch re-checks for the unlimited case.
            options.set_max_packet_size(config.max_frame_bytes, config.max_frame_bytes);
        }

        let (client, eventloop) = AsyncClient::new(options, 16);
        Self {
            client,
            eventloop,
            topic: config.topic.clone(),
            max_frame_bytes: config.max_frame_bytes,
            store,
        }
    }

    /// Run the connect/receive loop for the process lifetime.
    ///
    /// Connection errors are logged and retried with exponential backoff,
    /// reset on the next successful poll. Never returns and never panics;
    /// a dead broker only means the store stops being refreshed.
    pub async fn run(mut self) {
        let mut backoff = Duration::from_secs(2);
        let max_backoff = Duration::from_secs(30);
        let mut total: u64 = 0;

        loop {
            match self.eventloop.poll().await {
                Ok(event) => {
                    backoff = Duration::from_secs(2);
                    match dispatch(&self.store, self.max_frame_bytes, &event) {
                        Dispatch::Resubscribe => {
                            info!(topic = %self.topic, "connected to MQTT broker, subscribing");
                            if let Err(e) =
                                self.client.subscribe(self.topic.as_str(), QoS::AtMostOnce).await
                            {
                                warn!(error = %e, "failed to queue subscribe request");
                            }
                        }
                        Dispatch::Stored(bytes) => {
                            total += 1;
                            debug!(bytes, "stored frame");
                            if total % 100 == 0 {
                                debug!(total, "frames received");
                            }
                        }
                        Dispatch::Oversized(bytes) => {
                            warn!(bytes, cap = self.max_frame_bytes, "dropping oversized frame");
                        }
                        Dispatch::Ignored => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "MQTT connection error, retrying in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};

    fn publish_event(payload: &[u8]) -> Event {
        Event::Incoming(Packet::Publish(Publish::new(
            "esp32/cam_0",
            QoS::AtMostOnce,
            payload.to_vec(),
        )))
    }

    fn connack_event() -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        }))
    }

    #[test]
    fn publish_lands_in_store() {
        let store = FrameStore::new();
        let outcome = dispatch(&store, 0, &publish_event(b"\xFF\xD8jpeg\xFF\xD9"));
        assert_eq!(outcome, Dispatch::Stored(8));
        assert_eq!(
            store.latest().unwrap().data,
            Bytes::from_static(b"\xFF\xD8jpeg\xFF\xD9")
        );
    }

    #[test]
    fn every_connack_requests_resubscribe() {
        let store = FrameStore::new();
        assert_eq!(dispatch(&store, 0, &connack_event()), Dispatch::Resubscribe);
        // A later ConnAck (broker came back) must ask again.
        assert_eq!(dispatch(&store, 0, &connack_event()), Dispatch::Resubscribe);
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let store = FrameStore::new();
        let outcome = dispatch(&store, 4, &publish_event(b"too large"));
        assert_eq!(outcome, Dispatch::Oversized(9));
        assert!(store.latest().is_none());
    }

    #[test]
    fn cap_of_zero_is_unlimited() {
        let store = FrameStore::new();
        let outcome = dispatch(&store, 0, &publish_event(&[0u8; 64 * 1024]));
        assert_eq!(outcome, Dispatch::Stored(64 * 1024));
    }

    #[test]
    fn pings_are_ignored() {
        let store = FrameStore::new();
        let event = Event::Incoming(Packet::PingResp);
        assert_eq!(dispatch(&store, 0, &event), Dispatch::Ignored);
        assert!(store.latest().is_none());
    }
}
