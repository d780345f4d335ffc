//! Relay orchestrator that ties the two endpoints together.
//!
//! Owns both endpoints, wires them as each other's destination, drives the
//! connect/listen sequence and keeps disconnected endpoints coming back.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bridge::endpoint::Endpoint;
use crate::common::error::EndpointResult;
use crate::common::reconnect::{ReconnectConfig, ReconnectState};

/// The main relay that orchestrates endpoint lifecycles.
pub struct Relay {
    /// Endpoints in declared order.
    endpoints: Vec<Arc<dyn Endpoint>>,
    /// Per-endpoint reconnect bookkeeping, same order as `endpoints`.
    reconnect_states: Mutex<Vec<ReconnectState>>,
    reconnect: ReconnectConfig,
}

impl Relay {
    /// Pair two endpoints: each becomes the other's destination.
    pub fn pair(first: Arc<dyn Endpoint>, second: Arc<dyn Endpoint>, reconnect: ReconnectConfig) -> Self {
        first.set_destination(Arc::downgrade(&second));
        second.set_destination(Arc::downgrade(&first));
        info!("Paired {} <-> {}", first.kind(), second.kind());

        if first.topic_count() != second.topic_count() {
            warn!(
                "{} has {} topics but {} has {}; unmatched positions are dropped",
                first.kind(),
                first.topic_count(),
                second.kind(),
                second.topic_count()
            );
        }

        Self {
            endpoints: vec![first, second],
            reconnect_states: Mutex::new(vec![ReconnectState::new(), ReconnectState::new()]),
            reconnect,
        }
    }

    pub fn endpoints(&self) -> &[Arc<dyn Endpoint>] {
        &self.endpoints
    }

    /// Connect every endpoint in order, then start every endpoint listening.
    ///
    /// Stops at the first failure and returns it.
    pub async fn start(&self) -> EndpointResult<()> {
        for endpoint in &self.endpoints {
            info!("Connecting to {}...", endpoint.kind());
            endpoint.connect().await?;
            info!("Connected to {}", endpoint.kind());
        }

        for endpoint in &self.endpoints {
            endpoint.listen().await?;
            info!("{} listening", endpoint.kind());
        }

        Ok(())
    }

    /// One supervisor tick.
    ///
    /// Every endpoint found disconnected gets one connect + listen attempt;
    /// connected endpoints are left alone. Returns how many were restored.
    pub async fn check_connections(&self) -> usize {
        let mut restored = 0;

        for (position, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.is_connected() {
                continue;
            }

            info!("{} is disconnected, reconnecting...", endpoint.kind());
            let result = Self::reconnect(endpoint.as_ref()).await;

            let mut states = self
                .reconnect_states
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match result {
                Ok(()) => {
                    states[position].reset();
                    restored += 1;
                    info!("{} reconnected", endpoint.kind());
                }
                Err(e) => {
                    let attempts = states[position].record_failure();
                    error!(
                        "{} reconnect attempt {} failed: {}",
                        endpoint.kind(),
                        attempts,
                        e
                    );
                }
            }
        }

        restored
    }

    async fn reconnect(endpoint: &dyn Endpoint) -> EndpointResult<()> {
        endpoint.connect().await?;
        endpoint.listen().await
    }

    /// Run connection checks on the fixed reconnect delay until shutdown.
    pub async fn supervise(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = self.reconnect.backoff();

        loop {
            let delay = backoff.next().unwrap_or(self.reconnect.delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping connection checks");
                        break;
                    }
                }
            }

            let restored = self.check_connections().await;
            if restored > 0 {
                debug!("Connection check restored {} endpoint(s)", restored);
            }
        }
    }

    /// Disconnect every endpoint. Never fails.
    pub async fn shutdown(&self) {
        for endpoint in &self.endpoints {
            info!("Disconnecting from {}", endpoint.kind());
            endpoint.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::bridge::endpoint::EndpointKind;
    use crate::test_utils::{CallLog, RecordingEndpoint};

    fn make_relay(log: &CallLog) -> (Arc<RecordingEndpoint>, Arc<RecordingEndpoint>, Relay) {
        let grid = Arc::new(RecordingEndpoint::new(EndpointKind::Grid, 2).with_call_log(log.clone()));
        let discord = Arc::new(RecordingEndpoint::new(EndpointKind::Discord, 2).with_call_log(log.clone()));
        let relay = Relay::pair(
            grid.clone(),
            discord.clone(),
            ReconnectConfig::new(Duration::from_millis(10)),
        );
        (grid, discord, relay)
    }

    #[test]
    fn test_pair_sets_destinations_both_ways() {
        let log = CallLog::default();
        let (grid, discord, _relay) = make_relay(&log);

        assert_eq!(grid.destination_kind(), Some(EndpointKind::Discord));
        assert_eq!(discord.destination_kind(), Some(EndpointKind::Grid));
    }

    #[tokio::test]
    async fn test_start_connects_all_then_listens_all() {
        let log = CallLog::default();
        let (grid, discord, relay) = make_relay(&log);

        tokio_test::assert_ok!(relay.start().await);

        assert_eq!(
            log.calls(),
            vec![
                "Grid connect",
                "Discord connect",
                "Grid listen",
                "Discord listen"
            ]
        );
        assert!(grid.is_connected());
        assert!(discord.is_connected());
    }

    #[tokio::test]
    async fn test_start_stops_at_first_failure() {
        let log = CallLog::default();
        let (grid, _discord, relay) = make_relay(&log);
        grid.fail_connect(true);

        tokio_test::assert_err!(relay.start().await);
        assert_eq!(log.calls(), vec!["Grid connect"]);
    }

    #[tokio::test]
    async fn test_check_reconnects_only_disconnected() {
        let log = CallLog::default();
        let (grid, discord, relay) = make_relay(&log);
        relay.start().await.unwrap();
        log.clear();

        discord.drop_connection();
        let restored = relay.check_connections().await;

        assert_eq!(restored, 1);
        assert_eq!(log.calls(), vec!["Discord connect", "Discord listen"]);
        assert_eq!(grid.connect_count(), 1);
        assert_eq!(discord.connect_count(), 2);
        assert!(discord.is_connected());
    }

    #[tokio::test]
    async fn test_check_leaves_connected_untouched() {
        let log = CallLog::default();
        let (_grid, _discord, relay) = make_relay(&log);
        relay.start().await.unwrap();
        log.clear();

        assert_eq!(relay.check_connections().await, 0);
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reconnect_retried_next_tick() {
        let log = CallLog::default();
        let (grid, _discord, relay) = make_relay(&log);
        relay.start().await.unwrap();

        grid.drop_connection();
        grid.fail_connect(true);
        assert_eq!(relay.check_connections().await, 0);
        assert!(!grid.is_connected());
        assert_eq!(grid.connect_count(), 2);

        grid.fail_connect(false);
        assert_eq!(relay.check_connections().await, 1);
        assert!(grid.is_connected());
        assert_eq!(grid.connect_count(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_everything() {
        let log = CallLog::default();
        let (grid, discord, relay) = make_relay(&log);
        relay.start().await.unwrap();
        log.clear();

        relay.shutdown().await;

        assert_eq!(log.calls(), vec!["Grid disconnect", "Discord disconnect"]);
        assert!(!grid.is_connected());
        assert!(!discord.is_connected());
    }

    #[tokio::test]
    async fn test_supervise_reconnects_and_stops_on_shutdown() {
        let log = CallLog::default();
        let (grid, _discord, relay) = make_relay(&log);
        let relay = Arc::new(relay);
        relay.start().await.unwrap();
        grid.drop_connection();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.supervise(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(grid.is_connected());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), supervisor)
            .await
            .expect("supervisor did not stop")
            .unwrap();
    }

    mod end_to_end {
        use super::*;
        use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
        use uuid::Uuid;

        use crate::config::{DiscordConfig, GridConfig};
        use crate::discord::events::{GuildEvent, MessageSnapshot};
        use crate::discord::DiscordEndpoint;
        use crate::grid::{GridEndpoint, GroupChatEvent};
        use crate::test_utils::{MockGateway, MockGridClient};

        const G1: u128 = 0x61;
        const G2: u128 = 0x62;
        const C1: u64 = 0xC1;
        const C2: u64 = 0xC2;

        struct Bridge {
            grid_client: Arc<MockGridClient>,
            gateway: Arc<MockGateway>,
            discord_events: tokio::sync::mpsc::UnboundedSender<GuildEvent>,
            _relay: Relay,
        }

        async fn bridge() -> Bridge {
            let grid_client = Arc::new(MockGridClient::new(Uuid::from_u128(0xB0)));
            let grid = Arc::new(GridEndpoint::new(
                grid_client.clone(),
                &GridConfig {
                    first_name: "Relay".to_string(),
                    last_name: "Resident".to_string(),
                    password: "secret".to_string(),
                    groups: vec![Uuid::from_u128(G1), Uuid::from_u128(G2)],
                    ignore: vec![],
                },
                None,
            ));

            let discord = Arc::new(DiscordEndpoint::new(
                &DiscordConfig {
                    token: "token".to_string(),
                    guild_id: GuildId::new(1),
                    channels: vec![ChannelId::new(C1), ChannelId::new(C2)],
                    ignore: vec![],
                },
                None,
            ));
            let gateway = Arc::new(MockGateway::new().with_name(UserId::new(7), "Bob"));
            let discord_events = discord.attach_session(gateway.clone(), UserId::new(1000));

            let relay = Relay::pair(grid.clone(), discord.clone(), ReconnectConfig::default());
            grid.connect().await.unwrap();
            grid.listen().await.unwrap();
            discord.listen().await.unwrap();

            Bridge {
                grid_client,
                gateway,
                discord_events,
                _relay: relay,
            }
        }

        #[tokio::test]
        async fn test_grid_message_reaches_paired_channel() {
            let bridge = bridge().await;

            bridge.grid_client.emit(GroupChatEvent {
                group_id: Uuid::from_u128(G2),
                from_id: Uuid::from_u128(5),
                from_name: "Alice".to_string(),
                message: "hi".to_string(),
            });

            assert_eq!(
                bridge.gateway.wait_sent(1).await,
                vec![(ChannelId::new(C2), "<Alice> hi".to_string())]
            );
        }

        #[tokio::test]
        async fn test_discord_edit_reaches_paired_group() {
            let bridge = bridge().await;

            bridge
                .discord_events
                .send(GuildEvent::Created(MessageSnapshot {
                    id: MessageId::new(1),
                    channel_id: ChannelId::new(C1),
                    author_id: UserId::new(7),
                    content: "foo".to_string(),
                }))
                .unwrap();
            bridge.grid_client.wait_sent(1).await;

            bridge
                .discord_events
                .send(GuildEvent::Updated {
                    channel_id: ChannelId::new(C1),
                    message_id: MessageId::new(1),
                    author_id: Some(UserId::new(7)),
                    content: Some("bar".to_string()),
                })
                .unwrap();

            let sent = bridge.grid_client.wait_sent(2).await;
            assert_eq!(
                sent,
                vec![
                    (Uuid::from_u128(G1), "<Bob> foo".to_string()),
                    (Uuid::from_u128(G1), "[Changed] [Bob] {foo} -> {bar}".to_string()),
                ]
            );
        }
    }
}
