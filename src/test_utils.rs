//! Test doubles for endpoints, the grid client and the guild gateway.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serenity::model::id::{ChannelId, MessageId, UserId};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bridge::endpoint::{Destination, Endpoint, EndpointKind};
use crate::common::error::{DiscordError, DiscordResult, EndpointError, EndpointResult, GridError, GridResult};
use crate::config::GridCredentials;
use crate::discord::gateway::GuildGateway;
use crate::discord::tracker::TrackedMessage;
use crate::grid::client::{GridClient, GroupChatEvent};

/// Poll `read` until it yields at least `n` items or about a second passes.
pub async fn wait_for<T>(mut read: impl FnMut() -> Vec<T>, n: usize) -> Vec<T> {
    for _ in 0..200 {
        let items = read();
        if items.len() >= n {
            return items;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    read()
}

/// Ordered record of lifecycle calls shared between endpoints.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Endpoint that records sends and lifecycle calls.
pub struct RecordingEndpoint {
    kind: EndpointKind,
    topic_count: usize,
    sent: Mutex<Vec<(usize, String)>>,
    destination: Destination,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    connects: AtomicUsize,
    log: CallLog,
}

impl RecordingEndpoint {
    pub fn new(kind: EndpointKind, topic_count: usize) -> Self {
        Self {
            kind,
            topic_count,
            sent: Mutex::new(Vec::new()),
            destination: Destination::new(),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            log: CallLog::default(),
        }
    }

    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn sent(&self) -> Vec<(usize, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn wait_sent(&self, n: usize) -> Vec<(usize, String)> {
        wait_for(|| self.sent(), n).await
    }

    pub fn destination_kind(&self) -> Option<EndpointKind> {
        self.destination.get().map(|d| d.kind())
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Simulate a dead session.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Endpoint for RecordingEndpoint {
    fn kind(&self) -> EndpointKind {
        self.kind
    }

    fn topic_count(&self) -> usize {
        self.topic_count
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> EndpointResult<()> {
        self.log.push(format!("{} connect", self.kind));
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(EndpointError::NotConnected {
                endpoint: self.kind.to_string(),
            });
        }
        Ok(())
    }

    async fn listen(&self) -> EndpointResult<()> {
        self.log.push(format!("{} listen", self.kind));
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send(&self, topic: usize, text: &str) {
        self.sent.lock().unwrap().push((topic, text.to_string()));
    }

    async fn disconnect(&self) {
        self.log.push(format!("{} disconnect", self.kind));
        self.connected.store(false, Ordering::SeqCst);
    }

    fn set_destination(&self, destination: Weak<dyn Endpoint>) {
        self.destination.set(destination);
    }
}

/// Scriptable [`GridClient`].
pub struct MockGridClient {
    agent_id: Uuid,
    logged_in: AtomicBool,
    /// `Err` makes the subscriber's stream panic with that message.
    events_tx: Mutex<Option<mpsc::UnboundedSender<Result<GroupChatEvent, String>>>>,
    sent: Mutex<Vec<(Uuid, String)>>,
    joined: Mutex<Vec<Uuid>>,
    failing_joins: Mutex<HashSet<Uuid>>,
    fail_login: AtomicBool,
    fail_close: AtomicBool,
    logins: AtomicUsize,
    closes: AtomicUsize,
}

impl MockGridClient {
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            agent_id,
            logged_in: AtomicBool::new(false),
            events_tx: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            failing_joins: Mutex::new(HashSet::new()),
            fail_login: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            logins: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn fail_login(&self, fail: bool) {
        self.fail_login.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn fail_join(&self, group_id: Uuid) {
        self.failing_joins.lock().unwrap().insert(group_id);
    }

    /// Deliver an incoming group message to the current subscriber.
    pub fn emit(&self, event: GroupChatEvent) {
        if let Some(tx) = self.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(event));
        }
    }

    /// Make the current event stream panic on its next poll.
    pub fn crash_stream(&self, reason: &str) {
        if let Some(tx) = self.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Err(reason.to_string()));
        }
    }

    /// End the event stream, as a dropped session would.
    pub fn end_stream(&self) {
        self.events_tx.lock().unwrap().take();
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn joined(&self) -> Vec<Uuid> {
        self.joined.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(Uuid, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn wait_sent(&self, n: usize) -> Vec<(Uuid, String)> {
        wait_for(|| self.sent(), n).await
    }
}

#[async_trait]
impl GridClient for MockGridClient {
    async fn login(&self, _credentials: &GridCredentials) -> GridResult<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(GridError::LoginFailed {
                reason: "rejected".to_string(),
            });
        }
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn connect_to_sim(&self) -> GridResult<()> {
        Ok(())
    }

    async fn wait_for_event_queue(&self) -> GridResult<()> {
        Ok(())
    }

    fn agent_id(&self) -> Option<Uuid> {
        self.logged_in.load(Ordering::SeqCst).then_some(self.agent_id)
    }

    fn group_chat_events(&self) -> GridResult<BoxStream<'static, GroupChatEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(stream::unfold(rx, |mut rx| async move {
            match rx.recv().await? {
                Ok(event) => Some((event, rx)),
                Err(reason) => panic!("{}", reason),
            }
        })
        .boxed())
    }

    async fn start_group_chat_session(&self, group_id: Uuid) -> GridResult<()> {
        if self.failing_joins.lock().unwrap().contains(&group_id) {
            return Err(GridError::SessionFailed {
                group: group_id.to_string(),
                reason: "not a member".to_string(),
            });
        }
        self.joined.lock().unwrap().push(group_id);
        Ok(())
    }

    async fn send_group_message(&self, group_id: Uuid, message: &str) -> GridResult<()> {
        self.sent.lock().unwrap().push((group_id, message.to_string()));
        Ok(())
    }

    async fn close(&self) -> GridResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.logged_in.store(false, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(GridError::Closed);
        }
        Ok(())
    }
}

/// Scriptable [`GuildGateway`].
#[derive(Default)]
pub struct MockGateway {
    names: HashMap<UserId, String>,
    search_results: HashMap<String, Vec<UserId>>,
    search_fails: bool,
    messages: Mutex<HashMap<MessageId, TrackedMessage>>,
    searches: Mutex<Vec<String>>,
    sent: Mutex<Vec<(ChannelId, String)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, user_id: UserId, name: &str) -> Self {
        self.names.insert(user_id, name.to_string());
        self
    }

    pub fn with_search(mut self, query: &str, results: Vec<UserId>) -> Self {
        self.search_results.insert(query.to_string(), results);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    /// Make a message available to `fetch_message`.
    pub fn add_message(&self, tracked: TrackedMessage) {
        self.messages.lock().unwrap().insert(tracked.message.id, tracked);
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn wait_sent(&self, n: usize) -> Vec<(ChannelId, String)> {
        wait_for(|| self.sent(), n).await
    }
}

#[async_trait]
impl GuildGateway for MockGateway {
    async fn display_name(&self, user_id: UserId) -> DiscordResult<String> {
        self.names
            .get(&user_id)
            .cloned()
            .ok_or(DiscordError::MemberNotFound { user_id: user_id.get() })
    }

    async fn search_members(&self, query: &str, limit: u64) -> DiscordResult<Vec<UserId>> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.search_fails {
            return Err(DiscordError::ConnectionFailed {
                message: "search unavailable".to_string(),
            });
        }
        let mut results = self.search_results.get(query).cloned().unwrap_or_default();
        results.truncate(limit as usize);
        Ok(results)
    }

    async fn fetch_message(&self, _channel_id: ChannelId, message_id: MessageId) -> DiscordResult<TrackedMessage> {
        self.messages
            .lock()
            .unwrap()
            .get(&message_id)
            .cloned()
            .ok_or(DiscordError::ConnectionFailed {
                message: format!("unknown message {}", message_id),
            })
    }

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> DiscordResult<()> {
        self.sent.lock().unwrap().push((channel_id, text.to_string()));
        Ok(())
    }
}
