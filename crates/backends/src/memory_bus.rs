//! In-process message bus
//!
//! Keyed values live in a shared map; publish/subscribe runs over a tokio
//! broadcast channel, each subscription filtering by its own patterns.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{BusMessage, ContractError, MessageBus, Subscription};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::pattern::GlobPattern;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct BusState {
    values: BTreeMap<String, String>,
    published: Vec<BusMessage>,
    unavailable: bool,
}

/// Shared in-memory bus; clones share state
#[derive(Debug, Clone)]
pub struct MemoryBus {
    state: Arc<Mutex<BusState>>,
    sender: broadcast::Sender<BusMessage>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            sender,
        }
    }

    /// Subscribe to channels matching any of `patterns`
    ///
    /// Only messages published after this call are delivered.
    pub fn subscribe(&self, patterns: &[String]) -> Result<MemorySubscription, ContractError> {
        let matchers = patterns
            .iter()
            .map(|p| GlobPattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MemorySubscription {
            patterns: patterns.to_vec(),
            matchers,
            receiver: Some(self.sender.subscribe()),
        })
    }

    /// Simulate an unreachable bus
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Every message published so far, in order
    pub fn published(&self) -> Vec<BusMessage> {
        self.state().published.clone()
    }

    /// Payloads published on one channel, in order
    pub fn published_on(&self, channel: &str) -> Vec<String> {
        self.state()
            .published
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Snapshot of stored keys
    pub fn key_snapshot(&self) -> Vec<String> {
        self.state().values.keys().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<MutexGuard<'_, BusState>, ContractError> {
        let state = self.state();
        if state.unavailable {
            return Err(ContractError::bus_unavailable("memory bus marked unavailable"));
        }
        Ok(state)
    }
}

impl MessageBus for MemoryBus {
    async fn get(&self, key: &str) -> Result<Option<String>, ContractError> {
        Ok(self.check_available()?.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ContractError> {
        self.check_available()?
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ContractError> {
        Ok(self.check_available()?.values.remove(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ContractError> {
        let glob = GlobPattern::new(pattern)?;
        let state = self.check_available()?;
        Ok(state
            .values
            .keys()
            .filter(|k| glob.matches(k))
            .cloned()
            .collect())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), ContractError> {
        let msg = BusMessage::new(channel, message);
        self.check_available()?.published.push(msg.clone());
        // No receivers is not an error
        let receivers = self.sender.send(msg).unwrap_or(0);
        debug!(channel, receivers, "Published");
        Ok(())
    }
}

/// Pattern subscription on a `MemoryBus`
#[derive(Debug)]
pub struct MemorySubscription {
    patterns: Vec<String>,
    matchers: Vec<GlobPattern>,
    receiver: Option<broadcast::Receiver<BusMessage>>,
}

impl Subscription for MemorySubscription {
    fn patterns(&self) -> &[String] {
        &self.patterns
    }

    async fn next_message(&mut self) -> Result<Option<BusMessage>, ContractError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Ok(None);
        };
        loop {
            match receiver.recv().await {
                Ok(msg) => {
                    if self.matchers.iter().any(|m| m.matches(&msg.channel)) {
                        return Ok(Some(msg));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscription lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), ContractError> {
        self.receiver = None;
        Ok(())
    }
}
