//! MessageBus / Subscription traits - telemetry input and result output
//!
//! The bus offers keyed values (get/set/delete/keys) plus publish/subscribe.
//! A `Subscription` is owned exclusively by one listener task.

use crate::ContractError;

/// A message received on a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete channel the message was published on
    pub channel: String,

    /// Raw payload text
    pub payload: String,
}

impl BusMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Keyed value store with publish support
#[trait_variant::make(MessageBus: Send)]
pub trait LocalMessageBus {
    /// Read a value; `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<String>, ContractError>;

    /// Write a value
    async fn set(&self, key: &str, value: &str) -> Result<(), ContractError>;

    /// Delete a key
    ///
    /// Returns false if the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool, ContractError>;

    /// List keys matching a glob pattern (`*`, `?`)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ContractError>;

    /// Publish a message on a channel
    async fn publish(&self, channel: &str, message: &str) -> Result<(), ContractError>;
}

/// Pattern subscription owned by a single listener
#[trait_variant::make(Subscription: Send)]
pub trait LocalSubscription {
    /// Subscribed channel patterns
    fn patterns(&self) -> &[String];

    /// Wait for the next message
    ///
    /// Returns `Ok(None)` once the subscription has been closed by the bus.
    async fn next_message(&mut self) -> Result<Option<BusMessage>, ContractError>;

    /// Release all patterns held by this subscription
    async fn unsubscribe(&mut self) -> Result<(), ContractError>;
}
