//! Redis message bus

use std::fmt;
use std::pin::Pin;

use contracts::{BusMessage, ContractError, MessageBus, Subscription};
use futures::{Stream, StreamExt};
use redis::aio::{ConnectionManager, PubSubSink};
use redis::{AsyncCommands, Msg};
use tracing::{debug, info, instrument, warn};

const SCAN_BATCH: usize = 100;

fn bus_error(command: &str, err: redis::RedisError) -> ContractError {
    ContractError::bus_unavailable(format!("redis {command} failed: {err}"))
}

/// Keyed values and publish over a managed Redis connection
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    conn: ConnectionManager,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisBus {
    #[instrument(name = "redis_connect", skip(url))]
    pub async fn connect(url: &str) -> Result<Self, ContractError> {
        info!("Connecting to message bus");

        let client = redis::Client::open(url)
            .map_err(|e| ContractError::bus_unavailable(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| bus_error("connect", e))?;

        info!("Connected to message bus");
        Ok(Self { client, conn })
    }

    /// Open a dedicated pubsub connection subscribed to `patterns`
    pub async fn subscribe(&self, patterns: &[String]) -> Result<RedisSubscription, ContractError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| bus_error("pubsub connect", e))?;
        for pattern in patterns {
            pubsub
                .psubscribe(pattern)
                .await
                .map_err(|e| bus_error("PSUBSCRIBE", e))?;
        }
        debug!(?patterns, "Subscribed");

        let (sink, stream) = pubsub.split();
        Ok(RedisSubscription {
            patterns: patterns.to_vec(),
            sink,
            stream: Box::pin(stream),
            closed: false,
        })
    }
}

impl MessageBus for RedisBus {
    async fn get(&self, key: &str) -> Result<Option<String>, ContractError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(|e| bus_error("GET", e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ContractError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(key, value)
            .await
            .map_err(|e| bus_error("SET", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ContractError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(|e| bus_error("DEL", e))?;
        Ok(removed > 0)
    }

    /// Incremental `SCAN ... MATCH`; never blocks the server the way `KEYS` does
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ContractError> {
        let mut conn = self.conn.clone();
        let mut found = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| bus_error("SCAN", e))?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once
        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), ContractError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(channel, message)
            .await
            .map_err(|e| bus_error("PUBLISH", e))?;
        debug!(channel, receivers, "Published");
        Ok(())
    }
}

/// Pattern subscription on its own Redis connection
pub struct RedisSubscription {
    patterns: Vec<String>,
    sink: PubSubSink,
    stream: Pin<Box<dyn Stream<Item = Msg> + Send>>,
    closed: bool,
}

impl fmt::Debug for RedisSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSubscription")
            .field("patterns", &self.patterns)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Subscription for RedisSubscription {
    fn patterns(&self) -> &[String] {
        &self.patterns
    }

    async fn next_message(&mut self) -> Result<Option<BusMessage>, ContractError> {
        if self.closed {
            return Ok(None);
        }
        loop {
            let Some(msg) = self.stream.next().await else {
                return Ok(None);
            };
            match msg.get_payload::<String>() {
                Ok(payload) => return Ok(Some(BusMessage::new(msg.get_channel_name(), payload))),
                Err(e) => {
                    warn!(channel = msg.get_channel_name(), error = %e, "Non-text payload skipped");
                }
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), ContractError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for pattern in &self.patterns {
            self.sink
                .punsubscribe(pattern)
                .await
                .map_err(|e| bus_error("PUNSUBSCRIBE", e))?;
        }
        debug!(patterns = ?self.patterns, "Unsubscribed");
        Ok(())
    }
}
