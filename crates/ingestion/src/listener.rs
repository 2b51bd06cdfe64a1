//! BusListener - one long-lived task per subscription

use std::sync::Arc;

use contracts::Subscription;
use dispatcher::DispatchOutcome;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::handler::MessageHandler;

/// Per-listener message counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub listener: String,
    pub received: u64,
    pub handled: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl ListenerStats {
    pub fn new(listener: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: DispatchOutcome) {
        self.received += 1;
        match outcome {
            DispatchOutcome::Handled => self.handled += 1,
            DispatchOutcome::Ignored => self.ignored += 1,
            DispatchOutcome::Dropped => self.dropped += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

/// Pulls messages from its own subscription and hands them to the shared handler
///
/// Messages of one subscription are handled strictly in arrival order. A
/// message being handled when cancellation arrives is finished first.
pub struct BusListener<Sub, H> {
    name: String,
    subscription: Sub,
    handler: Arc<H>,
    cancel: CancellationToken,
}

impl<Sub, H> BusListener<Sub, H>
where
    Sub: Subscription + Send + 'static,
    H: MessageHandler,
{
    pub fn new(
        name: impl Into<String>,
        subscription: Sub,
        handler: Arc<H>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            subscription,
            handler,
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until cancelled
    ///
    /// The subscription is released before returning. A receive error or a
    /// subscription closed by the bus stops this listener and cancels the
    /// shared token so its siblings stop too.
    #[instrument(name = "listener_run", skip(self), fields(listener = %self.name))]
    pub async fn run(mut self) -> Result<ListenerStats> {
        info!(patterns = ?self.subscription.patterns(), "Listener started");
        let mut stats = ListenerStats::new(&self.name);

        let failure = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Cancellation requested");
                    break None;
                }
                next = self.subscription.next_message() => next,
            };

            match next {
                Ok(Some(message)) => {
                    let outcome = self.handler.handle(&self.name, &message).await;
                    stats.record(outcome);
                }
                Ok(None) if self.cancel.is_cancelled() => {
                    info!("Subscription closed during shutdown");
                    break None;
                }
                Ok(None) => {
                    error!("Subscription closed by bus, stopping listeners");
                    self.cancel.cancel();
                    break Some(IngestionError::closed(&self.name));
                }
                Err(err) => {
                    error!(error = %err, "Receive failed, stopping listeners");
                    self.cancel.cancel();
                    break Some(IngestionError::receive(&self.name, err));
                }
            }
        };

        if let Err(err) = self.subscription.unsubscribe().await {
            warn!(error = %err, "Unsubscribe failed");
        }
        info!(
            received = stats.received,
            handled = stats.handled,
            dropped = stats.dropped,
            failed = stats.failed,
            "Listener stopped"
        );

        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    /// Spawn the listener as a background task
    pub fn spawn(self) -> JoinHandle<Result<ListenerStats>> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::{MemoryBus, MemoryCatalog};
    use contracts::{MessageBus, PublishColumn, SelectorConfig};
    use dispatcher::{DispatcherSettings, EventDispatcher, Publisher};
    use std::time::Duration;
    use triage::CatalogQueryEngine;

    fn dispatcher(bus: &MemoryBus) -> Arc<EventDispatcher<MemoryBus, MemoryCatalog>> {
        Arc::new(EventDispatcher::new(
            bus.clone(),
            CatalogQueryEngine::new(MemoryCatalog::new(vec![])),
            Publisher::new("bluse:///set", vec![PublishColumn::Ra]),
            DispatcherSettings::from_config(&SelectorConfig::default()),
        ))
    }

    #[tokio::test]
    async fn test_listener_counts_and_stops_on_cancel() {
        let bus = MemoryBus::new();
        let handler = dispatcher(&bus);
        let cancel = CancellationToken::new();
        let sub = bus.subscribe(&["sensor_alerts".to_string()]).unwrap();
        let task = BusListener::new("telemetry", sub, Arc::clone(&handler), cancel.clone()).spawn();

        bus.publish("sensor_alerts", "garbage").await.unwrap();
        bus.publish("sensor_alerts", "array_1:data_suspect:False").await.unwrap();
        bus.publish("alerts", "configure:array_2").await.unwrap();

        // Wait until both telemetry messages have been handled
        for _ in 0..100 {
            if handler.metrics().snapshot().completed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.handled, 1);
        assert!(handler.sessions().contains("array_1"));
        assert!(!handler.sessions().contains("array_2"));
    }

    #[tokio::test]
    async fn test_closed_subscription_cancels_siblings() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe(&["alerts".to_string()]).unwrap();
        sub.unsubscribe().await.unwrap();
        let cancel = CancellationToken::new();

        let err = BusListener::new("control", sub, dispatcher(&bus), cancel.clone())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Closed { ref listener } if listener == "control"));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_closed_subscription_after_cancel_is_clean() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe(&["alerts".to_string()]).unwrap();
        sub.unsubscribe().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = BusListener::new("control", sub, dispatcher(&bus), cancel)
            .run()
            .await
            .unwrap();
        assert_eq!(stats.received, 0);
    }
}
