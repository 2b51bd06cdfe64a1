//! Supervisor - owns the listener tasks and their shared cancellation token

use std::future::Future;
use std::sync::Arc;

use contracts::Subscription;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{IngestionError, Result};
use crate::handler::MessageHandler;
use crate::listener::{BusListener, ListenerStats};

/// Final state of every listener after shutdown
#[derive(Debug, Default)]
pub struct SupervisorReport {
    pub listeners: Vec<ListenerStats>,
    pub failures: Vec<IngestionError>,
}

impl SupervisorReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Messages received across all listeners
    pub fn total_received(&self) -> u64 {
        self.listeners.iter().map(|s| s.received).sum()
    }
}

/// Runs N listeners against one shared handler
///
/// Cancelling the token stops every listener; each finishes its in-flight
/// message and releases its subscription.
pub struct Supervisor<H> {
    handler: Arc<H>,
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<Result<ListenerStats>>)>,
}

impl<H: MessageHandler> Supervisor<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Token shared by all listeners of this supervisor
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Start a listener on its own task
    pub fn spawn_listener<Sub>(&mut self, name: impl Into<String>, subscription: Sub)
    where
        Sub: Subscription + Send + 'static,
    {
        let name = name.into();
        let listener = BusListener::new(
            name.clone(),
            subscription,
            Arc::clone(&self.handler),
            self.cancel.clone(),
        );
        self.tasks.push((name, listener.spawn()));
    }

    pub fn listener_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run until `shutdown` resolves or a listener cancels the token, then join
    pub async fn run_until<F>(self, shutdown: F) -> SupervisorReport
    where
        F: Future<Output = ()>,
    {
        info!(listeners = self.tasks.len(), "Supervisor running");
        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = self.cancel.cancelled() => warn!("Listener requested shutdown"),
        }
        self.shutdown().await
    }

    /// Cancel every listener and wait for them to stop
    pub async fn shutdown(self) -> SupervisorReport {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for every listener to stop without cancelling
    pub async fn join(self) -> SupervisorReport {
        let mut report = SupervisorReport::default();
        for (name, task) in self.tasks {
            match task.await {
                Ok(Ok(stats)) => report.listeners.push(stats),
                Ok(Err(err)) => {
                    error!(listener = %name, error = %err, "Listener failed");
                    report.failures.push(err);
                }
                Err(join_err) => {
                    error!(listener = %name, error = %join_err, "Listener task aborted");
                    report.failures.push(IngestionError::TaskFailed {
                        listener: name,
                        message: join_err.to_string(),
                    });
                }
            }
        }
        info!(
            stopped = report.listeners.len(),
            failed = report.failures.len(),
            "Supervisor stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::{MemoryBus, MemoryCatalog};
    use contracts::{BusMessage, ContractError, MessageBus, SelectorConfig};
    use dispatcher::{DispatcherSettings, EventDispatcher, Publisher};
    use std::time::Duration;
    use triage::CatalogQueryEngine;

    fn dispatcher(bus: &MemoryBus) -> Arc<EventDispatcher<MemoryBus, MemoryCatalog>> {
        let config = SelectorConfig::default();
        Arc::new(EventDispatcher::new(
            bus.clone(),
            CatalogQueryEngine::new(MemoryCatalog::new(vec![])),
            Publisher::from_settings(config.bus.result_channel.clone(), &config.triage),
            DispatcherSettings::from_config(&config),
        ))
    }

    /// Subscription that fails on the first receive
    struct BrokenSubscription {
        patterns: Vec<String>,
    }

    impl Subscription for BrokenSubscription {
        fn patterns(&self) -> &[String] {
            &self.patterns
        }

        async fn next_message(&mut self) -> std::result::Result<Option<BusMessage>, ContractError> {
            Err(ContractError::bus_unavailable("connection reset"))
        }

        async fn unsubscribe(&mut self) -> std::result::Result<(), ContractError> {
            Ok(())
        }
    }

    /// Subscription the bus has already ended
    struct EndedSubscription {
        patterns: Vec<String>,
    }

    impl Subscription for EndedSubscription {
        fn patterns(&self) -> &[String] {
            &self.patterns
        }

        async fn next_message(&mut self) -> std::result::Result<Option<BusMessage>, ContractError> {
            Ok(None)
        }

        async fn unsubscribe(&mut self) -> std::result::Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_two_listeners_share_one_dispatcher() {
        let bus = MemoryBus::new();
        let handler = dispatcher(&bus);
        let mut supervisor = Supervisor::new(Arc::clone(&handler));
        supervisor.spawn_listener("control", bus.subscribe(&["alerts".to_string()]).unwrap());
        supervisor.spawn_listener(
            "telemetry",
            bus.subscribe(&["sensor_alerts".to_string()]).unwrap(),
        );
        assert_eq!(supervisor.listener_count(), 2);

        bus.publish("alerts", "configure:array_1").await.unwrap();
        bus.publish("sensor_alerts", "array_1:pool_resources:m001,m002")
            .await
            .unwrap();

        for _ in 0..100 {
            if handler.metrics().snapshot().completed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let report = supervisor.shutdown().await;
        assert!(report.is_clean());
        assert_eq!(report.listeners.len(), 2);
        assert_eq!(report.total_received(), 2);

        let session = handler.sessions().get("array_1").unwrap();
        assert_eq!(session.lock().await.pool_resources, "m001,m002");
    }

    #[tokio::test]
    async fn test_receive_error_stops_all_listeners() {
        let bus = MemoryBus::new();
        let mut supervisor = Supervisor::new(dispatcher(&bus));
        supervisor.spawn_listener("control", bus.subscribe(&["alerts".to_string()]).unwrap());
        supervisor.spawn_listener(
            "telemetry",
            BrokenSubscription {
                patterns: vec!["sensor_alerts".into()],
            },
        );

        let report = tokio::time::timeout(
            Duration::from_secs(2),
            supervisor.run_until(std::future::pending()),
        )
        .await
        .unwrap();

        assert_eq!(report.listeners.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            IngestionError::Receive { listener, .. } if listener == "telemetry"
        ));
    }

    #[tokio::test]
    async fn test_ended_subscription_stops_supervisor() {
        let bus = MemoryBus::new();
        let mut supervisor = Supervisor::new(dispatcher(&bus));
        supervisor.spawn_listener("control", bus.subscribe(&["alerts".to_string()]).unwrap());
        supervisor.spawn_listener(
            "telemetry",
            EndedSubscription {
                patterns: vec!["sensor_alerts".into()],
            },
        );

        let report = tokio::time::timeout(
            Duration::from_secs(2),
            supervisor.run_until(std::future::pending()),
        )
        .await
        .expect("supervisor kept running after a subscription ended");

        assert!(!report.is_clean());
        assert_eq!(report.listeners.len(), 1);
        assert!(matches!(
            &report.failures[0],
            IngestionError::Closed { listener } if listener == "telemetry"
        ));
    }

    #[tokio::test]
    async fn test_run_until_returns_on_shutdown_signal() {
        let bus = MemoryBus::new();
        let handler = dispatcher(&bus);
        let mut supervisor = Supervisor::new(Arc::clone(&handler));
        supervisor.spawn_listener("control", bus.subscribe(&["alerts".to_string()]).unwrap());

        let report = supervisor
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert!(report.is_clean());
        assert_eq!(report.listeners[0].listener, "control");

        // Nothing listens any more
        bus.publish("alerts", "configure:array_1").await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(handler.metrics().snapshot().received, 0);
    }
}
