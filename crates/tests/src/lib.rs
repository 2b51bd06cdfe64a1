//! # Integration Tests
//!
//! End-to-end scenarios across crates, run against the in-memory backends.
//!
//! Covers:
//! - Contract snapshot checks
//! - Bus -> listeners -> dispatcher -> catalog -> publisher flows
//! - Failure injection for an unreachable store and rejected log writes

#[cfg(test)]
mod contract_tests {
    use contracts::{PointingRequest, SelectorConfig};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_config_loads() {
        let config = config_loader::ConfigLoader::load_default().unwrap();
        assert_eq!(config.listeners.len(), 2);
        assert_eq!(config.bus.result_channel, SelectorConfig::default().bus.result_channel);
    }

    #[test]
    fn test_bounding_box_never_misses_beam() {
        // Points on the beam edge at several bearings must fall inside the box
        let pointing = PointingRequest::from_degrees(359.9, 60.0, 0.5);
        let bbox = geometry::bounding_box(pointing.ra, pointing.dec, pointing.beam_radius);
        for step in 0..16 {
            let bearing = step as f64 * std::f64::consts::PI / 8.0;
            let r = pointing.beam_radius * 0.999;
            let dec = (pointing.dec.sin() * r.cos()
                + pointing.dec.cos() * r.sin() * bearing.cos())
            .asin();
            let ra = pointing.ra
                + (bearing.sin() * r.sin() * pointing.dec.cos())
                    .atan2(r.cos() - pointing.dec.sin() * dec.sin());
            let ra = ra.rem_euclid(std::f64::consts::TAU);
            assert!(bbox.contains(ra, dec), "bearing {step} escaped the box");
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use backends::{MemoryBus, MemoryCatalog};
    use contracts::{CatalogSource, MessageBus, SelectorConfig, Subscription};
    use dispatcher::{DispatcherSettings, EventDispatcher, Publisher};
    use ingestion::{Supervisor, SupervisorReport};
    use serde_json::Value;
    use triage::CatalogQueryEngine;

    type Dispatcher = EventDispatcher<MemoryBus, MemoryCatalog>;

    fn source(id: i64, ra: f64, decl: f64) -> CatalogSource {
        CatalogSource {
            source_id: id,
            ra,
            decl,
            project: "survey".into(),
        }
    }

    /// Crab-like field plus one far-away source
    fn crab_catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![
            // Beam centre
            source(1, 83.633, 22.0145),
            // ~0.31 deg away
            source(2, 83.9, 22.2),
            // Inside the bounding box, ~0.61 deg away
            source(4, 84.1, 22.45),
            // Vela
            source(5, 128.836, -45.176),
        ])
    }

    /// Running selector: two listeners over one dispatcher
    struct Harness {
        bus: MemoryBus,
        catalog: MemoryCatalog,
        dispatcher: Arc<Dispatcher>,
        supervisor: Supervisor<Dispatcher>,
    }

    impl Harness {
        fn start(catalog: MemoryCatalog) -> Self {
            let config = SelectorConfig::default();
            let bus = MemoryBus::new();
            let dispatcher = Arc::new(EventDispatcher::new(
                bus.clone(),
                CatalogQueryEngine::new(catalog.clone()),
                Publisher::from_settings(config.bus.result_channel.clone(), &config.triage),
                DispatcherSettings::from_config(&config),
            ));

            let mut supervisor = Supervisor::new(Arc::clone(&dispatcher));
            for listener in &config.listeners {
                let subscription = bus.subscribe(&listener.patterns).unwrap();
                supervisor.spawn_listener(listener.name.clone(), subscription);
            }

            Self {
                bus,
                catalog,
                dispatcher,
                supervisor,
            }
        }

        async fn control(&self, payload: &str) {
            self.bus.publish("alerts", payload).await.unwrap();
        }

        async fn sensor(&self, payload: &str) {
            self.bus.publish("sensor_alerts", payload).await.unwrap();
        }

        /// Wait until the dispatcher has finished `count` messages
        async fn settle(&self, count: u64) {
            for _ in 0..200 {
                if self.dispatcher.metrics().snapshot().completed >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!(
                "dispatcher finished {} of {count} messages",
                self.dispatcher.metrics().snapshot().completed
            );
        }

        /// Keys announced on the result channel
        fn announced(&self) -> Vec<String> {
            self.bus.published_on("bluse:///set")
        }

        async fn stop(self) -> SupervisorReport {
            self.supervisor.shutdown().await
        }
    }

    const CRAB_TARGET: &str = "array_1:target:Crab, radec, 05h34m31.94s, +22d00m52.2s";

    #[tokio::test]
    async fn test_crab_pointing_published_sorted_by_priority() {
        let catalog = crab_catalog();
        // Source 1 already observed: it must come after source 2
        catalog.seed_observed([1]);
        let h = Harness::start(catalog);

        h.control("configure:array_1").await;
        h.settle(1).await;
        h.sensor(CRAB_TARGET).await;
        h.settle(2).await;

        let announced = h.announced();
        assert_eq!(announced, vec!["array_1:pointing_0:targets"]);

        let stored = h.bus.get("array_1:pointing_0:targets").await.unwrap().unwrap();
        let table: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(table["priority"], serde_json::json!([1, 2]));
        assert_eq!(table["ra"], serde_json::json!([83.9, 83.633]));

        let handle = h.dispatcher.sessions().get("array_1").unwrap();
        assert_eq!(handle.lock().await.pointings[0].source_ids(), vec![2, 1]);

        let report = h.stop().await;
        assert!(report.is_clean());
        assert_eq!(report.total_received(), 2);
    }

    #[tokio::test]
    async fn test_result_announced_after_value_stored() {
        let h = Harness::start(crab_catalog());
        let mut results = h.bus.subscribe(&["bluse:///set".to_string()]).unwrap();

        h.sensor(CRAB_TARGET).await;
        let announced = tokio::time::timeout(Duration::from_secs(2), results.next_message())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // The key must already resolve when the announcement is observed
        assert!(h.bus.get(&announced.payload).await.unwrap().is_some());
        h.stop().await;
    }

    #[tokio::test]
    async fn test_deconfigure_unknown_session_is_benign() {
        let h = Harness::start(crab_catalog());
        h.control("deconfigure:never_configured").await;
        h.settle(1).await;

        let snapshot = h.dispatcher.metrics().snapshot();
        assert_eq!(snapshot.failed, 0);
        assert!(h.dispatcher.sessions().is_empty());

        let report = h.stop().await;
        assert!(report.is_clean());
        assert_eq!(report.listeners.iter().map(|s| s.ignored).sum::<u64>(), 1);
    }

    #[tokio::test]
    async fn test_garbage_dropped_and_listener_survives() {
        let h = Harness::start(crab_catalog());
        h.sensor("garbage").await;
        h.sensor(CRAB_TARGET).await;
        h.settle(2).await;

        assert_eq!(h.dispatcher.metrics().snapshot().malformed, 1);
        assert_eq!(h.announced().len(), 1);

        let report = h.stop().await;
        let telemetry = report
            .listeners
            .iter()
            .find(|s| s.listener == "telemetry")
            .unwrap();
        assert_eq!(telemetry.dropped, 1);
        assert_eq!(telemetry.handled, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_both_channels_touch_same_session() {
        let h = Harness::start(crab_catalog());

        // Control and telemetry race on the same session id
        for _ in 0..10 {
            h.control("configure:array_1").await;
            h.sensor(CRAB_TARGET).await;
        }
        h.settle(20).await;

        let handle = h.dispatcher.sessions().get("array_1").unwrap();
        let session = handle.lock().await;
        assert_eq!(session.pointings.len(), 10);
        drop(session);

        // Indices are dense and unique
        let mut keys = h.announced();
        keys.sort();
        let mut expected: Vec<_> = (0..10)
            .map(|i| format!("array_1:pointing_{i}:targets"))
            .collect();
        expected.sort();
        assert_eq!(keys, expected);

        let report = h.stop().await;
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_deconfigure_purges_and_reuse_starts_fresh() {
        let h = Harness::start(crab_catalog());
        h.control("configure:array_1").await;
        h.sensor(CRAB_TARGET).await;
        h.settle(2).await;
        h.bus.set("array_1:pointing_0:processing", "node_3").await.unwrap();

        h.control("deconfigure:array_1").await;
        h.settle(3).await;
        assert!(h.bus.key_snapshot().is_empty());
        assert!(!h.dispatcher.sessions().contains("array_1"));

        h.sensor(CRAB_TARGET).await;
        h.settle(4).await;
        let handle = h.dispatcher.sessions().get("array_1").unwrap();
        let session = handle.lock().await;
        assert_eq!(session.pointings.len(), 1);
        assert!(session.data_suspect);
        drop(session);
        assert_eq!(
            h.bus.key_snapshot(),
            vec!["array_1:pointing_0:targets".to_string()]
        );
        h.stop().await;
    }

    #[tokio::test]
    async fn test_store_unavailable_drops_pointing_without_partial_publish() {
        let catalog = crab_catalog();
        catalog.set_unavailable(true);
        let h = Harness::start(catalog);

        h.sensor(CRAB_TARGET).await;
        h.settle(1).await;
        assert!(h.announced().is_empty());
        assert!(h.bus.key_snapshot().is_empty());
        assert_eq!(h.dispatcher.metrics().snapshot().failed, 1);

        // Recovery: the next pointing goes through under index 0
        h.catalog.set_unavailable(false);
        h.sensor(CRAB_TARGET).await;
        h.settle(2).await;
        let announced = h.announced();
        assert_eq!(announced, vec!["array_1:pointing_0:targets"]);

        let report = h.stop().await;
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_write_rejected_leaves_session_intact() {
        let catalog = crab_catalog();
        catalog.set_reject_writes(true);
        let h = Harness::start(catalog);

        h.sensor("array_1:pool_resources:bluse_1,m001,m002").await;
        h.sensor(CRAB_TARGET).await;
        h.sensor("array_1:data_suspect:False").await;
        h.sensor("array_1:data_suspect:True").await;
        h.settle(4).await;

        assert!(h.catalog.observations().is_empty());
        assert_eq!(h.dispatcher.metrics().snapshot().failed, 1);

        let handle = h.dispatcher.sessions().get("array_1").unwrap();
        let session = handle.lock().await;
        assert_eq!(session.pointings.len(), 1);
        assert_eq!(session.antennas(), vec!["m001", "m002"]);
        assert!(session.observation_end.is_some());
        drop(session);

        let report = h.stop().await;
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_observation_window_and_status_round_trip() {
        let h = Harness::start(crab_catalog());
        h.sensor("array_1:pool_resources:bluse_1,m001").await;
        h.sensor(CRAB_TARGET).await;
        h.sensor("array_1:data_suspect:False").await;
        h.sensor("array_1:data_suspect:True").await;
        h.settle(4).await;

        let rows = h.catalog.observations();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.success.is_none()));
        let start = rows[0].entry.start_time;

        let status = format!(
            r#"array_1:observation_status:{{"source_id": 2, "obs_start_time": "{}", "success": false}}"#,
            start.to_rfc3339()
        );
        h.sensor(&status).await;
        h.settle(5).await;

        let rows = h.catalog.observations();
        let row = rows.iter().find(|r| r.entry.source_id == 2).unwrap();
        assert_eq!(row.success, Some(false));

        // Both sources now count as observed
        let engine = h.dispatcher.engine();
        let pointing = contracts::PointingRequest::from_degrees(83.633, 22.0145, 0.5);
        let targets = engine.select_targets(&pointing).await.unwrap();
        assert!(targets.targets.iter().all(|t| t.priority == geometry::PRIORITY_OBSERVED));
        h.stop().await;
    }
}
