//! EventDispatcher - classifies bus messages and drives session state

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use contracts::{
    BusMessage, CatalogStore, MessageBus, ObservationStatus, PointingRequest, SelectorConfig,
};
use geometry::{parse_declination, parse_right_ascension, parse_target_coordinates};
use session_store::{FieldChange, Session, SessionField, SessionStore};
use tracing::{debug, error, info, instrument, warn};
use triage::{CatalogQueryEngine, HistoryPriority, ObservationRecord, PriorityScorer};

use crate::error::{DispatcherError, Result};
use crate::message::{parse_event, ChannelMap, ControlAction, Event, SensorKind};
use crate::metrics::DispatchMetrics;
use crate::publisher::Publisher;
use crate::schedule;

/// Session-independent dispatch settings
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub channels: ChannelMap,
    /// Beam radius (rad)
    pub beam_radius: f64,
    /// Band recorded in the observation log
    pub bands: String,
    /// Mode recorded in the observation log
    pub mode: i32,
}

impl DispatcherSettings {
    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            channels: ChannelMap::from_config(&config.bus),
            beam_radius: config.triage.beam_radius_rad(),
            bands: config.triage.bands.clone(),
            mode: config.triage.mode,
        }
    }
}

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// State changed or results were published
    Handled,
    /// Accepted, intentionally no effect
    Ignored,
    /// Malformed, dropped before dispatch
    Dropped,
    /// Handling failed; logged, listener keeps running
    Failed,
}

/// Routes events to handlers, serializing work per session
///
/// Shared by all listener tasks behind an `Arc`.
pub struct EventDispatcher<B, S, P = HistoryPriority> {
    bus: B,
    engine: CatalogQueryEngine<S, P>,
    sessions: Arc<SessionStore>,
    publisher: Publisher,
    settings: DispatcherSettings,
    metrics: Arc<DispatchMetrics>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "1" => Some(true),
        "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl<B, S, P> EventDispatcher<B, S, P>
where
    B: MessageBus + Sync,
    S: CatalogStore + Sync,
    P: PriorityScorer,
{
    pub fn new(
        bus: B,
        engine: CatalogQueryEngine<S, P>,
        publisher: Publisher,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            bus,
            engine,
            sessions: Arc::new(SessionStore::new()),
            publisher,
            settings,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Use an existing session store
    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn engine(&self) -> &CatalogQueryEngine<S, P> {
        &self.engine
    }

    /// Handle one bus message
    ///
    /// Never fails: malformed messages are dropped with a warning and handler
    /// failures are logged with the raw message, so the calling listener
    /// survives any single message.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, message),
        fields(channel = %message.channel)
    )]
    pub async fn dispatch(&self, listener: &str, message: &BusMessage) -> DispatchOutcome {
        self.metrics.inc_received();
        let outcome = self.route(listener, message).await;
        self.metrics.inc_completed();
        outcome
    }

    async fn route(&self, listener: &str, message: &BusMessage) -> DispatchOutcome {
        let event = match parse_event(&self.settings.channels, message) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    listener,
                    channel = %message.channel,
                    raw = %message.payload,
                    error = %err,
                    "Malformed message dropped"
                );
                self.metrics.inc_malformed();
                observability::record_malformed_message(listener);
                return DispatchOutcome::Dropped;
            }
        };
        observability::record_event(listener, event.label());

        match self.handle_event(&event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.metrics.inc_failed();
                error!(
                    listener,
                    session_id = event.session_id().unwrap_or_default(),
                    sensor = event.label(),
                    raw = %message.payload,
                    error = %err,
                    "Event handling failed"
                );
                DispatchOutcome::Failed
            }
        }
    }

    async fn handle_event(&self, event: &Event) -> Result<DispatchOutcome> {
        match event {
            Event::Control { session_id, action } => self.handle_control(session_id, *action).await,
            Event::Sensor {
                session_id,
                sensor,
                kind,
                value,
            } => {
                self.handle_sensor(session_id, sensor, *kind, value.as_deref())
                    .await
            }
            Event::Unrecognized { channel, payload } => {
                self.metrics.inc_unrecognized();
                info!(channel = %channel, raw = %payload, "Unrecognized channel or action");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn handle_control(
        &self,
        session_id: &str,
        action: ControlAction,
    ) -> Result<DispatchOutcome> {
        match action {
            ControlAction::Configure => {
                self.sessions.get_or_create(session_id);
                info!(session_id, "Session configured");
                Ok(DispatchOutcome::Handled)
            }
            ControlAction::Deconfigure => self.deconfigure(session_id).await,
            ControlAction::CaptureInit
            | ControlAction::CaptureStart
            | ControlAction::CaptureStop
            | ControlAction::CaptureDone
            | ControlAction::ConfComplete => {
                debug!(session_id, action = action.name(), "Capture marker accepted");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    /// Drop the session, then purge its result keys under the session lock
    ///
    /// The registry entry goes first so no new handle can be taken. A sensor
    /// handler already holding the old handle finds it retired and stops.
    async fn deconfigure(&self, session_id: &str) -> Result<DispatchOutcome> {
        let handle = self.sessions.remove(session_id);
        let mut guard = match &handle {
            Some(h) => Some(h.lock().await),
            None => None,
        };

        let mut removed = 0usize;
        for field in ["processing", "targets"] {
            let pattern = format!("{session_id}:*:{field}");
            for key in self.bus.keys(&pattern).await? {
                if self.bus.delete(&key).await? {
                    removed += 1;
                    info!(session_id, key = %key, "Deconfigure: removed key");
                }
            }
        }

        match guard.as_deref_mut() {
            Some(session) => {
                session.retired = true;
                info!(
                    session_id,
                    pointings = session.pointings.len(),
                    keys_removed = removed,
                    "Session deconfigured"
                );
                Ok(DispatchOutcome::Handled)
            }
            None => {
                info!(
                    session_id,
                    keys_removed = removed,
                    "Deconfigure received before configure"
                );
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn handle_sensor(
        &self,
        session_id: &str,
        sensor: &str,
        kind: SensorKind,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        if !self.sessions.contains(session_id) {
            info!(session_id, sensor, "Sensor event for unconfigured session, configuring");
        }
        let handle = self.sessions.get_or_create(session_id);
        let mut guard = handle.lock().await;
        if guard.retired {
            debug!(session_id, sensor, "Session deconfigured while event waited, ignored");
            return Ok(DispatchOutcome::Ignored);
        }
        let session = &mut *guard;

        match kind {
            SensorKind::DataSuspect => self.on_data_suspect(session, sensor, value).await,
            SensorKind::PoolResources => self.on_pool_resources(session, sensor, value).await,
            SensorKind::Target => self.on_target(session, sensor, value).await,
            SensorKind::RaRequested | SensorKind::DecRequested => {
                self.on_requested(session, sensor, kind, value).await
            }
            SensorKind::ScheduleBlocks => self.on_schedule_blocks(session, sensor, value).await,
            SensorKind::ObservationStatus => self.on_observation_status(sensor, value).await,
            SensorKind::Unrecognized => {
                self.metrics.inc_unrecognized();
                info!(session_id, sensor, "Unrecognized sensor, ignored");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn on_data_suspect(
        &self,
        session: &mut Session,
        sensor: &str,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let raw = value.ok_or_else(|| DispatcherError::missing_value(sensor))?;
        let suspect = parse_flag(raw)
            .ok_or_else(|| DispatcherError::invalid_value(sensor, raw, "expected True or False"))?;

        match session.apply(SessionField::DataSuspect(suspect)) {
            FieldChange::ObservationStarted { start } => {
                info!(session_id = %session.session_id, start = %start, "Observation window opened");
                Ok(DispatchOutcome::Handled)
            }
            FieldChange::ObservationEnded { start, end } => {
                info!(session_id = %session.session_id, end = %end, "Observation window closed");
                self.record_window(session, start, end).await
            }
            _ => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Log the most recent pointing against the closed observation window
    async fn record_window(
        &self,
        session: &Session,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<DispatchOutcome> {
        let session_id = session.session_id.as_str();
        let Some(start) = start else {
            warn!(session_id, "Observation ended without a recorded start, nothing logged");
            return Ok(DispatchOutcome::Handled);
        };
        let Some(targets) = session.latest_pointing() else {
            info!(session_id, "Observation ended before any pointing, nothing logged");
            return Ok(DispatchOutcome::Handled);
        };

        let record = ObservationRecord {
            start_time: start,
            end_time: end,
            proxies: session.proxies(),
            antennas: session.antennas(),
            file_id: session.file_id().unwrap_or_default(),
            bands: self.settings.bands.clone(),
            mode: self.settings.mode,
        };
        let rows = self.engine.record_observation(targets, &record).await?;
        self.metrics.add_observation_rows(rows);
        observability::record_observations_logged(rows);
        info!(session_id, rows, file_id = %record.file_id, "Observation logged");
        Ok(DispatchOutcome::Handled)
    }

    async fn on_pool_resources(
        &self,
        session: &mut Session,
        sensor: &str,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let descriptor = match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                let key = format!("{}:{sensor}", session.session_id);
                self.bus
                    .get(&key)
                    .await?
                    .ok_or_else(|| DispatcherError::missing_value(sensor))?
            }
        };
        session.apply(SessionField::PoolResources(descriptor));
        debug!(
            session_id = %session.session_id,
            antennas = session.antennas().len(),
            proxies = session.proxies().len(),
            "Pool resources stored"
        );
        Ok(DispatchOutcome::Handled)
    }

    async fn on_target(
        &self,
        session: &mut Session,
        sensor: &str,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let raw = value.ok_or_else(|| DispatcherError::missing_value(sensor))?;
        if raw.trim() == "unavailable" {
            debug!(session_id = %session.session_id, "Target unavailable, ignored");
            return Ok(DispatchOutcome::Ignored);
        }
        let (ra, dec) = parse_target_coordinates(raw)?;
        let index = session.next_pointing_index();
        self.process_pointing(session, ra, dec, index).await
    }

    async fn on_requested(
        &self,
        session: &mut Session,
        sensor: &str,
        kind: SensorKind,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let raw = value.ok_or_else(|| DispatcherError::missing_value(sensor))?;
        let field = if kind == SensorKind::RaRequested {
            SessionField::RequestedRa(parse_right_ascension(raw)?)
        } else {
            SessionField::RequestedDec(parse_declination(raw)?)
        };

        match session.apply(field) {
            FieldChange::PositionComplete { ra, dec } => {
                let index = session.next_pointing_index();
                self.process_pointing(session, ra, dec, index).await
            }
            _ => Ok(DispatchOutcome::Handled),
        }
    }

    async fn on_schedule_blocks(
        &self,
        session: &mut Session,
        sensor: &str,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let text = match value {
            Some(v) if schedule::looks_inline(v) => v.to_string(),
            other => {
                let key = match other {
                    Some(v) if !v.is_empty() => v.to_string(),
                    _ => format!("{}:{sensor}", session.session_id),
                };
                self.bus
                    .get(&key)
                    .await?
                    .ok_or_else(|| DispatcherError::missing_value(sensor))?
            }
        };

        let started = Instant::now();
        let descriptions = schedule::target_descriptions(&text)?;
        let mut processed = 0usize;
        let mut failed = 0usize;

        for (index, description) in descriptions.iter().enumerate() {
            let outcome = match parse_target_coordinates(description) {
                Ok((ra, dec)) => self.process_pointing(session, ra, dec, index).await,
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(_) => processed += 1,
                Err(err) => {
                    failed += 1;
                    self.metrics.inc_failed();
                    error!(
                        session_id = %session.session_id,
                        sensor,
                        pointing = index,
                        target = %description,
                        error = %err,
                        "Schedule block pointing failed"
                    );
                }
            }
        }

        info!(
            session_id = %session.session_id,
            pointings = processed,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Schedule block processed"
        );
        Ok(DispatchOutcome::Handled)
    }

    async fn on_observation_status(
        &self,
        sensor: &str,
        value: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let raw = value.ok_or_else(|| DispatcherError::missing_value(sensor))?;
        let status: ObservationStatus = schedule::load_block(raw)
            .map_err(|e| DispatcherError::invalid_value(sensor, raw, e.to_string()))?;

        if !status.success {
            debug!(source_id = status.source_id, "Unsuccessful observation status not recorded");
            return Ok(DispatchOutcome::Ignored);
        }
        self.engine
            .update_observation_status(status.source_id, status.obs_start_time, true)
            .await?;
        Ok(DispatchOutcome::Handled)
    }

    /// Query, store and publish one pointing under `pointing_<index>`
    ///
    /// A failed query leaves the session untouched and publishes nothing.
    async fn process_pointing(
        &self,
        session: &mut Session,
        ra: f64,
        dec: f64,
        index: usize,
    ) -> Result<DispatchOutcome> {
        let started = Instant::now();
        let pointing = PointingRequest::new(ra, dec, self.settings.beam_radius);
        let targets = self.engine.select_targets(&pointing).await?;
        let count = targets.len();

        session.apply(SessionField::Pointing(targets.clone()));

        let published = self
            .publisher
            .publish(&self.bus, &session.session_id, index, &targets)
            .await;
        observability::record_publish(published.is_ok());
        let key = published?;

        self.metrics
            .record_pointing(count, started.elapsed().as_secs_f64() * 1000.0);
        if count == 0 {
            info!(session_id = %session.session_id, key = %key, "No catalog sources inside beam");
        } else {
            info!(session_id = %session.session_id, key = %key, targets = count, "Pointing published");
        }
        Ok(DispatchOutcome::Handled)
    }
}
