//! Inbound message classification
//!
//! Every bus message becomes exactly one `Event`. Control channel payloads are
//! `<action>:<session_id>` (or `<session_id>:<action>`); telemetry payloads are
//! `<session_id>:<sensor_name>[:<value>]`, where the value may itself contain
//! colons.

use contracts::{BusConfig, BusMessage, ContractError};

/// Which handler family a channel feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    Control,
    Telemetry,
    Other,
}

/// Channel names for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    pub control: String,
    pub telemetry: String,
}

impl ChannelMap {
    pub fn new(control: impl Into<String>, telemetry: impl Into<String>) -> Self {
        Self {
            control: control.into(),
            telemetry: telemetry.into(),
        }
    }

    pub fn from_config(bus: &BusConfig) -> Self {
        Self::new(&bus.control_channel, &bus.telemetry_channel)
    }

    pub fn classify(&self, channel: &str) -> ChannelClass {
        if channel == self.control {
            ChannelClass::Control
        } else if channel == self.telemetry {
            ChannelClass::Telemetry
        } else {
            ChannelClass::Other
        }
    }
}

/// Control channel actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Configure,
    Deconfigure,
    CaptureInit,
    CaptureStart,
    CaptureStop,
    CaptureDone,
    ConfComplete,
}

impl ControlAction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "configure" => Self::Configure,
            "deconfigure" => Self::Deconfigure,
            "capture-init" => Self::CaptureInit,
            "capture-start" => Self::CaptureStart,
            "capture-stop" => Self::CaptureStop,
            "capture-done" => Self::CaptureDone,
            "conf_complete" => Self::ConfComplete,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Deconfigure => "deconfigure",
            Self::CaptureInit => "capture-init",
            Self::CaptureStart => "capture-start",
            Self::CaptureStop => "capture-stop",
            Self::CaptureDone => "capture-done",
            Self::ConfComplete => "conf_complete",
        }
    }
}

/// Telemetry sensors the dispatcher acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    DataSuspect,
    PoolResources,
    Target,
    RaRequested,
    DecRequested,
    ScheduleBlocks,
    ObservationStatus,
    Unrecognized,
}

const KNOWN_SENSORS: [(&str, SensorKind); 7] = [
    ("data_suspect", SensorKind::DataSuspect),
    ("pool_resources", SensorKind::PoolResources),
    ("target", SensorKind::Target),
    ("ra_requested", SensorKind::RaRequested),
    ("dec_requested", SensorKind::DecRequested),
    ("schedule_blocks", SensorKind::ScheduleBlocks),
    ("observation_status", SensorKind::ObservationStatus),
];

impl SensorKind {
    /// Match a sensor name exactly or by `_<name>` suffix
    ///
    /// `subarray_1_pool_resources` -> `PoolResources`
    pub fn from_name(name: &str) -> Self {
        if let Some((_, kind)) = KNOWN_SENSORS.iter().find(|(known, _)| *known == name) {
            return *kind;
        }
        KNOWN_SENSORS
            .iter()
            .find(|(known, _)| {
                name.strip_suffix(known)
                    .is_some_and(|prefix| prefix.ends_with('_'))
            })
            .map_or(Self::Unrecognized, |(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        KNOWN_SENSORS
            .iter()
            .find(|(_, kind)| kind == self)
            .map_or("unrecognized", |(name, _)| name)
    }
}

/// One classified bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Control {
        session_id: String,
        action: ControlAction,
    },
    Sensor {
        session_id: String,
        /// Sensor name as sent
        sensor: String,
        kind: SensorKind,
        value: Option<String>,
    },
    /// Unknown channel or control action; handled by the fallback
    Unrecognized { channel: String, payload: String },
}

impl Event {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Control { action, .. } => action.name(),
            Self::Sensor { kind, .. } => kind.name(),
            Self::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Control { session_id, .. } | Self::Sensor { session_id, .. } => {
                Some(session_id)
            }
            Self::Unrecognized { .. } => None,
        }
    }
}

/// Classify a bus message
///
/// # Errors
/// `MalformedMessage` when a control or telemetry payload has fewer than two
/// colon-delimited fields or an empty session id / sensor name.
pub fn parse_event(channels: &ChannelMap, message: &BusMessage) -> Result<Event, ContractError> {
    match channels.classify(&message.channel) {
        ChannelClass::Control => parse_control(&message.channel, &message.payload),
        ChannelClass::Telemetry => parse_sensor(&message.payload),
        ChannelClass::Other => Ok(Event::Unrecognized {
            channel: message.channel.clone(),
            payload: message.payload.clone(),
        }),
    }
}

fn parse_control(channel: &str, payload: &str) -> Result<Event, ContractError> {
    let Some((first, second)) = payload.split_once(':') else {
        return Err(ContractError::malformed(
            payload,
            "expected '<action>:<session_id>'",
        ));
    };
    let (action, session_id) = match (
        ControlAction::from_name(first),
        ControlAction::from_name(second),
    ) {
        (Some(action), _) => (action, second),
        (None, Some(action)) => (action, first),
        (None, None) => {
            return Ok(Event::Unrecognized {
                channel: channel.to_string(),
                payload: payload.to_string(),
            })
        }
    };
    if session_id.is_empty() {
        return Err(ContractError::malformed(payload, "empty session id"));
    }
    Ok(Event::Control {
        session_id: session_id.to_string(),
        action,
    })
}

fn parse_sensor(payload: &str) -> Result<Event, ContractError> {
    let mut fields = payload.splitn(3, ':');
    let session_id = fields.next().unwrap_or_default();
    let Some(sensor) = fields.next() else {
        return Err(ContractError::malformed(
            payload,
            "expected '<session_id>:<sensor_name>[:<value>]'",
        ));
    };
    if session_id.is_empty() || sensor.is_empty() {
        return Err(ContractError::malformed(
            payload,
            "empty session id or sensor name",
        ));
    }
    Ok(Event::Sensor {
        session_id: session_id.to_string(),
        sensor: sensor.to_string(),
        kind: SensorKind::from_name(sensor),
        value: fields.next().map(str::to_string),
    })
}
