//! Per-session state and its transitions

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use contracts::TargetSet;
use regex::Regex;

static ANTENNA_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"m\d{3}").ok());
static PROXY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z ]+_\d").ok());

fn find_all(pattern: &LazyLock<Option<Regex>>, text: &str) -> Vec<String> {
    pattern
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// One writable field of a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionField {
    DataSuspect(bool),
    PoolResources(String),
    /// Requested right ascension (rad)
    RequestedRa(f64),
    /// Requested declination (rad)
    RequestedDec(f64),
    /// Completed pointing result, appended in arrival order
    Pointing(TargetSet),
}

/// Observable effect of applying a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// Nothing beyond the stored value changed
    Stored,
    /// `data_suspect` went true -> false
    ObservationStarted { start: DateTime<Utc> },
    /// `data_suspect` went false -> true
    ObservationEnded {
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    },
    /// Both requested coordinates are now known (rad); the pending pair is cleared
    PositionComplete { ra: f64, dec: f64 },
    /// Pointing stored at `index`
    PointingStored { index: usize },
}

/// State of one subarray session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub data_suspect: bool,
    pub observation_start: Option<DateTime<Utc>>,
    pub observation_end: Option<DateTime<Utc>>,
    pub pool_resources: String,
    pub pointings: Vec<TargetSet>,
    pub pending_ra: Option<f64>,
    pub pending_dec: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Set once the session has left the store; late holders must not write
    pub retired: bool,
}

impl Session {
    /// Fresh session: data suspect, no pointings
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            data_suspect: true,
            observation_start: None,
            observation_end: None,
            pool_resources: String::new(),
            pointings: Vec::new(),
            pending_ra: None,
            pending_dec: None,
            created_at: Utc::now(),
            retired: false,
        }
    }

    pub fn apply(&mut self, field: SessionField) -> FieldChange {
        self.apply_at(field, Utc::now())
    }

    /// Apply a field with an explicit clock reading
    pub fn apply_at(&mut self, field: SessionField, now: DateTime<Utc>) -> FieldChange {
        match field {
            SessionField::DataSuspect(suspect) => match (self.data_suspect, suspect) {
                (true, false) => {
                    self.data_suspect = false;
                    self.observation_start = Some(now);
                    self.observation_end = None;
                    FieldChange::ObservationStarted { start: now }
                }
                (false, true) => {
                    self.data_suspect = true;
                    self.observation_end = Some(now);
                    FieldChange::ObservationEnded {
                        start: self.observation_start,
                        end: now,
                    }
                }
                _ => FieldChange::Stored,
            },
            SessionField::PoolResources(descriptor) => {
                self.pool_resources = descriptor;
                FieldChange::Stored
            }
            SessionField::RequestedRa(ra) => {
                self.pending_ra = Some(ra);
                self.take_position()
            }
            SessionField::RequestedDec(dec) => {
                self.pending_dec = Some(dec);
                self.take_position()
            }
            SessionField::Pointing(targets) => {
                self.pointings.push(targets);
                FieldChange::PointingStored {
                    index: self.pointings.len() - 1,
                }
            }
        }
    }

    fn take_position(&mut self) -> FieldChange {
        match (self.pending_ra, self.pending_dec) {
            (Some(ra), Some(dec)) => {
                self.pending_ra = None;
                self.pending_dec = None;
                FieldChange::PositionComplete { ra, dec }
            }
            _ => FieldChange::Stored,
        }
    }

    /// Index the next stored pointing will get
    pub fn next_pointing_index(&self) -> usize {
        self.pointings.len()
    }

    pub fn latest_pointing(&self) -> Option<&TargetSet> {
        self.pointings.last()
    }

    /// Antenna identifiers (`m` + 3 digits) in the pool descriptor
    pub fn antennas(&self) -> Vec<String> {
        find_all(&ANTENNA_PATTERN, &self.pool_resources)
    }

    /// Proxy process identifiers (`<letters>_<digit>`) in the pool descriptor
    pub fn proxies(&self) -> Vec<String> {
        find_all(&PROXY_PATTERN, &self.pool_resources)
    }

    /// `<session_id>_<start as %Y%m%dT%H%M%SZ>`, once an observation has started
    pub fn file_id(&self) -> Option<String> {
        self.observation_start
            .map(|start| format!("{}_{}", self.session_id, start.format("%Y%m%dT%H%M%SZ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_data_suspect_window() {
        let mut s = Session::new("array_1");
        let t0 = Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2019, 6, 1, 12, 5, 0).unwrap();

        // Already suspect: no change
        assert_eq!(
            s.apply_at(SessionField::DataSuspect(true), t0),
            FieldChange::Stored
        );
        assert_eq!(
            s.apply_at(SessionField::DataSuspect(false), t0),
            FieldChange::ObservationStarted { start: t0 }
        );
        assert_eq!(s.file_id().as_deref(), Some("array_1_20190601T120000Z"));
        assert_eq!(
            s.apply_at(SessionField::DataSuspect(false), t1),
            FieldChange::Stored
        );
        assert_eq!(
            s.apply_at(SessionField::DataSuspect(true), t1),
            FieldChange::ObservationEnded {
                start: Some(t0),
                end: t1
            }
        );
        assert_eq!(s.observation_end, Some(t1));
    }

    #[test]
    fn test_pool_resources_extraction() {
        let mut s = Session::new("array_1");
        s.apply(SessionField::PoolResources(
            "bluse_1,cbf_1,fbfuse_1,m000,m001,m063,sdp_1,tuse_1".into(),
        ));
        assert_eq!(s.antennas(), vec!["m000", "m001", "m063"]);
        assert_eq!(
            s.proxies(),
            vec!["bluse_1", "cbf_1", "fbfuse_1", "sdp_1", "tuse_1"]
        );
    }

    #[test]
    fn test_requested_position_pairs() {
        let mut s = Session::new("array_1");
        assert_eq!(s.apply(SessionField::RequestedRa(1.0)), FieldChange::Stored);
        assert_eq!(
            s.apply(SessionField::RequestedDec(0.5)),
            FieldChange::PositionComplete { ra: 1.0, dec: 0.5 }
        );
        assert_eq!(s.pending_ra, None);
        assert_eq!(s.apply(SessionField::RequestedDec(0.2)), FieldChange::Stored);
    }

    #[test]
    fn test_pointings_keep_arrival_order() {
        let mut s = Session::new("array_1");
        assert_eq!(s.next_pointing_index(), 0);
        assert_eq!(
            s.apply(SessionField::Pointing(TargetSet::default())),
            FieldChange::PointingStored { index: 0 }
        );
        assert_eq!(
            s.apply(SessionField::Pointing(TargetSet::default())),
            FieldChange::PointingStored { index: 1 }
        );
        assert_eq!(s.next_pointing_index(), 2);
        assert!(s.latest_pointing().is_some());
    }
}
