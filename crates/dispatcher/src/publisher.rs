//! Publisher - writes a target set under its key, then announces the key

use contracts::{ContractError, MessageBus, PublishColumn, Target, TargetSet, TriageSettings};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

/// Result key of one pointing: `<session_id>:pointing_<index>:targets`
pub fn targets_key(session_id: &str, index: usize) -> String {
    format!("{session_id}:pointing_{index}:targets")
}

/// Column-oriented view: `{"ra": [...], "decl": [...], "priority": [...]}`
struct ColumnTable<'a> {
    columns: &'a [PublishColumn],
    targets: &'a TargetSet,
}

struct ColumnValues<'a> {
    column: PublishColumn,
    targets: &'a [Target],
}

impl Serialize for ColumnTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for &column in self.columns {
            map.serialize_entry(
                column.name(),
                &ColumnValues {
                    column,
                    targets: &self.targets.targets,
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for ColumnValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.targets.len()))?;
        for target in self.targets {
            match self.column {
                PublishColumn::SourceId => seq.serialize_element(&target.source_id)?,
                PublishColumn::Ra => seq.serialize_element(&target.ra)?,
                PublishColumn::Decl => seq.serialize_element(&target.decl)?,
                PublishColumn::Project => seq.serialize_element(&target.project)?,
                PublishColumn::Priority => seq.serialize_element(&target.priority)?,
            }
        }
        seq.end()
    }
}

/// Formats target sets and writes them to the bus
#[derive(Debug, Clone)]
pub struct Publisher {
    result_channel: String,
    columns: Vec<PublishColumn>,
}

impl Publisher {
    pub fn new(result_channel: impl Into<String>, columns: Vec<PublishColumn>) -> Self {
        Self {
            result_channel: result_channel.into(),
            columns,
        }
    }

    pub fn from_settings(result_channel: impl Into<String>, settings: &TriageSettings) -> Self {
        Self::new(result_channel, settings.publish_columns.clone())
    }

    pub fn result_channel(&self) -> &str {
        &self.result_channel
    }

    /// Payload text for a target set
    pub fn encode(&self, targets: &TargetSet) -> Result<String, ContractError> {
        serde_json::to_string(&ColumnTable {
            columns: &self.columns,
            targets,
        })
        .map_err(|e| ContractError::Other(format!("target set encoding failed: {e}")))
    }

    /// Write the set under its key, then announce the key on the result channel
    ///
    /// Returns the key. The announcement is only sent once the value is stored.
    #[instrument(
        name = "publisher_publish",
        skip(self, bus, targets),
        fields(targets = targets.len())
    )]
    pub async fn publish<B: MessageBus + Sync>(
        &self,
        bus: &B,
        session_id: &str,
        index: usize,
        targets: &TargetSet,
    ) -> Result<String, ContractError> {
        let key = targets_key(session_id, index);
        let payload = self.encode(targets)?;
        bus.set(&key, &payload).await?;
        bus.publish(&self.result_channel, &key).await?;
        debug!(key = %key, channel = %self.result_channel, "Targets published");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::MemoryBus;
    use serde_json::Value;

    fn sample() -> TargetSet {
        TargetSet::new(vec![
            Target {
                source_id: 11,
                ra: 83.633_083,
                decl: 22.014_5,
                project: "A".into(),
                priority: 1,
            },
            Target {
                source_id: 12,
                ra: 83.7,
                decl: 22.1,
                project: "B".into(),
                priority: 2,
            },
        ])
    }

    #[test]
    fn test_encode_column_order() {
        let publisher = Publisher::new(
            "bluse:///set",
            vec![PublishColumn::Ra, PublishColumn::Decl, PublishColumn::Priority],
        );
        let text = publisher.encode(&sample()).unwrap();
        assert!(text.starts_with(r#"{"ra":[83.633083,83.7],"decl":"#));
        assert!(text.ends_with(r#""priority":[1,2]}"#));
    }

    #[test]
    fn test_encode_empty_set() {
        let publisher = Publisher::new("c", vec![PublishColumn::Ra, PublishColumn::SourceId]);
        assert_eq!(
            publisher.encode(&TargetSet::default()).unwrap(),
            r#"{"ra":[],"source_id":[]}"#
        );
    }

    #[tokio::test]
    async fn test_publish_writes_then_announces() {
        let bus = MemoryBus::new();
        let publisher = Publisher::new(
            "bluse:///set",
            vec![
                PublishColumn::SourceId,
                PublishColumn::Ra,
                PublishColumn::Decl,
                PublishColumn::Project,
                PublishColumn::Priority,
            ],
        );
        let targets = sample();

        let key = publisher.publish(&bus, "array_1", 3, &targets).await.unwrap();
        assert_eq!(key, "array_1:pointing_3:targets");

        let announced = bus.published();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].channel, "bluse:///set");
        assert_eq!(announced[0].payload, key);

        // Reading back the announced key yields the same columns
        let stored = bus.get(&announced[0].payload).await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&stored).unwrap();
        let ras: Vec<f64> = value["ra"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(ras, vec![targets.targets[0].ra, targets.targets[1].ra]);
        assert_eq!(value["source_id"], serde_json::json!([11, 12]));
        assert_eq!(value["project"], serde_json::json!(["A", "B"]));
        assert_eq!(value["priority"], serde_json::json!([1, 2]));
    }
}
