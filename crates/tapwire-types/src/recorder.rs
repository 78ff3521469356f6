//! Event recorder types.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueError};

/// What the event recorder should capture.
///
/// Empty lists mean "everything": all readable input devices, all event
/// types. Type names follow the kernel event classes (`key`, `rel`, `abs`,
/// `syn`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RecorderFilter {
    pub types: Vec<String>,
    pub devices: Vec<String>,
}

fn string_list(value: &Value) -> Result<Vec<String>, ValueError> {
    value
        .as_list()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

impl RecorderFilter {
    /// Decode the `er start` payload: a map with optional `types` and
    /// `devices` string lists. `None` selects everything; unknown keys are
    /// ignored.
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::None => Ok(Self::default()),
            Value::Map(entries) => {
                let mut filter = Self::default();
                for (key, entry) in entries {
                    match key.as_str() {
                        "types" => filter.types = string_list(entry)?,
                        "devices" => filter.devices = string_list(entry)?,
                        _ => {}
                    }
                }
                Ok(filter)
            }
            other => Err(ValueError::Shape {
                expected: "map",
                got: other.kind(),
            }),
        }
    }

    pub fn accepts_type(&self, name: &str) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    pub fn accepts_device(&self, path: &str) -> bool {
        self.devices.is_empty() || self.devices.iter().any(|d| d == path)
    }
}

/// One captured raw input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RecordedEvent {
    pub timestamp_us: i64,
    /// Device node the event was read from.
    pub device: String,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RecordedEvent {
    /// Encode as the `er fetch` tuple shape:
    /// `(timestamp_us, device, type, code, value)`.
    pub fn to_value(&self) -> Value {
        Value::List(vec![
            Value::Int(self.timestamp_us),
            Value::from(self.device.as_str()),
            Value::Int(i64::from(self.event_type)),
            Value::Int(i64::from(self.code)),
            Value::Int(i64::from(self.value)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = RecorderFilter::from_value(&Value::None).unwrap();
        assert!(filter.accepts_type("key"));
        assert!(filter.accepts_device("/dev/input/event0"));
    }

    #[test]
    fn decode_filter_map() {
        let value = Value::Map(vec![
            (
                "types".to_string(),
                Value::List(vec![Value::from("key"), Value::from("abs")]),
            ),
            (
                "devices".to_string(),
                Value::List(vec![Value::from("/dev/input/event3")]),
            ),
            ("ignored".to_string(), Value::Int(1)),
        ]);
        let filter = RecorderFilter::from_value(&value).unwrap();
        assert!(filter.accepts_type("KEY"));
        assert!(!filter.accepts_type("rel"));
        assert!(filter.accepts_device("/dev/input/event3"));
        assert!(!filter.accepts_device("/dev/input/event0"));
    }

    #[test]
    fn non_map_filter_rejected() {
        assert!(RecorderFilter::from_value(&Value::Int(1)).is_err());
        assert!(RecorderFilter::from_value(&Value::Map(vec![(
            "types".to_string(),
            Value::Int(1)
        )]))
        .is_err());
    }

    #[test]
    fn event_tuple_shape() {
        let event = RecordedEvent {
            timestamp_us: 1_000_000,
            device: "/dev/input/event2".to_string(),
            event_type: 1,
            code: 30,
            value: 1,
        };
        assert_eq!(
            event.to_value(),
            Value::List(vec![
                Value::Int(1_000_000),
                Value::from("/dev/input/event2"),
                Value::Int(1),
                Value::Int(30),
                Value::Int(1),
            ])
        );
    }
}
