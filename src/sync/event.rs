//! Change events emitted by the Firebase `machines` subscription.
//!
//! Device payloads are loosely typed: numbers sometimes arrive as strings and
//! the leak flag may be a boolean, a number or a string. Parsing here never
//! fails; fields that cannot be read become `None`.

use serde_json::{Map, Value};

/// Key of the sensor sub-object inside a machine node.
pub const SENSOR_DATA_KEY: &str = "sensorData";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A machine node appeared (`child_added`).
    Added,
    /// An existing machine node changed (`child_changed`).
    Changed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Firebase node key, used verbatim as `sensor_data.machine_id`.
    pub machine_id: String,
    pub node: MachineNode,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(kind: ChangeKind, machine_id: impl Into<String>, value: &Value) -> Self {
        Self {
            kind,
            machine_id: machine_id.into(),
            node: MachineNode::from_value(value),
        }
    }

    #[must_use]
    pub fn added(machine_id: impl Into<String>, value: &Value) -> Self {
        Self::new(ChangeKind::Added, machine_id, value)
    }

    #[must_use]
    pub fn changed(machine_id: impl Into<String>, value: &Value) -> Self {
        Self::new(ChangeKind::Changed, machine_id, value)
    }
}

/// A `machines/{id}` node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineNode {
    /// `None` when the node has no `sensorData` or it is `null`.
    pub sensor_data: Option<SensorReading>,
    /// Every other field of the node, untouched.
    pub fields: Map<String, Value>,
}

impl MachineNode {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let mut node = Self::default();
        for (key, field) in map {
            if key == SENSOR_DATA_KEY {
                if !field.is_null() {
                    node.sensor_data = Some(SensorReading::from_value(field));
                }
            } else {
                node.fields.insert(key.clone(), field.clone());
            }
        }
        node
    }
}

/// The `sensorData` object written by a field device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    pub current_weight: Option<f64>,
    pub gas_content_weight: Option<f64>,
    pub gas_leak_detected: bool,
    pub tare_weight: Option<f64>,
    /// Device sampling time in epoch seconds.
    pub timestamp: Option<f64>,
}

impl SensorReading {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            current_weight: number_field(value, "currentWeight"),
            gas_content_weight: number_field(value, "gasContentWeight"),
            gas_leak_detected: value.get("gasLeakDetected").is_some_and(truthy),
            tare_weight: number_field(value, "tareWeight"),
            timestamp: number_field(value, "timestamp"),
        }
    }
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
