//! Simulated smart-home devices and the per-type control action table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Device category. Determines which control actions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    AirConditioner,
    Curtain,
    Speaker,
    Tv,
    Sensor,
    /// Any type tag this console does not know; rendered generically and
    /// offers no controls.
    #[serde(other)]
    Unknown,
}

impl DeviceType {
    pub const ALL: [DeviceType; 6] = [
        DeviceType::Light,
        DeviceType::AirConditioner,
        DeviceType::Curtain,
        DeviceType::Speaker,
        DeviceType::Tv,
        DeviceType::Sensor,
    ];

    /// Wire tag, as used in query parameters.
    pub fn tag(self) -> &'static str {
        match self {
            DeviceType::Light => "light",
            DeviceType::AirConditioner => "air_conditioner",
            DeviceType::Curtain => "curtain",
            DeviceType::Speaker => "speaker",
            DeviceType::Tv => "tv",
            DeviceType::Sensor => "sensor",
            DeviceType::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Display name.
    pub fn label(self) -> &'static str {
        match self {
            DeviceType::Light => "Light",
            DeviceType::AirConditioner => "Air conditioner",
            DeviceType::Curtain => "Curtain",
            DeviceType::Speaker => "Speaker",
            DeviceType::Tv => "TV",
            DeviceType::Sensor => "Sensor",
            DeviceType::Unknown => "Other",
        }
    }

    /// Allowed control actions for this type, in menu order.
    pub fn actions(self) -> &'static [ActionSpec] {
        match self {
            DeviceType::Light => LIGHT_ACTIONS,
            DeviceType::AirConditioner => AC_ACTIONS,
            DeviceType::Curtain => CURTAIN_ACTIONS,
            DeviceType::Speaker => SPEAKER_ACTIONS,
            DeviceType::Tv => TV_ACTIONS,
            DeviceType::Sensor | DeviceType::Unknown => &[],
        }
    }

    pub fn action(self, name: &str) -> Option<&'static ActionSpec> {
        self.actions().iter().find(|a| a.name == name)
    }
}

/// Inclusive numeric bound for a parameterized action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: i64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// One entry in the per-type action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub label: &'static str,
    /// Label of the value input, present only for parameterized actions.
    pub value_label: Option<&'static str>,
    pub range: Option<ValueRange>,
}

impl ActionSpec {
    const fn plain(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value_label: None,
            range: None,
        }
    }

    const fn ranged(
        name: &'static str,
        label: &'static str,
        value_label: &'static str,
        min: i64,
        max: i64,
    ) -> Self {
        Self {
            name,
            label,
            value_label: Some(value_label),
            range: Some(ValueRange::new(min, max)),
        }
    }

    /// Number of value inputs the control dialog shows for this action.
    pub fn value_inputs(&self) -> usize {
        usize::from(self.range.is_some())
    }

    /// Placeholder text for the value input, e.g. `Brightness (0-100)`.
    pub fn placeholder(&self) -> Option<String> {
        match (self.value_label, self.range) {
            (Some(label), Some(r)) => Some(format!("{label} ({}-{})", r.min, r.max)),
            _ => None,
        }
    }

    /// Build a control command, validating the raw value against the range.
    pub fn command(&self, raw_value: &str) -> Result<ControlCommand, ControlError> {
        let Some(range) = self.range else {
            return Ok(ControlCommand {
                action: self.name.to_string(),
                value: None,
            });
        };
        let trimmed = raw_value.trim();
        if trimmed.is_empty() {
            return Err(ControlError::MissingValue {
                action: self.name,
                range,
            });
        }
        let value: i64 = trimmed.parse().map_err(|_| ControlError::NotNumeric {
            action: self.name,
            raw: trimmed.to_string(),
        })?;
        if !range.contains(value) {
            return Err(ControlError::OutOfRange {
                action: self.name,
                value,
                range,
            });
        }
        Ok(ControlCommand {
            action: self.name.to_string(),
            value: Some(serde_json::Value::from(value)),
        })
    }
}

const LIGHT_ACTIONS: &[ActionSpec] = &[
    ActionSpec::plain("turn_on", "Turn on"),
    ActionSpec::plain("turn_off", "Turn off"),
    ActionSpec::ranged("set_brightness", "Set brightness", "Brightness", 0, 100),
];

const AC_ACTIONS: &[ActionSpec] = &[
    ActionSpec::plain("turn_on", "Turn on"),
    ActionSpec::plain("turn_off", "Turn off"),
    ActionSpec::ranged("set_temperature", "Set temperature", "Temperature", 16, 30),
];

const CURTAIN_ACTIONS: &[ActionSpec] = &[
    ActionSpec::plain("open", "Open"),
    ActionSpec::plain("close", "Close"),
    ActionSpec::ranged("set_position", "Set position", "Position", 0, 100),
];

const SPEAKER_ACTIONS: &[ActionSpec] = &[
    ActionSpec::plain("turn_on", "Turn on"),
    ActionSpec::plain("turn_off", "Turn off"),
    ActionSpec::ranged("set_volume", "Set volume", "Volume", 0, 100),
];

const TV_ACTIONS: &[ActionSpec] = &[
    ActionSpec::plain("turn_on", "Turn on"),
    ActionSpec::plain("turn_off", "Turn off"),
    ActionSpec::plain("change_channel", "Change channel"),
];

/// Rejected control input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("{action} requires a value between {} and {}", range.min, range.max)]
    MissingValue {
        action: &'static str,
        range: ValueRange,
    },
    #[error("{action} value must be a number, got '{raw}'")]
    NotNumeric { action: &'static str, raw: String },
    #[error("{action} value {value} is outside {}-{}", range.min, range.max)]
    OutOfRange {
        action: &'static str,
        value: i64,
        range: ValueRange,
    },
}

/// Body for the control endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// A device record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    /// Backend-defined current state (power, brightness, ...).
    #[serde(default)]
    pub state: Option<serde_json::Value>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Create/update payload for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInput {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: Option<DeviceType>,
    pub location: String,
    pub description: String,
    pub is_online: bool,
}

impl Default for DeviceInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            device_type: None,
            location: String::new(),
            description: String::new(),
            is_online: true,
        }
    }
}

impl From<&Device> for DeviceInput {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            // An unrecognized tag cannot be written back; the form asks for one.
            device_type: Some(d.device_type).filter(|t| *t != DeviceType::Unknown),
            location: d.location.clone(),
            description: d.description.clone().unwrap_or_default(),
            is_online: d.is_online,
        }
    }
}

/// Online filter for the device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineFilter {
    Online,
    Offline,
}

impl OnlineFilter {
    pub fn tag(self) -> &'static str {
        match self {
            OnlineFilter::Online => "online",
            OnlineFilter::Offline => "offline",
        }
    }
}

/// Query parameters for `GET /devices`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    pub device_type: Option<DeviceType>,
    pub location: Option<String>,
    pub status: Option<OnlineFilter>,
    pub search: Option<String>,
}

/// `GET /devices/statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatistics {
    #[serde(default)]
    pub total_devices: u64,
    #[serde(default)]
    pub status_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub type_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub location_distribution: BTreeMap<String, u64>,
}

impl DeviceStatistics {
    pub fn online(&self) -> u64 {
        self.status_distribution.get("online").copied().unwrap_or(0)
    }
}
