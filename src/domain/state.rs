// Item state domain model
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnOff {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpenClosed {
    Open,
    Closed,
}

/// A persisted state value. Serialized untagged for chart output; inbound
/// values go through [`StateValue::parse`] against the item's accepted kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    OnOff(OnOff),
    OpenClosed(OpenClosed),
    Decimal(f64),
    Text(String),
    Undefined,
}

/// The variant of a [`StateValue`], used to describe what an item accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    OnOff,
    OpenClosed,
    Decimal,
    Text,
    Undefined,
}

impl StateValue {
    pub fn kind(&self) -> StateKind {
        match self {
            StateValue::OnOff(_) => StateKind::OnOff,
            StateValue::OpenClosed(_) => StateKind::OpenClosed,
            StateValue::Decimal(_) => StateKind::Decimal,
            StateValue::Text(_) => StateKind::Text,
            StateValue::Undefined => StateKind::Undefined,
        }
    }

    /// Two-valued discrete states are charted as steps rather than slopes.
    pub fn is_binary(&self) -> bool {
        matches!(self, StateValue::OnOff(_) | StateValue::OpenClosed(_))
    }

    /// Parse a raw value, trying each accepted kind in order.
    pub fn parse(raw: &str, accepted: &[StateKind]) -> Option<StateValue> {
        accepted.iter().find_map(|kind| kind.parse(raw))
    }
}

impl StateKind {
    pub fn parse(self, raw: &str) -> Option<StateValue> {
        let trimmed = raw.trim();
        match self {
            StateKind::OnOff => match trimmed.to_ascii_uppercase().as_str() {
                "ON" => Some(StateValue::OnOff(OnOff::On)),
                "OFF" => Some(StateValue::OnOff(OnOff::Off)),
                _ => None,
            },
            StateKind::OpenClosed => match trimmed.to_ascii_uppercase().as_str() {
                "OPEN" => Some(StateValue::OpenClosed(OpenClosed::Open)),
                "CLOSED" => Some(StateValue::OpenClosed(OpenClosed::Closed)),
                _ => None,
            },
            StateKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(StateValue::Decimal),
            StateKind::Text => Some(StateValue::Text(raw.to_string())),
            StateKind::Undefined => match trimmed {
                "UNDEF" | "NULL" => Some(StateValue::Undefined),
                _ => None,
            },
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::OnOff(OnOff::On) => write!(f, "ON"),
            StateValue::OnOff(OnOff::Off) => write!(f, "OFF"),
            StateValue::OpenClosed(OpenClosed::Open) => write!(f, "OPEN"),
            StateValue::OpenClosed(OpenClosed::Closed) => write!(f, "CLOSED"),
            StateValue::Decimal(v) => write!(f, "{}", v),
            StateValue::Text(s) => write!(f, "{}", s),
            StateValue::Undefined => write!(f, "UNDEF"),
        }
    }
}

/// Item types known to the item model, and the states they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Switch,
    Contact,
    Number,
    String,
}

impl ItemType {
    pub fn accepted_state_kinds(self) -> &'static [StateKind] {
        match self {
            ItemType::Switch => &[StateKind::Undefined, StateKind::OnOff],
            ItemType::Contact => &[StateKind::Undefined, StateKind::OpenClosed],
            ItemType::Number => &[StateKind::Undefined, StateKind::Decimal],
            ItemType::String => &[StateKind::Undefined, StateKind::Text],
        }
    }
}
