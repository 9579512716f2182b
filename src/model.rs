use crate::catalog::SemanticClass;
use crate::classify::Presentation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;

/// Largest value a single 16-bit register can hold.
pub const REGISTER_MAX: i64 = 65535;

#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub password: String,
    pub client: reqwest::Client,
}

/// One slot of the `Data` array. Anything that is not an integer (`null`, fractions, strings)
/// is kept as `Malformed` so only the metrics reading that slot are lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Register {
    Value(i64),
    Malformed(Value),
}

impl From<i64> for Register {
    fn from(raw: i64) -> Self {
        Register::Value(raw)
    }
}

/// One entry of the `Information` side array: either a number (nominal power, type code,
/// module versions) or an opaque string (serial number). Anything else lands in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Number(n) => write!(f, "{}", n),
            InfoValue::Text(s) => f.write_str(s),
            InfoValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Single poll response. Never mutated after construction; a new poll produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSnapshot {
    pub data: Vec<Register>,
    pub information: Vec<InfoValue>,
    pub firmware: Option<String>,
}

impl RawSnapshot {
    pub fn new(data: Vec<i64>, information: Vec<InfoValue>, firmware: Option<String>) -> Self {
        let data = data.into_iter().map(Register::from).collect();
        RawSnapshot::with_registers(data, information, firmware)
    }

    pub fn with_registers(
        data: Vec<Register>,
        information: Vec<InfoValue>,
        firmware: Option<String>,
    ) -> Self {
        RawSnapshot {
            data,
            information,
            firmware,
        }
    }

    /// Register at `index`, if present, integral and within the 16-bit range.
    pub fn register(&self, index: usize) -> Option<i64> {
        match self.data.get(index) {
            Some(Register::Value(raw)) if (0..=REGISTER_MAX).contains(raw) => Some(*raw),
            _ => None,
        }
    }

    pub fn info(&self, index: usize) -> Option<&InfoValue> {
        self.information.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// Scaled and rounded to two decimal places.
    Number(f64),
    /// Text mapped from a code table.
    Label(String),
    /// Opaque string passed through untouched.
    Text(String),
}

impl DecodedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Label(s) | DecodedValue::Text(s) => Some(s),
            DecodedValue::Number(_) => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Number(n) => write!(f, "{}", n),
            DecodedValue::Label(s) | DecodedValue::Text(s) => f.write_str(s),
        }
    }
}

/// Decoded metric together with the metadata copied from its definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub key: String,
    pub name: String,
    pub unit: Option<String>,
    pub class: Option<SemanticClass>,
    pub value: Option<DecodedValue>,
    pub presentation: Presentation,
}
