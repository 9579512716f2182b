//! Declarative table of the metrics read out of a snapshot.
//!
//! Each [`MetricDefinition`] carries a [`Source`] that names the decode kind together with
//! exactly the indexes, scale and code table that kind needs. Catalogs are validated once when
//! they are built; index bounds depend on the device response and stay a runtime concern of
//! the decoder.

use crate::codes::EnumTable;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Category hint passed through to consumers. Not used for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticClass {
    Voltage,
    Current,
    Power,
    Energy,
    Frequency,
    Temperature,
    Battery,
}

impl SemanticClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticClass::Voltage => "voltage",
            SemanticClass::Current => "current",
            SemanticClass::Power => "power",
            SemanticClass::Energy => "energy",
            SemanticClass::Frequency => "frequency",
            SemanticClass::Temperature => "temperature",
            SemanticClass::Battery => "battery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Unsigned { index: usize, scale: f64 },
    Signed16 { index: usize, scale: f64 },
    /// Two registers joined big-endian into one 32-bit value.
    LongPair { high: usize, low: usize, scale: f64 },
    /// Two registers added together, e.g. both PV strings.
    SumPair { a: usize, b: usize, scale: f64 },
    EnumText { index: usize, table: EnumTable },
    BinaryStatus { index: usize },
    InfoField { index: usize },
    ModelLookup { index: usize },
    Firmware,
}

impl Source {
    pub fn scale(&self) -> Option<f64> {
        match self {
            Source::Unsigned { scale, .. }
            | Source::Signed16 { scale, .. }
            | Source::LongPair { scale, .. }
            | Source::SumPair { scale, .. } => Some(*scale),
            _ => None,
        }
    }

    /// Whether this source reads the `Data` register array.
    pub fn reads_registers(&self) -> bool {
        !matches!(
            self,
            Source::InfoField { .. } | Source::ModelLookup { .. } | Source::Firmware
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub class: Option<SemanticClass>,
    #[serde(flatten)]
    pub source: Source,
}

impl MetricDefinition {
    pub fn new(
        key: &str,
        name: &str,
        unit: Option<&str>,
        class: Option<SemanticClass>,
        source: Source,
    ) -> Self {
        MetricDefinition {
            key: key.to_owned(),
            name: name.to_owned(),
            unit: unit.map(str::to_owned),
            class,
            source,
        }
    }
}

#[derive(Debug)]
pub enum CatalogError {
    EmptyKey,
    DuplicateKey(String),
    InvalidScale(String, f64),
    InvalidPair(String),
    Io(String),
    Parse(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::EmptyKey => f.write_str("metric definition with empty key"),
            CatalogError::DuplicateKey(key) => write!(f, "duplicate metric key `{}`", key),
            CatalogError::InvalidScale(key, scale) => {
                write!(f, "metric `{}` has non-positive scale {}", key, scale)
            }
            CatalogError::InvalidPair(key) => {
                write!(f, "metric `{}` uses the same register for both halves", key)
            }
            CatalogError::Io(e) => write!(f, "unable to read catalog: {}", e),
            CatalogError::Parse(e) => write!(f, "unable to parse catalog: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

/* On-disk layout of a versioned catalog */
#[derive(Deserialize)]
struct CatalogFile {
    version: String,
    metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    definitions: Vec<MetricDefinition>,
}

impl Catalog {
    pub fn new(
        version: &str,
        definitions: Vec<MetricDefinition>,
    ) -> Result<Catalog, CatalogError> {
        let mut keys = HashSet::new();

        for def in &definitions {
            if def.key.is_empty() {
                return Err(CatalogError::EmptyKey);
            }
            if !keys.insert(def.key.as_str()) {
                return Err(CatalogError::DuplicateKey(def.key.clone()));
            }
            if let Some(scale) = def.source.scale() {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(CatalogError::InvalidScale(def.key.clone(), scale));
                }
            }
            if let Source::LongPair { high, low, .. } = def.source {
                if high == low {
                    return Err(CatalogError::InvalidPair(def.key.clone()));
                }
            }
        }

        Ok(Catalog {
            version: version.to_owned(),
            definitions,
        })
    }

    pub fn from_json(input: &str) -> Result<Catalog, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(input).map_err(|e| CatalogError::Parse(e.to_string()))?;

        Catalog::new(&file.version, file.metrics)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
        let input = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.as_ref().display(), e)))?;

        let catalog = Catalog::from_json(&input)?;
        log::info!(
            "loaded catalog {} with {} metrics from {}",
            catalog.version,
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, key: &str) -> Option<&MetricDefinition> {
        self.definitions.iter().find(|def| def.key == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The metric holding the inverter operating-state register, if the catalog has one.
    pub fn operating_state(&self) -> Option<&MetricDefinition> {
        self.definitions.iter().find(|def| {
            matches!(
                def.source,
                Source::EnumText {
                    table: EnumTable::OperatingState,
                    ..
                }
            )
        })
    }

    /// Register table of the X3-Hybrid G4 as read over the local API.
    #[rustfmt::skip]
    pub fn builtin() -> Catalog {
        use SemanticClass::*;
        use Source::*;

        let m = MetricDefinition::new;
        let definitions = vec![
            /* AC side, per phase */
            m("acu1", "L1 Voltage", Some("V"), Some(Voltage), Unsigned { index: 0, scale: 0.1 }),
            m("acu2", "L2 Voltage", Some("V"), Some(Voltage), Unsigned { index: 1, scale: 0.1 }),
            m("acu3", "L3 Voltage", Some("V"), Some(Voltage), Unsigned { index: 2, scale: 0.1 }),
            m("aci1", "L1 Current", Some("A"), Some(Current), Signed16 { index: 3, scale: 0.1 }),
            m("aci2", "L2 Current", Some("A"), Some(Current), Signed16 { index: 4, scale: 0.1 }),
            m("aci3", "L3 Current", Some("A"), Some(Current), Signed16 { index: 5, scale: 0.1 }),
            m("acp1", "L1 Power", Some("W"), Some(Power), Signed16 { index: 6, scale: 1.0 }),
            m("acp2", "L2 Power", Some("W"), Some(Power), Signed16 { index: 7, scale: 1.0 }),
            m("acp3", "L3 Power", Some("W"), Some(Power), Signed16 { index: 8, scale: 1.0 }),
            m("ac_power", "Total AC Power", Some("W"), Some(Power), Signed16 { index: 9, scale: 1.0 }),
            m("acf1", "L1 Frequency", Some("Hz"), Some(Frequency), Unsigned { index: 16, scale: 0.01 }),
            m("acf2", "L2 Frequency", Some("Hz"), Some(Frequency), Unsigned { index: 17, scale: 0.01 }),
            m("acf3", "L3 Frequency", Some("Hz"), Some(Frequency), Unsigned { index: 18, scale: 0.01 }),
            /* PV strings */
            m("pv1u", "PV1 Voltage", Some("V"), Some(Voltage), Unsigned { index: 10, scale: 0.1 }),
            m("pv2u", "PV2 Voltage", Some("V"), Some(Voltage), Unsigned { index: 11, scale: 0.1 }),
            m("pv1i", "PV1 Current", Some("A"), Some(Current), Unsigned { index: 12, scale: 0.1 }),
            m("pv2i", "PV2 Current", Some("A"), Some(Current), Unsigned { index: 13, scale: 0.1 }),
            m("pv1p", "PV1 Power", Some("W"), Some(Power), Unsigned { index: 14, scale: 1.0 }),
            m("pv2p", "PV2 Power", Some("W"), Some(Power), Unsigned { index: 15, scale: 1.0 }),
            m("pv_power", "Total PV Power", Some("W"), Some(Power), SumPair { a: 14, b: 15, scale: 1.0 }),
            /* Battery */
            m("battery_voltage", "Battery Voltage", Some("V"), Some(Voltage), Unsigned { index: 39, scale: 0.01 }),
            m("battery_current", "Battery Current", Some("A"), Some(Current), Signed16 { index: 40, scale: 0.01 }),
            m("battery_power", "Battery Power", Some("W"), Some(Power), Signed16 { index: 41, scale: 1.0 }),
            m("battery_soc", "Battery SoC", Some("%"), Some(Battery), Unsigned { index: 103, scale: 1.0 }),
            m("battery_remain", "Battery Remain Energy", Some("kWh"), Some(Energy), Unsigned { index: 106, scale: 0.1 }),
            m("battery_temperature", "Battery Temperature", Some("°C"), Some(Temperature), Unsigned { index: 105, scale: 1.0 }),
            m("battery_bms", "Battery BMS status", None, None, BinaryStatus { index: 45 }),
            /* Grid and house load */
            m("grid_power", "Feed-in Power", Some("W"), Some(Power), Signed16 { index: 34, scale: 1.0 }),
            m("consumption", "Consumption", Some("W"), Some(Power), Signed16 { index: 47, scale: 1.0 }),
            m("energy_total", "Energy total", Some("kWh"), Some(Energy), LongPair { high: 69, low: 68, scale: 0.1 }),
            /* Today */
            m("grid_out_today", "Grid out today", Some("kWh"), Some(Energy), Unsigned { index: 90, scale: 0.01 }),
            m("grid_in_today", "Grid in today", Some("kWh"), Some(Energy), Unsigned { index: 92, scale: 0.01 }),
            m("battery_out_today", "Battery discharge today", Some("kWh"), Some(Energy), Unsigned { index: 78, scale: 0.1 }),
            m("battery_in_today", "Battery charge today", Some("kWh"), Some(Energy), Unsigned { index: 79, scale: 0.1 }),
            m("energy_today", "Energy today", Some("kWh"), Some(Energy), Unsigned { index: 82, scale: 0.1 }),
            m("energy_bat_today", "Energy incl battery today", Some("kWh"), Some(Energy), Unsigned { index: 70, scale: 0.1 }),
            /* Lifetime totals */
            m("solar_total", "Solar energy total", Some("kWh"), Some(Energy), LongPair { high: 81, low: 80, scale: 0.1 }),
            m("grid_out_total", "Grid out total", Some("kWh"), Some(Energy), LongPair { high: 87, low: 86, scale: 0.01 }),
            m("grid_in_total", "Grid in total", Some("kWh"), Some(Energy), LongPair { high: 89, low: 88, scale: 0.01 }),
            m("consumption_total", "Consumption total", Some("kWh"), Some(Energy), Unsigned { index: 88, scale: 0.01 }),
            m("battery_out_total", "Battery discharge total", Some("kWh"), Some(Energy), LongPair { high: 75, low: 74, scale: 0.1 }),
            m("battery_in_total", "Battery charge total", Some("kWh"), Some(Energy), LongPair { high: 77, low: 76, scale: 0.1 }),
            /* Modes and inverter information */
            m("mode", "Battery Operation Mode", None, None, EnumText { index: 168, table: EnumTable::OperatingMode }),
            m("state", "Inverter Operation Mode", None, None, EnumText { index: 19, table: EnumTable::OperatingState }),
            m("type", "Inverter Type", None, None, ModelLookup { index: 1 }),
            m("inverter_sn", "Inverter SN", None, None, InfoField { index: 2 }),
            m("nominal_power", "Inverter Nominal Power", Some("kW"), None, InfoField { index: 0 }),
            m("firmware", "Firmware", None, None, Firmware),
            /* Temperatures */
            m("inverter_temperature_inner", "Inverter Temperature inner", Some("°C"), Some(Temperature), Unsigned { index: 46, scale: 1.0 }),
            m("inverter_temperature", "Inverter Temperature", Some("°C"), Some(Temperature), Unsigned { index: 54, scale: 1.0 }),
        ];

        Catalog {
            version: String::from("x3-hybrid-g4"),
            definitions,
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a MetricDefinition;
    type IntoIter = std::slice::Iter<'a, MetricDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}
