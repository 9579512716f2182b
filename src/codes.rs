//! Code tables the inverter reports as plain integers.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Which code table an `enum_text` metric is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumTable {
    OperatingMode,
    OperatingState,
}

impl EnumTable {
    /// Label for `raw`, falling back to `Unknown (<raw>)` for codes missing from the table.
    pub fn label(self, raw: i64) -> String {
        let known = match self {
            EnumTable::OperatingMode => {
                num::FromPrimitive::from_i64(raw).map(|m: OperatingMode| m.to_string())
            }
            EnumTable::OperatingState => {
                num::FromPrimitive::from_i64(raw).map(|s: OperatingState| s.to_string())
            }
        };

        known.unwrap_or_else(|| format!("Unknown ({})", raw))
    }
}

/// Battery operation mode (register 168 on X3-Hybrid G4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum OperatingMode {
    SelfUse = 0,
    ForceTimeUse = 1,
    BackUp = 2,
    FeedInPriority = 3,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingMode::SelfUse => "Self Use Mode",
            OperatingMode::ForceTimeUse => "Force Time Use",
            OperatingMode::BackUp => "Back Up Mode",
            OperatingMode::FeedInPriority => "Feed-in Priority",
        })
    }
}

/// Inverter operating state (register 19 on X3-Hybrid G4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum OperatingState {
    Waiting = 0,
    Checking = 1,
    Normal = 2,
    Off = 3,
    PermanentFault = 4,
    Updating = 5,
    EpsCheck = 6,
    EpsMode = 7,
    SelfTest = 8,
    Idle = 9,
    Standby = 10,
}

impl OperatingState {
    /// States in which the inverter neither converts nor moves energy, so polarity and heat
    /// readings carry no meaning.
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            OperatingState::Waiting
                | OperatingState::Off
                | OperatingState::Idle
                | OperatingState::Standby
        )
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingState::Waiting => "Waiting",
            OperatingState::Checking => "Checking",
            OperatingState::Normal => "Normal",
            OperatingState::Off => "Off",
            OperatingState::PermanentFault => "Permanent Fault",
            OperatingState::Updating => "Updating",
            OperatingState::EpsCheck => "EPS Check",
            OperatingState::EpsMode => "EPS Mode",
            OperatingState::SelfTest => "Self Test",
            OperatingState::Idle => "Idle",
            OperatingState::Standby => "Standby",
        })
    }
}

/// Inverter type code as reported in `Information[1]` and the top-level `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum InverterModel {
    X1Lx = 1,
    XHybrid = 2,
    X1HybridFit = 3,
    X1BoostAirMini = 4,
    X3HybridFit = 5,
    X3Grid20k30k = 6,
    X3MicPro = 7,
    X1Smart = 8,
    X1Ac = 9,
    A1Hybrid = 10,
    A1Fit = 11,
    A1Grid = 12,
    J1Ess = 13,
    X3HybridG4 = 14,
    X1HybridG4 = 15,
    X3MicProG2 = 16,
    X1Spt = 17,
    X1BoostMiniG4 = 18,
}

impl InverterModel {
    /// Model name for `raw`, or `Model <raw>` when the code is not known.
    pub fn label(raw: i64) -> String {
        match num::FromPrimitive::from_i64(raw) {
            Some(model) => {
                let model: InverterModel = model;
                model.to_string()
            }
            None => format!("Model {}", raw),
        }
    }
}

impl fmt::Display for InverterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InverterModel::X1Lx => "X1-LX",
            InverterModel::XHybrid => "X-Hybrid",
            InverterModel::X1HybridFit => "X1-Hybrid/Fit",
            InverterModel::X1BoostAirMini => "X1-Boost/Air/Mini",
            InverterModel::X3HybridFit => "X3-Hybrid/Fit",
            InverterModel::X3Grid20k30k => "X3-20K/30K",
            InverterModel::X3MicPro => "X3-MIC/PRO",
            InverterModel::X1Smart => "X1-Smart",
            InverterModel::X1Ac => "X1-AC",
            InverterModel::A1Hybrid => "A1-Hybrid",
            InverterModel::A1Fit => "A1-Fit",
            InverterModel::A1Grid => "A1-Grid",
            InverterModel::J1Ess => "J1-ESS",
            InverterModel::X3HybridG4 => "X3-Hybrid G4",
            InverterModel::X1HybridG4 => "X1-Hybrid G4",
            InverterModel::X3MicProG2 => "X3-MIC/PRO G2",
            InverterModel::X1Spt => "X1-SPT",
            InverterModel::X1BoostMiniG4 => "X1-Boost/Mini G4",
        })
    }
}

/// Whether the operating-state code `raw` is one of the idle-like states.
pub fn is_idle_state(raw: i64) -> bool {
    num::FromPrimitive::from_i64(raw)
        .map(OperatingState::is_idle)
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn operating_state_labels() {
        assert_eq!("Normal", EnumTable::OperatingState.label(2));
        assert_eq!("EPS Mode", EnumTable::OperatingState.label(7));
        assert_eq!("Unknown (99)", EnumTable::OperatingState.label(99));
    }

    #[test]
    fn operating_mode_labels() {
        assert_eq!("Self Use Mode", EnumTable::OperatingMode.label(0));
        assert_eq!("Feed-in Priority", EnumTable::OperatingMode.label(3));
        assert_eq!("Unknown (4)", EnumTable::OperatingMode.label(4));
    }

    #[test]
    fn model_labels() {
        assert_eq!("X3-Hybrid G4", InverterModel::label(14));
        assert_eq!("Model 42", InverterModel::label(42));
    }

    #[test]
    fn idle_states() {
        assert!(is_idle_state(0));
        assert!(is_idle_state(9));
        assert!(is_idle_state(10));
        assert!(!is_idle_state(2));
        assert!(!is_idle_state(4));
        assert!(!is_idle_state(1234));
    }
}
