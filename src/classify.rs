//! Presentation hints for decoded readings: state class, device class, entity category, icon.
//!
//! Kept apart from decoding. Everything here is derived from the metric key, its unit, the
//! decoded value and whether the inverter is idle.

use crate::model::DecodedValue;
use serde::Serialize;

const DIAGNOSTIC_KEYS: [&str; 3] = ["firmware", "inverter_sn", "type"];

/// Temperature above which the "hot" icon variant is used.
const HOT_CELSIUS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub state_class: Option<StateClass>,
    pub device_class: Option<&'static str>,
    pub entity_category: Option<EntityCategory>,
    pub icon: Option<String>,
}

fn state_class(unit: Option<&str>) -> Option<StateClass> {
    match unit {
        Some("kWh") => Some(StateClass::TotalIncreasing),
        Some(_) => Some(StateClass::Measurement),
        None => None,
    }
}

fn device_class(unit: Option<&str>) -> Option<&'static str> {
    match unit {
        Some("kWh") => Some("energy"),
        Some("W") => Some("power"),
        _ => None,
    }
}

fn battery_icon(level: f64) -> String {
    /* mdi has no `battery-100`, full battery is plain `battery` */
    let bucket = ((level / 10.0).round() as i64).max(0).min(10) * 10;
    match bucket {
        100 => String::from("mdi:battery"),
        0 => String::from("mdi:battery-outline"),
        b => format!("mdi:battery-{}", b),
    }
}

fn power_icon(key: &str, watts: Option<f64>, idle: bool) -> &'static str {
    let direction = match watts {
        Some(w) if !idle && w > 0.0 => 1,
        Some(w) if !idle && w < 0.0 => -1,
        _ => 0,
    };

    if key.contains("battery") {
        match direction {
            1 => "mdi:battery-charging",
            -1 => "mdi:battery-minus",
            _ => "mdi:battery",
        }
    } else if key.contains("grid") {
        match direction {
            1 => "mdi:transmission-tower-export",
            -1 => "mdi:transmission-tower-import",
            _ => "mdi:transmission-tower",
        }
    } else if key.starts_with("pv") {
        "mdi:solar-power"
    } else {
        "mdi:flash"
    }
}

fn icon(key: &str, unit: Option<&str>, value: Option<&DecodedValue>, idle: bool) -> Option<String> {
    let number = value.and_then(DecodedValue::as_f64);

    if key.contains("soc") {
        let icon = number
            .map(battery_icon)
            .unwrap_or_else(|| String::from("mdi:battery-unknown"));
        return Some(icon);
    }

    match unit {
        Some("W") => Some(String::from(power_icon(key, number, idle))),
        Some("°C") => Some(String::from(match number {
            Some(t) if !idle && t > HOT_CELSIUS => "mdi:thermometer-high",
            _ => "mdi:thermometer",
        })),
        Some("kWh") if key.starts_with("solar") || key.starts_with("pv") => {
            Some(String::from("mdi:solar-power-variant"))
        }
        Some("kWh") => Some(String::from("mdi:lightning-bolt")),
        _ if key == "firmware" => Some(String::from("mdi:chip")),
        _ if key.contains("bms") => Some(String::from(match value.and_then(DecodedValue::as_str) {
            Some("OK") => "mdi:check-circle",
            _ => "mdi:alert-circle",
        })),
        _ => None,
    }
}

pub fn classify(
    key: &str,
    unit: Option<&str>,
    value: Option<&DecodedValue>,
    idle: bool,
) -> Presentation {
    Presentation {
        state_class: state_class(unit),
        device_class: device_class(unit),
        entity_category: if DIAGNOSTIC_KEYS.contains(&key) {
            Some(EntityCategory::Diagnostic)
        } else {
            None
        },
        icon: icon(key, unit, value, idle),
    }
}
