//! Turns a [`RawSnapshot`] into decoded values, one metric at a time.
//!
//! Decoding never fails loudly: a missing register, an index past the end of an array or a
//! value of the wrong shape resolves that single metric to `None` and leaves every other
//! metric untouched.

use crate::catalog::{Catalog, MetricDefinition, Source};
use crate::classify;
use crate::codes::{self, InverterModel};
use crate::model::{DecodedValue, InfoValue, RawSnapshot, Reading};

const SIGN_THRESHOLD: i64 = 32767;
const WORD: i64 = 65536;

const STATUS_OK: &str = "OK";
const STATUS_FAULT: &str = "Fault";

/// Round to two decimal places. The only rounding step applied to numeric readings.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reinterpret a 16-bit register as two's complement.
pub fn sign_extend(raw: i64) -> i64 {
    if raw > SIGN_THRESHOLD {
        raw - WORD
    } else {
        raw
    }
}

fn scaled(value: i64, scale: f64) -> DecodedValue {
    DecodedValue::Number(round2(value as f64 * scale))
}

fn info_value(value: &InfoValue) -> Option<DecodedValue> {
    match value {
        InfoValue::Number(n) => Some(DecodedValue::Number(*n)),
        InfoValue::Text(s) => Some(DecodedValue::Text(s.clone())),
        InfoValue::Other(_) => None,
    }
}

/// Integral code held in an `Information` entry.
fn info_code(value: &InfoValue) -> Option<i64> {
    match value {
        InfoValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
        InfoValue::Text(s) => s.trim().parse().ok(),
        InfoValue::Number(_) | InfoValue::Other(_) => None,
    }
}

/// Decode a single metric out of `snapshot`.
pub fn decode(snapshot: &RawSnapshot, def: &MetricDefinition) -> Option<DecodedValue> {
    let value = match def.source {
        Source::Unsigned { index, scale } => snapshot.register(index).map(|raw| scaled(raw, scale)),
        Source::Signed16 { index, scale } => snapshot
            .register(index)
            .map(|raw| scaled(sign_extend(raw), scale)),
        Source::LongPair { high, low, scale } => snapshot
            .register(high)
            .zip(snapshot.register(low))
            .map(|(h, l)| scaled(h * WORD + l, scale)),
        Source::SumPair { a, b, scale } => snapshot
            .register(a)
            .zip(snapshot.register(b))
            .map(|(a, b)| scaled(a + b, scale)),
        Source::EnumText { index, table } => snapshot
            .register(index)
            .map(|raw| DecodedValue::Label(table.label(raw))),
        Source::BinaryStatus { index } => snapshot.register(index).map(|raw| {
            DecodedValue::Label(String::from(if raw == 1 { STATUS_OK } else { STATUS_FAULT }))
        }),
        Source::InfoField { index } => snapshot.info(index).and_then(info_value),
        Source::ModelLookup { index } => snapshot
            .info(index)
            .and_then(info_code)
            .map(|code| DecodedValue::Label(InverterModel::label(code))),
        Source::Firmware => snapshot.firmware.clone().map(DecodedValue::Text),
    };

    if value.is_none() {
        if def.source.reads_registers() && snapshot.data.is_empty() {
            log::trace!("metric {} unavailable, snapshot has no register data", def.key);
        } else {
            log::trace!("metric {} unavailable in current snapshot", def.key);
        }
    }

    value
}

/// Whether the inverter reports one of the idle-like operating states.
///
/// Reads the raw register of the catalog's operating-state metric. Used to tone down
/// presentation of polarity and temperature readings; decoded values are not affected.
pub fn is_idle(catalog: &Catalog, snapshot: &RawSnapshot) -> bool {
    let index = match catalog.operating_state().map(|def| &def.source) {
        Some(Source::EnumText { index, .. }) => *index,
        _ => return false,
    };

    snapshot
        .register(index)
        .map(codes::is_idle_state)
        .unwrap_or(false)
}

/// Decode every metric of `catalog`, in catalog order.
pub fn decode_all(catalog: &Catalog, snapshot: &RawSnapshot) -> Vec<Reading> {
    let idle = is_idle(catalog, snapshot);

    catalog
        .iter()
        .map(|def| {
            let value = decode(snapshot, def);
            let presentation =
                classify::classify(&def.key, def.unit.as_deref(), value.as_ref(), idle);

            Reading {
                key: def.key.clone(),
                name: def.name.clone(),
                unit: def.unit.clone(),
                class: def.class,
                value,
                presentation,
            }
        })
        .collect()
}
