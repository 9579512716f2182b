use prometheus::{Encoder, Gauge, GaugeVec, TextEncoder};
use solax_local_rs::{decode_all, is_idle, Catalog, DecodedValue, Error, RawSnapshot};
use std::sync::Mutex;

lazy_static! {
    static ref READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("solax_reading", "numeric reading decoded from inverter registers",),
        &["key", "name", "unit", "class"],
    )
    .unwrap();
    static ref LABEL_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "solax_label",
            "text reading decoded from inverter registers, value carried in `value` label",
        ),
        &["key", "name", "value"],
    )
    .unwrap();
    static ref UP_GAUGE: Gauge = register_gauge!(opts!(
        "solax_up",
        "1 if the most recent poll of the inverter succeeded",
    ))
    .unwrap();
    static ref IDLE_GAUGE: Gauge = register_gauge!(opts!(
        "solax_inverter_idle",
        "1 if the inverter reports an idle-like operating state",
    ))
    .unwrap();
    /// Serialises reset, refill and gather across concurrent scrapes.
    static ref SCRAPE_LOCK: Mutex<()> = Mutex::new(());
}

/// Refresh every series from `snapshot` and encode the registry, as one step.
///
/// Without a snapshot only availability is reported and previous readings stay untouched.
pub fn render(
    catalog: &Catalog,
    snapshot: Option<&RawSnapshot>,
    available: bool,
) -> Result<String, Error> {
    let _guard = SCRAPE_LOCK.lock().or(Err(Error::InternalError))?;

    set_available(available);
    match snapshot {
        Some(snapshot) => update(catalog, snapshot),
        None => log::info!("no snapshot yet; reporting availability only"),
    }
    read()
}

/// Mark inverter as reachable or unreachable without touching the last decoded readings.
fn set_available(available: bool) {
    UP_GAUGE.set(if available { 1.0 } else { 0.0 });
}

/// Decode `snapshot` against `catalog` and replace all reading series with the result.
/// Readings absent from the snapshot lose their series.
fn update(catalog: &Catalog, snapshot: &RawSnapshot) {
    READING_GAUGE.reset();
    LABEL_GAUGE.reset();

    for reading in decode_all(catalog, snapshot) {
        match &reading.value {
            Some(DecodedValue::Number(n)) => {
                READING_GAUGE
                    .with_label_values(&[
                        reading.key.as_str(),
                        reading.name.as_str(),
                        reading.unit.as_deref().unwrap_or(""),
                        reading.class.map(|c| c.as_str()).unwrap_or(""),
                    ])
                    .set(*n);
            }
            Some(DecodedValue::Label(s)) | Some(DecodedValue::Text(s)) => {
                LABEL_GAUGE
                    .with_label_values(&[reading.key.as_str(), reading.name.as_str(), s.as_str()])
                    .set(1.0);
            }
            None => {
                log::trace!("no value for {}, series dropped", reading.key);
            }
        }
    }

    IDLE_GAUGE.set(if is_idle(catalog, snapshot) { 1.0 } else { 0.0 });
}

/// Read metrics from Prometheus exporter registry.
fn read() -> Result<String, Error> {
    // Gather the metrics.
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(Error::FormatError))?;
    String::from_utf8(buffer).or(Err(Error::FormatError))
}

#[cfg(test)]
mod test {
    use super::render;
    use solax_local_rs::{Catalog, RawSnapshot};
    use std::sync::Arc;
    use std::thread;

    const VOLTAGE_SERIES: &str = "solax_reading{class=\"voltage\",key=\"acu1\"";

    #[test]
    fn concurrent_scrapes_see_complete_series() {
        let catalog = Arc::new(Catalog::builtin());
        let mut data = vec![0; 200];
        data[0] = 2301;
        data[19] = 2;
        let snapshot = Arc::new(RawSnapshot::new(data, vec![], None));

        let scrapes: Vec<_> = (0..8)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let snapshot = Arc::clone(&snapshot);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| render(&catalog, Some(&*snapshot), true).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for scrape in scrapes {
            for output in scrape.join().unwrap() {
                assert!(output.contains(VOLTAGE_SERIES), "series missing:\n{}", output);
                assert!(output.contains("solax_up 1"));
            }
        }

        let without_voltage = RawSnapshot::new(vec![], vec![], None);
        let output = render(&catalog, Some(&without_voltage), false).unwrap();
        assert!(!output.contains(VOLTAGE_SERIES));
        assert!(output.contains("solax_up 0"));

        let output = render(&catalog, None, true).unwrap();
        assert!(output.contains("solax_up 1"));
    }
}
