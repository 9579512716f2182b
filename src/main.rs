#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use config::Config;
use rocket::fairing::AdHoc;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use solax_local_rs::poller::{MAX_INTERVAL, MIN_INTERVAL};
use solax_local_rs::{api, decode_all, Catalog, Poller, RawSnapshot, Reading};
use std::sync::Arc;
use std::time::Duration;

mod metrics;

const CONFIG_FILE: &str = "solax";
const DEFAULT_INTERVAL: i64 = 6;
const DEFAULT_TIMEOUT: i64 = 5;

#[derive(Clone, serde::Deserialize)]
pub struct SolaxConfig {
    host: String,
    password: String,
    /// Seconds between polls
    interval: u64,
    /// Request timeout in seconds
    timeout: u64,
    /// Path of a JSON catalog replacing the builtin register table
    catalog: Option<String>,
}

/// Structure containing state for API handlers.
pub struct StateData {
    poller: Arc<Poller>,
    catalog: Catalog,
}

/// Defaults, then optional `solax.toml` (or .json/.yaml), then `SOLAX_*` environment.
pub fn read_settings() -> Result<SolaxConfig, config::ConfigError> {
    let mut settings = Config::default();
    settings
        .set_default("interval", DEFAULT_INTERVAL)?
        .set_default("timeout", DEFAULT_TIMEOUT)?
        .merge(config::File::with_name(CONFIG_FILE).required(false))?
        .merge(config::Environment::with_prefix("SOLAX"))?;

    settings.try_into()
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, api::Error> {
    let snapshot = state.poller.snapshot();
    metrics::render(
        &state.catalog,
        snapshot.as_deref(),
        state.poller.is_available(),
    )
}

#[get("/readings")]
async fn readings_route(state: &State<StateData>) -> Result<Json<Vec<Reading>>, api::Error> {
    let snapshot = state.poller.require_snapshot()?;
    Ok(Json(decode_all(&state.catalog, &snapshot)))
}

#[get("/raw")]
async fn raw_route(state: &State<StateData>) -> Result<Json<RawSnapshot>, api::Error> {
    let snapshot = state.poller.require_snapshot()?;
    Ok(Json(RawSnapshot::clone(&snapshot)))
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = read_settings().expect("Configuration error");

    let interval = Duration::from_secs(settings.interval);
    if interval < MIN_INTERVAL || interval > MAX_INTERVAL {
        log::warn!(
            "interval {}s outside {}..={}s, clamping",
            settings.interval,
            MIN_INTERVAL.as_secs(),
            MAX_INTERVAL.as_secs()
        );
    }

    let catalog = match &settings.catalog {
        Some(path) => Catalog::load(path).expect("Catalog error"),
        None => Catalog::builtin(),
    };

    let api = api::api(
        &settings.host,
        settings.password,
        Duration::from_secs(settings.timeout),
    )
    .expect("Unable to build HTTP client");

    let poller = Arc::new(Poller::new(api, interval));
    let state = StateData {
        poller: Arc::clone(&poller),
        catalog,
    };

    rocket::build()
        .manage(state)
        .attach(AdHoc::on_liftoff("Inverter poller", move |_| {
            let poller = Arc::clone(&poller);
            Box::pin(async move {
                tokio::spawn(poller.run());
            })
        }))
        .mount("/", routes![metrics_route, readings_route, raw_route])
}
