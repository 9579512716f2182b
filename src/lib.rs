pub mod api;
pub mod catalog;
pub mod classify;
pub mod codes;
pub mod decoder;
pub mod model;
pub mod poller;

pub use api::Error;
pub use catalog::{Catalog, CatalogError, MetricDefinition, SemanticClass, Source};
pub use decoder::{decode, decode_all, is_idle};
pub use model::{DecodedValue, InfoValue, RawSnapshot, Reading, Register};
pub use poller::Poller;

/// Fetch one snapshot from `api` and decode it against `catalog`.
pub async fn read(api: &model::Api, catalog: &Catalog) -> Result<Vec<Reading>, Error> {
    let snapshot = api::real_time_data(api).await?;
    Ok(decode_all(catalog, &snapshot))
}
