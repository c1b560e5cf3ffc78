pub mod cleaning;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod geocoder;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod split;

pub use config::Config;
pub use dataset::Dataset;
pub use error::{CountyError, Result};
pub use geocoder::{Address, CachedGeocoder, CensusGeocoder, CountyLookup};
pub use pipeline::{needs_geocoding, EnrichmentPipeline, RunStats};
