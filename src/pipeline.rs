use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::constants::{ADDRESS_COLUMNS, UNKNOWN_COUNTY};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::geocoder::{Address, CountyLookup};

/// Counters for one enrichment run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub needs_geocoding: usize,
    pub geocoded: usize,
    pub failed: usize,
    pub already_had_county: usize,
}

/// True when a county cell holds no usable county: absent, blank, or the
/// `UNKNOWN` placeholder in any casing.
pub fn needs_geocoding(county: Option<&str>) -> bool {
    match county.map(str::trim) {
        None => true,
        Some(value) => value.is_empty() || value.eq_ignore_ascii_case(UNKNOWN_COUNTY),
    }
}

/// Row indices, in dataset order, whose county needs geocoding.
pub fn identify_missing_counties(dataset: &Dataset, county_col: usize) -> Vec<usize> {
    dataset
        .column_values(county_col)
        .enumerate()
        .filter(|(_, county)| needs_geocoding(*county))
        .map(|(idx, _)| idx)
        .collect()
}

/// Fills missing county cells using a [`CountyLookup`].
pub struct EnrichmentPipeline<L> {
    geocoder: L,
}

impl<L: CountyLookup> EnrichmentPipeline<L> {
    pub fn new(geocoder: L) -> Self {
        Self { geocoder }
    }

    pub fn geocoder(&self) -> &L {
        &self.geocoder
    }

    /// Geocode every row that needs it, writing resolved counties in place.
    ///
    /// `progress` is called after each processed row with
    /// `(processed_so_far, rows_needing_geocoding)`.
    pub async fn enrich(
        &self,
        dataset: &mut Dataset,
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<RunStats> {
        let [street_col, city_col, state_col, zip_col, county_col] =
            dataset.require_columns(ADDRESS_COLUMNS)?;

        let pending = identify_missing_counties(dataset, county_col);
        let mut stats = RunStats {
            total: dataset.len(),
            needs_geocoding: pending.len(),
            already_had_county: dataset.len() - pending.len(),
            ..RunStats::default()
        };
        info!(
            "Found {} properties with missing or unknown county information",
            stats.needs_geocoding
        );

        for (n, &row) in pending.iter().enumerate() {
            let address = Address::new(
                dataset.cell(row, street_col),
                dataset.cell(row, city_col),
                dataset.cell(row, state_col),
                dataset.cell(row, zip_col),
            );
            info!("Geocoding {}/{}: {}", n + 1, stats.needs_geocoding, address);

            match self.geocoder.lookup(&address).await {
                Some(county) => {
                    info!("  Found: {}", county);
                    dataset.set(row, county_col, county);
                    stats.geocoded += 1;
                }
                None => {
                    info!("  County not found");
                    stats.failed += 1;
                }
            }

            self.geocoder.wait().await;

            if let Some(callback) = progress.as_mut() {
                callback(n + 1, stats.needs_geocoding);
            }
        }

        Ok(stats)
    }

    /// Load `input`, enrich it, and write the result to `output`.
    #[instrument(skip(self, input, output), fields(input = %input.as_ref().display()))]
    pub async fn process_csv_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunStats> {
        let mut dataset = Dataset::load(input.as_ref())?;
        let stats = self.enrich(&mut dataset, None).await?;

        info!("Saving updated CSV to: {}", output.as_ref().display());
        dataset.save(output.as_ref())?;

        print_summary(&stats);
        Ok(stats)
    }
}

pub fn print_summary(stats: &RunStats) {
    println!("\n📊 Summary:");
    println!("   Total properties: {}", stats.total);
    println!("   Successfully geocoded: {}", stats.geocoded);
    println!("   Failed to geocode: {}", stats.failed);
    println!("   Already had county: {}", stats.already_had_county);
}
