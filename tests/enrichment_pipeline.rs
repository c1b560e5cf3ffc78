use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use county_geocoder::{Address, CachedGeocoder, CountyLookup, Dataset, EnrichmentPipeline, RunStats};
use tempfile::tempdir;

/// Answers every lookup the same way
struct FixedLookup {
    county: Option<&'static str>,
    calls: AtomicUsize,
    waits: AtomicUsize,
}

impl FixedLookup {
    fn new(county: Option<&'static str>) -> Self {
        Self {
            county,
            calls: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CountyLookup for FixedLookup {
    async fn lookup(&self, _address: &Address) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.county.map(str::to_string)
    }

    async fn wait(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

const THREE_LISTINGS: &str = "\
StreetAddress,City,State,Zipcode,CountyName,BrokerPhoneNumber,Price
55 Trinity Ave SW,Atlanta,GA,30303,Fulton,(404) 555-0101,1500
101 E Court Sq,Decatur,GA,30030,,404-555-0199,1350
3 Clairmont Ave,Decatur,GA,30030,UNKNOWN,,\"$2,000\"
";

fn counties(ds: &Dataset) -> Vec<String> {
    let col = ds.column_index("CountyName").unwrap();
    (0..ds.len()).map(|row| ds.cell(row, col).to_string()).collect()
}

#[tokio::test]
async fn test_blank_and_unknown_counties_are_filled() -> Result<()> {
    let mut ds = Dataset::from_reader(THREE_LISTINGS.as_bytes())?;
    let before = ds.clone();
    let pipeline = EnrichmentPipeline::new(FixedLookup::new(Some("DeKalb")));

    let stats = pipeline.enrich(&mut ds, None).await?;

    assert_eq!(counties(&ds), vec!["Fulton", "DeKalb", "DeKalb"]);
    assert_eq!(
        stats,
        RunStats { total: 3, needs_geocoding: 2, geocoded: 2, failed: 0, already_had_county: 1 }
    );
    assert_eq!(ds.rows()[0], before.rows()[0]);
    assert_eq!(pipeline.geocoder().calls.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.geocoder().waits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_lookups_leave_rows_unresolved() -> Result<()> {
    let mut ds = Dataset::from_reader(THREE_LISTINGS.as_bytes())?;
    let before = ds.clone();
    let pipeline = EnrichmentPipeline::new(FixedLookup::new(None));

    let stats = pipeline.enrich(&mut ds, None).await?;

    assert_eq!(stats.geocoded, 0);
    assert_eq!(stats.failed, stats.needs_geocoding);
    assert_eq!(stats.already_had_county + stats.needs_geocoding, stats.total);
    assert_eq!(ds, before);
    // A wait follows every attempt, successful or not
    assert_eq!(pipeline.geocoder().waits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_rerun_with_failures_keeps_resolved_counties() -> Result<()> {
    let mut ds = Dataset::from_reader(THREE_LISTINGS.as_bytes())?;
    EnrichmentPipeline::new(FixedLookup::new(Some("DeKalb")))
        .enrich(&mut ds, None)
        .await?;
    let resolved = ds.clone();

    let failing = EnrichmentPipeline::new(FixedLookup::new(None));
    let stats = failing.enrich(&mut ds, None).await?;

    assert_eq!(stats.needs_geocoding, 0);
    assert_eq!(stats.already_had_county, 3);
    assert_eq!(failing.geocoder().calls.load(Ordering::SeqCst), 0);
    assert_eq!(ds, resolved);
    assert_eq!(counties(&ds), vec!["Fulton", "DeKalb", "DeKalb"]);
    Ok(())
}

#[tokio::test]
async fn test_progress_reports_each_row() -> Result<()> {
    let mut ds = Dataset::from_reader(THREE_LISTINGS.as_bytes())?;
    let pipeline = EnrichmentPipeline::new(FixedLookup::new(Some("DeKalb")));

    let mut seen = Vec::new();
    let mut progress = |done: usize, total: usize| seen.push(format!("{done}/{total}"));
    pipeline.enrich(&mut ds, Some(&mut progress)).await?;

    assert_eq!(seen, vec!["1/2", "2/2"]);
    Ok(())
}

#[tokio::test]
async fn test_cached_geocoder_in_pipeline() -> Result<()> {
    let csv = "\
StreetAddress,City,State,Zipcode,CountyName
101 E Court Sq,Decatur,GA,30030,
101 e court sq,DECATUR,GA,30030,unknown
";
    let mut ds = Dataset::from_reader(csv.as_bytes())?;
    let pipeline = EnrichmentPipeline::new(CachedGeocoder::new(FixedLookup::new(Some("DeKalb"))));

    let stats = pipeline.enrich(&mut ds, None).await?;
    assert_eq!(stats.geocoded, 2);
    assert_eq!(pipeline.geocoder().stats().await.hits, 1);
    Ok(())
}

#[tokio::test]
async fn test_process_csv_file_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("listings.csv");
    let output = dir.path().join("out").join("listings_with_counties.csv");
    std::fs::write(&input, THREE_LISTINGS)?;

    let pipeline = EnrichmentPipeline::new(FixedLookup::new(Some("DeKalb")));
    let stats = pipeline.process_csv_file(&input, &output).await?;
    assert_eq!(stats.geocoded, 2);

    let written = Dataset::load(&output)?;
    assert_eq!(counties(&written), vec!["Fulton", "DeKalb", "DeKalb"]);
    let price = written.column_index("Price").unwrap();
    assert_eq!(written.cell(2, price), "$2,000");
    // Input file is not modified
    assert_eq!(std::fs::read_to_string(&input)?, THREE_LISTINGS);
    Ok(())
}

#[tokio::test]
async fn test_missing_column_aborts_without_output() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("listings.csv");
    let output = dir.path().join("listings_with_counties.csv");
    std::fs::write(&input, "StreetAddress,City,State,CountyName\n1 Main St,Atlanta,GA,\n")?;

    let pipeline = EnrichmentPipeline::new(FixedLookup::new(Some("Fulton")));
    let err = pipeline.process_csv_file(&input, &output).await.unwrap_err();

    assert_eq!(err.to_string(), "Missing required column: Zipcode");
    assert!(!output.exists());
    assert_eq!(pipeline.geocoder().calls.load(Ordering::SeqCst), 0);
    Ok(())
}
