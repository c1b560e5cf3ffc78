use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::info;

use crate::constants::{
    CITY_COLUMN, COUNTY_COLUMN, HOME_TYPE_COLUMN, PRICE_COLUMN, REPORT_PREVIEW, TOP_N,
    ZIPCODE_COLUMN,
};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::needs_geocoding;

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Count values, most frequent first. Equal counts keep first-seen order.
pub fn frequency_table<'a, I>(values: I) -> Vec<FrequencyEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();
    for value in values {
        match positions.get(value) {
            Some(&pos) => entries[pos].count += 1,
            None => {
                positions.insert(value, entries.len());
                entries.push(FrequencyEntry { value: value.to_string(), count: 1 });
            }
        }
    }
    // sort_by is stable, so ties stay in insertion order
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceStats {
    /// Summary of the values, or `None` when there are none.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        Some(Self {
            mean: values.iter().sum::<f64>() / n as f64,
            median,
            min: values[0],
            max: values[n - 1],
        })
    }
}

/// Parse a price cell such as `1850`, `$1,850.00` or ` 1850.5 `.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Aggregate statistics for one dataset snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub total_properties: usize,
    pub counties: Vec<FrequencyEntry>,
    pub cities: Vec<FrequencyEntry>,
    pub zipcodes: Vec<FrequencyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_types: Option<Vec<FrequencyEntry>>,
    pub missing_county: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_stats: Option<PriceStats>,
}

pub fn analyze(dataset: &Dataset) -> Result<Analysis> {
    let [county_col, city_col, zip_col] =
        dataset.require_columns([COUNTY_COLUMN, CITY_COLUMN, ZIPCODE_COLUMN])?;

    let counties = frequency_table(
        dataset
            .column_values(county_col)
            .filter(|c| !needs_geocoding(*c))
            .flatten(),
    );
    let missing_county = count_missing(dataset, county_col);

    let mut cities = frequency_table(dataset.column_values(city_col).flatten());
    cities.truncate(TOP_N);
    let mut zipcodes = frequency_table(dataset.column_values(zip_col).flatten());
    zipcodes.truncate(TOP_N);

    let property_types = dataset
        .column_index(HOME_TYPE_COLUMN)
        .map(|col| frequency_table(dataset.column_values(col).flatten()));

    let price_stats = dataset.column_index(PRICE_COLUMN).and_then(|col| {
        PriceStats::from_values(dataset.column_values(col).flatten().filter_map(parse_price).collect())
    });

    Ok(Analysis {
        total_properties: dataset.len(),
        counties,
        cities,
        zipcodes,
        property_types,
        missing_county,
        price_stats,
    })
}

fn count_missing(dataset: &Dataset, county_col: usize) -> usize {
    dataset
        .column_values(county_col)
        .filter(|c| needs_geocoding(*c))
        .count()
}

/// Share of originally missing counties that got resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuccessRate {
    Percent(f64),
    /// The original snapshot had no missing counties
    NothingToCompare,
}

impl fmt::Display for SuccessRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessRate::Percent(p) => write!(f, "{:.1}%", p),
            SuccessRate::NothingToCompare => write!(f, "nothing to compare"),
        }
    }
}

impl Serialize for SuccessRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SuccessRate::Percent(_) => serializer.collect_str(self),
            SuccessRate::NothingToCompare => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub original_missing: usize,
    pub updated_missing: usize,
    /// Negative when the updated snapshot has more gaps than the original
    pub records_updated: i64,
    pub success_rate: SuccessRate,
    pub nothing_to_compare: bool,
}

pub fn compare(before: &Dataset, after: &Dataset) -> Result<Comparison> {
    let [before_col] = before.require_columns([COUNTY_COLUMN])?;
    let [after_col] = after.require_columns([COUNTY_COLUMN])?;

    let original_missing = count_missing(before, before_col);
    let updated_missing = count_missing(after, after_col);
    let records_updated = original_missing as i64 - updated_missing as i64;

    let success_rate = if original_missing == 0 {
        SuccessRate::NothingToCompare
    } else {
        SuccessRate::Percent(records_updated as f64 / original_missing as f64 * 100.0)
    };

    Ok(Comparison {
        original_missing,
        updated_missing,
        records_updated,
        success_rate,
        nothing_to_compare: success_rate == SuccessRate::NothingToCompare,
    })
}

/// A report as written to disk, stamped with when it was produced
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub source: &'a str,
    #[serde(flatten)]
    pub report: &'a T,
}

pub fn write_json_report<T: Serialize>(report: &T, source: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let wrapped = JsonReport { generated_at: Utc::now(), source, report };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &wrapped)?;
    info!("Report saved to: {}", path.display());
    Ok(())
}

/// Format a number as dollars with thousands separators: `$1,234.56`.
pub fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn print_table(title: &str, entries: &[FrequencyEntry], limit: usize) {
    println!("\n{}:", title);
    for entry in entries.iter().take(limit) {
        println!("  {}: {}", entry.value, entry.count);
    }
}

pub fn print_analysis(analysis: &Analysis) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("PROPERTY DATA ANALYSIS REPORT");
    println!("{}", rule);

    println!("\nTotal Properties: {}", analysis.total_properties);
    println!("Missing County Data: {}", analysis.missing_county);

    print_table("Top Counties", &analysis.counties, REPORT_PREVIEW);
    print_table("Top Cities", &analysis.cities, REPORT_PREVIEW);
    print_table("Top Zip Codes", &analysis.zipcodes, REPORT_PREVIEW);

    if let Some(types) = analysis.property_types.as_deref().filter(|t| !t.is_empty()) {
        print_table("Property Types", types, types.len());
    }

    if let Some(prices) = &analysis.price_stats {
        println!("\nPrice Statistics:");
        println!("  Mean: {}", format_currency(prices.mean));
        println!("  Median: {}", format_currency(prices.median));
        println!("  Min: {}", format_currency(prices.min));
        println!("  Max: {}", format_currency(prices.max));
    }

    println!("{}", rule);
}

pub fn print_comparison(comparison: &Comparison) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("CSV COMPARISON REPORT");
    println!("{}", rule);
    println!("Original missing: {}", comparison.original_missing);
    println!("Updated missing: {}", comparison.updated_missing);
    println!("Records updated: {}", comparison.records_updated);
    println!("Success rate: {}", comparison.success_rate);
    println!("{}", rule);
}
