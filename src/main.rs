use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use county_geocoder::cleaning::{normalize, NormalizeRules};
use county_geocoder::constants::DEFAULT_SPLIT_DIR;
use county_geocoder::report::{analyze, compare, print_analysis, print_comparison, write_json_report};
use county_geocoder::split::split_by_county;
use county_geocoder::{logging, CachedGeocoder, CensusGeocoder, Config, Dataset, EnrichmentPipeline};

#[derive(Parser)]
#[command(name = "county_geocoder")]
#[command(about = "Fill in missing county names for property listings and report on the results")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode rows with a blank or UNKNOWN county and write the updated CSV
    Enrich {
        input: PathBuf,
        output: PathBuf,
    },
    /// Print statistics for a CSV file
    Analyze {
        file: PathBuf,
        /// Also write the statistics to this JSON file
        report: Option<PathBuf>,
    },
    /// Compare missing-county counts between two snapshots
    Compare {
        original: PathBuf,
        updated: PathBuf,
        /// Also write the comparison to this JSON file
        report: Option<PathBuf>,
    },
    /// Write one CSV per county
    Split {
        file: PathBuf,
        #[arg(default_value = DEFAULT_SPLIT_DIR)]
        output_dir: PathBuf,
    },
    /// Clean phone numbers, addresses and empty cells
    Clean {
        input: PathBuf,
        output: PathBuf,
        /// Strip everything but digits from BrokerPhoneNumber
        #[arg(long)]
        phones: bool,
        /// Trim and title-case StreetAddress
        #[arg(long)]
        addresses: bool,
        /// Fill empty cells of a column, as COLUMN=VALUE (repeatable)
        #[arg(long = "default", value_name = "COLUMN=VALUE")]
        defaults: Vec<String>,
    },
}

async fn run_enrich(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let geocoder = CensusGeocoder::from_config(&config)?;
    let pipeline = EnrichmentPipeline::new(CachedGeocoder::new(geocoder));

    println!("🔄 Running county enrichment...");
    pipeline
        .process_csv_file(&input, &output)
        .await
        .with_context(|| format!("Enrichment of {} failed", input.display()))?;

    let cache = pipeline.geocoder().stats().await;
    info!("Cache: {} hits, {} misses", cache.hits, cache.misses);
    println!("\n✅ Processing complete!");
    Ok(())
}

fn run_clean(
    input: PathBuf,
    output: PathBuf,
    phones: bool,
    addresses: bool,
    defaults: Vec<String>,
) -> anyhow::Result<()> {
    let mut rules = NormalizeRules {
        clean_phone_numbers: phones,
        normalize_addresses: addresses,
        ..NormalizeRules::default()
    };
    for pair in &defaults {
        rules = rules.parse_default(pair)?;
    }

    let mut dataset = Dataset::load(&input)?;
    normalize(&mut dataset, &rules);
    dataset.save(&output)?;
    println!("✅ Cleaned {} rows into {}", dataset.len(), output.display());
    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Enrich { input, output } => run_enrich(input, output).await?,
        Commands::Analyze { file, report } => {
            let dataset = Dataset::load(&file)?;
            let analysis = analyze(&dataset)?;
            print_analysis(&analysis);
            if let Some(path) = report {
                write_json_report(&analysis, &file.display().to_string(), &path)?;
            }
        }
        Commands::Compare { original, updated, report } => {
            let before = Dataset::load(&original)?;
            let after = Dataset::load(&updated)?;
            let comparison = compare(&before, &after)?;
            print_comparison(&comparison);
            if let Some(path) = report {
                let source = format!("{} -> {}", original.display(), updated.display());
                write_json_report(&comparison, &source, &path)?;
            }
        }
        Commands::Split { file, output_dir } => {
            let dataset = Dataset::load(&file)?;
            let files = split_by_county(&dataset, &output_dir)?;
            println!("✅ Created {} county files in {}", files.len(), output_dir.display());
        }
        Commands::Clean { input, output, phones, addresses, defaults } => {
            run_clean(input, output, phones, addresses, defaults)?
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        error!("{:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
