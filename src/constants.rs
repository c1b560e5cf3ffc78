/// Column names expected in property CSV files
pub const STREET_ADDRESS_COLUMN: &str = "StreetAddress";
pub const CITY_COLUMN: &str = "City";
pub const STATE_COLUMN: &str = "State";
pub const ZIPCODE_COLUMN: &str = "Zipcode";
pub const COUNTY_COLUMN: &str = "CountyName";

// Optional columns that switch on extra reporting/cleaning behavior
pub const PHONE_COLUMN: &str = "BrokerPhoneNumber";
pub const HOME_TYPE_COLUMN: &str = "HomeType";
pub const PRICE_COLUMN: &str = "Price";

/// Columns the enrichment pipeline reads or writes
pub const ADDRESS_COLUMNS: [&str; 5] = [
    STREET_ADDRESS_COLUMN,
    CITY_COLUMN,
    STATE_COLUMN,
    ZIPCODE_COLUMN,
    COUNTY_COLUMN,
];

/// County value the source data uses when the county was never filled in
pub const UNKNOWN_COUNTY: &str = "UNKNOWN";

// Census geocoder query parameters
pub const CENSUS_BENCHMARK: &str = "Public_AR_Current";
pub const CENSUS_VINTAGE: &str = "Current_Current";
pub const CENSUS_FORMAT: &str = "json";

pub const DEFAULT_API_DELAY_SECS: f64 = 0.5;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How many cities and zip codes the analysis keeps
pub const TOP_N: usize = 10;
/// How many entries of each table the printed report shows
pub const REPORT_PREVIEW: usize = 5;

pub const DEFAULT_SPLIT_DIR: &str = "Data/by_county";
