use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::constants::COUNTY_COLUMN;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::needs_geocoding;

/// One per-county file written by [`split_by_county`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFile {
    pub county: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Turn a county name into a file stem: spaces and path separators become `_`.
pub fn sanitize_county(county: &str) -> String {
    county
        .chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Write one CSV per distinct county value into `output_dir`.
///
/// Rows are grouped by the exact cell text. Rows with no usable county are
/// left out of every file. Files come back sorted by county value.
pub fn split_by_county(dataset: &Dataset, output_dir: impl AsRef<Path>) -> Result<Vec<SplitFile>> {
    let output_dir = output_dir.as_ref();
    let [county_col] = dataset.require_columns([COUNTY_COLUMN])?;

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, county) in dataset.column_values(county_col).enumerate() {
        if needs_geocoding(county) {
            continue;
        }
        if let Some(county) = county {
            groups.entry(county).or_default().push(row);
        }
    }

    fs::create_dir_all(output_dir)?;

    let mut used_stems = HashSet::new();
    let mut files = Vec::with_capacity(groups.len());
    for (county, rows) in groups {
        let base = sanitize_county(county);
        let mut stem = base.clone();
        let mut suffix = 2;
        while !used_stems.insert(stem.clone()) {
            stem = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let path = output_dir.join(format!("{}.csv", stem));
        dataset.write_rows(File::create(&path)?, rows.iter().copied())?;
        info!("Created: {} ({} properties)", path.display(), rows.len());

        files.push(SplitFile {
            county: county.to_string(),
            path,
            rows: rows.len(),
        });
    }

    Ok(files)
}
