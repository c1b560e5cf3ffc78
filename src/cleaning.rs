use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants::{PHONE_COLUMN, STREET_ADDRESS_COLUMN};
use crate::dataset::Dataset;
use crate::error::{CountyError, Result};

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid regex"));

/// Which cleaning steps to run. Every step can be applied repeatedly
/// without further change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeRules {
    pub clean_phone_numbers: bool,
    pub normalize_addresses: bool,
    /// Column name to the value written into its empty cells
    pub defaults: BTreeMap<String, String>,
}

impl NormalizeRules {
    pub fn all() -> Self {
        Self {
            clean_phone_numbers: true,
            normalize_addresses: true,
            defaults: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(column.into(), value.into());
        self
    }

    /// Add a default from `COLUMN=VALUE` text.
    pub fn parse_default(mut self, pair: &str) -> Result<Self> {
        let (column, value) = pair
            .split_once('=')
            .filter(|(column, _)| !column.trim().is_empty())
            .ok_or_else(|| CountyError::InvalidArgument(format!("expected COLUMN=VALUE, got '{}'", pair)))?;
        self.defaults.insert(column.trim().to_string(), value.to_string());
        Ok(self)
    }
}

/// Keep only the digits of a phone number.
pub fn clean_phone(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Trim and title-case an address: the first letter of each word is
/// upper-cased and the remaining letters lower-cased. Words break on
/// whitespace, `-`, `/` and `(`, so `123 n-main st` becomes `123 N-Main St`.
pub fn title_case_address(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.trim().chars() {
        if at_word_start && c.is_alphabetic() {
            // Only the first char of a multi-char uppercase (`ß` -> `SS`) starts the word
            let mut upper = c.to_uppercase();
            out.extend(upper.next());
            out.extend(upper.flat_map(char::to_lowercase));
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = c.is_whitespace() || matches!(c, '-' | '/' | '(');
    }
    out
}

fn map_column(dataset: &mut Dataset, column: &str, f: impl Fn(&str) -> String) -> usize {
    let Some(col) = dataset.column_index(column) else {
        return 0;
    };
    let mut changed = 0;
    for row in 0..dataset.len() {
        let current = dataset.cell(row, col);
        let updated = f(current);
        if updated != current {
            dataset.set(row, col, updated);
            changed += 1;
        }
    }
    changed
}

/// Apply the selected cleaning steps in place. Columns the dataset does not
/// have are skipped.
pub fn normalize(dataset: &mut Dataset, rules: &NormalizeRules) {
    if rules.clean_phone_numbers {
        let changed = map_column(dataset, PHONE_COLUMN, clean_phone);
        debug!("Cleaned {} phone numbers", changed);
    }

    if rules.normalize_addresses {
        let changed = map_column(dataset, STREET_ADDRESS_COLUMN, title_case_address);
        debug!("Normalized {} street addresses", changed);
    }

    for (column, default) in &rules.defaults {
        let changed = map_column(dataset, column, |cell| {
            if cell.is_empty() {
                default.clone()
            } else {
                cell.to_string()
            }
        });
        debug!("Filled {} empty {} cells", changed, column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSY: &str = "\
StreetAddress,BrokerPhoneNumber,HomeType,CountyName
  123 PEACHTREE st ne ,(404) 555-0101,,Fulton
41 o'neil-smith rd,404.555.0199,CONDO,
\"9 ash ct (rear)\",,TOWNHOUSE,
";

    fn messy() -> Dataset {
        Dataset::from_reader(MESSY.as_bytes()).unwrap()
    }

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone("(404) 555-0101"), "4045550101");
        assert_eq!(clean_phone("+1 404.555.0199 ext 2"), "140455501992");
        assert_eq!(clean_phone(""), "");
    }

    #[test]
    fn test_title_case_address() {
        assert_eq!(title_case_address("  123 PEACHTREE st ne "), "123 Peachtree St Ne");
        assert_eq!(title_case_address("41 o'neil-smith rd"), "41 O'neil-Smith Rd");
        assert_eq!(title_case_address("9 ash ct (rear)"), "9 Ash Ct (Rear)");
        assert_eq!(title_case_address("1st ave"), "1st Ave");
    }

    #[test]
    fn test_normalize_applies_selected_rules() {
        let mut ds = messy();
        let rules = NormalizeRules::all()
            .with_default("HomeType", "UNSPECIFIED")
            .with_default("NotAColumn", "x");
        normalize(&mut ds, &rules);

        assert_eq!(ds.cell(0, 0), "123 Peachtree St Ne");
        assert_eq!(ds.cell(0, 1), "4045550101");
        assert_eq!(ds.cell(1, 1), "4045550199");
        assert_eq!(ds.cell(0, 2), "UNSPECIFIED");
        assert_eq!(ds.cell(1, 2), "CONDO");
        // County is not part of any rule
        assert_eq!(ds.cell(1, 3), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let rules = NormalizeRules::all().with_default("CountyName", "UNKNOWN");
        let mut once = messy();
        normalize(&mut once, &rules);
        let mut twice = once.clone();
        normalize(&mut twice, &rules);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_title_case_is_stable_for_expanding_uppercase() {
        assert_eq!(title_case_address("ßchloss weg 4"), "Sschloss Weg 4");
        for raw in ["ßchloss weg 4", "ŉorth st", "straße ßtr", "İstiklal cd"] {
            let once = title_case_address(raw);
            assert_eq!(title_case_address(&once), once, "input: {}", raw);
        }

        let csv = "StreetAddress\nßchloss weg 4\n\"ŉorth st\"\n";
        let rules = NormalizeRules::all();
        let mut once = Dataset::from_reader(csv.as_bytes()).unwrap();
        normalize(&mut once, &rules);
        let mut twice = once.clone();
        normalize(&mut twice, &rules);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_disabled_rules_leave_data_alone() {
        let mut ds = messy();
        normalize(&mut ds, &NormalizeRules::default());
        assert_eq!(ds, messy());
    }

    #[test]
    fn test_parse_default() {
        let rules = NormalizeRules::default().parse_default("HomeType=SINGLE_FAMILY").unwrap();
        assert_eq!(rules.defaults.get("HomeType").map(String::as_str), Some("SINGLE_FAMILY"));
        assert!(NormalizeRules::default().parse_default("HomeType").is_err());
        assert!(NormalizeRules::default().parse_default("=x").is_err());
    }
}
