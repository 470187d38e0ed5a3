use crate::constants::{CSV_SUFFIX, JSON_SUFFIX};

/// Only objects whose name ends in `.json` (case-sensitive) are processed.
pub fn is_json_object(name: &str) -> bool {
    name.ends_with(JSON_SUFFIX)
}

/// Location of the CSV export for an input object.
///
/// Every literal `.json` in the name becomes `.csv`, so `a.json.json` maps to
/// `a.csv.csv` rather than only the trailing extension being swapped.
pub fn derive_output_path(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name.replace(JSON_SUFFIX, CSV_SUFFIX))
}
