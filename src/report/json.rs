//! JSON report format
//!
//! ```json
//! {
//!   "format": "lineprof-json-v1",
//!   "functions": [ { "name": "main", "lines": [ ... ], ... } ],
//!   "foreign": [ { "name": "<built-in function len>", "overhead_secs": 0.25 } ]
//! }
//! ```

use super::{ForeignReport, FunctionReport, ReportSnapshot};
use crate::error::Result;
use serde::Serialize;

/// Format tag written at the top of every JSON report
pub const JSON_FORMAT: &str = "lineprof-json-v1";

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    format: &'a str,
    functions: &'a [FunctionReport],
    foreign: &'a [ForeignReport],
}

pub fn render_json(snapshot: &ReportSnapshot) -> Result<String> {
    let report = JsonReport {
        format: JSON_FORMAT,
        functions: &snapshot.functions,
        foreign: &snapshot.foreign,
    };
    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_store;
    use crate::report::ReportOptions;

    #[test]
    fn test_json_structure() {
        let snap = ReportSnapshot::from_store(&sample_store(), &ReportOptions::default());
        let json = render_json(&snap).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["format"], "lineprof-json-v1");
        assert_eq!(value["functions"][0]["name"], "main");
        assert_eq!(value["functions"][0]["starting_line"], 1);
        assert_eq!(value["functions"][0]["lines"][1]["line_number"], 3);
        assert_eq!(value["functions"][0]["lines"][1]["external_secs"], 0.25);
        assert_eq!(value["foreign"][0]["name"], "<built-in function len>");
        assert_eq!(value["foreign"][0]["overhead_secs"], 0.25);
    }

    #[test]
    fn test_json_empty_snapshot() {
        let json = render_json(&ReportSnapshot::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["functions"].as_array().unwrap().len(), 0);
        assert_eq!(value["foreign"].as_array().unwrap().len(), 0);
    }
}
