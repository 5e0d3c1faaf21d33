//! CSV report format
//!
//! One row per source line, then one row per foreign routine. Foreign rows
//! leave the line columns empty and report overhead as their total.

use super::ReportSnapshot;

const HEADER: &str = "kind,name,line,total_secs,internal_secs,external_secs,text";

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn render_csv(snapshot: &ReportSnapshot) -> String {
    let mut rows = vec![HEADER.to_string()];

    for function in &snapshot.functions {
        for line in &function.lines {
            rows.push(
                [
                    "function".to_string(),
                    escape_field(&function.name),
                    line.line_number.to_string(),
                    format!("{:.6}", line.total_secs),
                    format!("{:.6}", line.internal_secs),
                    format!("{:.6}", line.external_secs),
                    escape_field(line.text.trim_end_matches(['\r', '\n'])),
                ]
                .join(","),
            );
        }
    }

    for foreign in &snapshot.foreign {
        rows.push(format!(
            "foreign,{},,{:.6},,,",
            escape_field(&foreign.name),
            foreign.overhead_secs
        ));
    }

    let mut out = rows.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_store;
    use crate::report::ReportOptions;

    #[test]
    fn test_csv_escape_field_simple() {
        assert_eq!(escape_field("main"), "main");
    }

    #[test]
    fn test_csv_escape_field_with_comma() {
        assert_eq!(escape_field("a, b = 1, 2"), "\"a, b = 1, 2\"");
    }

    #[test]
    fn test_csv_escape_field_with_quote() {
        assert_eq!(escape_field("print(\"hi\")"), "\"print(\"\"hi\"\")\"");
    }

    #[test]
    fn test_csv_escape_field_with_carriage_return() {
        assert_eq!(escape_field("a\rb"), "\"a\rb\"");
    }

    #[test]
    fn test_csv_quotes_embedded_carriage_return() {
        use crate::event::CallableId;
        use crate::source::{SourceSnapshot, SourceTable};
        use crate::store::ReportStore;

        let sources = SourceTable::new().with(
            CallableId::new(1),
            SourceSnapshot::new("f", 1, vec!["a\rb\n".into()]),
        );
        let mut store = ReportStore::new();
        store.ensure_function(CallableId::new(1), &sources).unwrap();

        let csv = render_csv(&ReportSnapshot::from_store(&store, &ReportOptions::default()));
        assert!(csv.contains("function,f,2,0.000000,0.000000,0.000000,\"a\rb\"\n"));
    }

    #[test]
    fn test_csv_rows() {
        let snap = ReportSnapshot::from_store(&sample_store(), &ReportOptions::default());
        let csv = render_csv(&snap);
        let rows: Vec<&str> = csv.lines().collect();

        assert_eq!(rows[0], HEADER);
        assert_eq!(rows[1], "function,main,2,0.250000,0.250000,0.000000,    total = 0");
        assert_eq!(
            rows[2],
            "function,main,3,0.750000,0.500000,0.250000,    total += len(xs)"
        );
        assert_eq!(
            rows[3],
            "function,test_helper,11,0.000000,0.000000,0.000000,    return 1"
        );
        assert_eq!(rows[4], "foreign,<built-in function len>,,0.250000,,,");
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_csv_empty_snapshot_has_header() {
        assert_eq!(render_csv(&ReportSnapshot::default()), format!("{}\n", HEADER));
    }
}
