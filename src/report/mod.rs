//! Report generation
//!
//! The engine performs no formatting. A [`ReportSnapshot`] is a read-only
//! copy of the store in report order: line-resolved callables first (in
//! first-seen order), then foreign routines. Durations are converted to
//! fractional seconds here, from the store's nanosecond resolution.
//!
//! Writers:
//! - `text`: the classic per-line layout, `total(internal/external): line`
//! - `json`: `lineprof-json-v1` document
//! - `csv`: one row per line plus one row per foreign routine

mod csv;
mod json;
mod text;

pub use self::csv::render_csv;
pub use self::json::{render_json, JSON_FORMAT};
pub use self::text::render_text;

use crate::error::Result;
use crate::filter::CallableFilter;
use crate::store::ReportStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable per-line listing (default)
    #[default]
    Text,
    /// JSON for machine parsing
    Json,
    /// CSV for spreadsheet analysis
    Csv,
}

/// What a report includes and how it is rendered
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub format: ReportFormat,
    /// Skip lines with no recorded time (text output only)
    pub hide_idle_lines: bool,
    pub include_foreign: bool,
    pub filter: CallableFilter,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            hide_idle_lines: false,
            include_foreign: true,
            filter: CallableFilter::All,
        }
    }
}

/// Timing of one source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    pub line_number: u32,
    pub text: String,
    pub total_secs: f64,
    pub internal_secs: f64,
    pub external_secs: f64,
}

impl LineReport {
    pub fn is_idle(&self) -> bool {
        self.total_secs == 0.0
    }
}

/// Timing of one interpreted callable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub callable: u64,
    pub starting_line: u32,
    pub overhead_secs: f64,
    pub total_secs: f64,
    pub lines: Vec<LineReport>,
}

/// Timing of one foreign routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignReport {
    pub name: String,
    pub overhead_secs: f64,
}

/// Read-only copy of the store, in report order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub functions: Vec<FunctionReport>,
    pub foreign: Vec<ForeignReport>,
}

impl ReportSnapshot {
    pub fn from_store(store: &ReportStore, options: &ReportOptions) -> Self {
        let functions = store
            .functions()
            .filter(|(_, rec)| options.filter.matches(rec.name()))
            .map(|(id, rec)| FunctionReport {
                name: rec.name().to_string(),
                callable: id.raw(),
                starting_line: rec.starting_line(),
                overhead_secs: rec.overhead().as_secs_f64(),
                total_secs: rec.total().as_secs_f64(),
                lines: rec
                    .source_lines()
                    .iter()
                    .zip(rec.line_internal().iter().zip(rec.line_external()))
                    .enumerate()
                    .map(|(idx, (text, (internal, external)))| LineReport {
                        line_number: rec.line_number(idx),
                        text: text.clone(),
                        total_secs: (*internal + *external).as_secs_f64(),
                        internal_secs: internal.as_secs_f64(),
                        external_secs: external.as_secs_f64(),
                    })
                    .collect(),
            })
            .collect();

        let foreign = if options.include_foreign {
            store
                .foreign_records()
                .filter(|rec| options.filter.matches(rec.name()))
                .map(|rec| ForeignReport {
                    name: rec.name().to_string(),
                    overhead_secs: rec.overhead().as_secs_f64(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self { functions, foreign }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionReport> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn foreign(&self, name: &str) -> Option<&ForeignReport> {
        self.foreign.iter().find(|f| f.name == name)
    }

    pub fn callable_count(&self) -> usize {
        self.functions.len() + self.foreign.len()
    }
}

/// Outcome of writing a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStatus {
    /// Number of callables written
    pub callables: usize,
    pub destination: String,
}

/// Renders snapshots and writes them to a destination
#[derive(Debug, Clone, Default)]
pub struct ReportSink {
    options: ReportOptions,
}

impl ReportSink {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Render a snapshot in the configured format
    pub fn render(&self, snapshot: &ReportSnapshot) -> Result<String> {
        match self.options.format {
            ReportFormat::Text => Ok(render_text(snapshot, self.options.hide_idle_lines)),
            ReportFormat::Json => render_json(snapshot),
            ReportFormat::Csv => Ok(render_csv(snapshot)),
        }
    }

    /// Snapshot `store`, render it, and write it to `destination`
    ///
    /// `"-"` or an empty destination means standard output; anything else
    /// is a file path, created or truncated.
    pub fn produce_report(&self, store: &ReportStore, destination: &str) -> Result<ReportStatus> {
        let snapshot = ReportSnapshot::from_store(store, &self.options);
        let rendered = self.render(&snapshot)?;

        if is_stdout(destination) {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(rendered.as_bytes())?;
            out.flush()?;
        } else if let Err(err) = fs::write(destination, rendered.as_bytes()) {
            tracing::warn!("Failed to write report to {}: {}", destination, err);
            return Err(err.into());
        }

        Ok(ReportStatus {
            callables: snapshot.callable_count(),
            destination: if is_stdout(destination) {
                "-".to_string()
            } else {
                destination.to_string()
            },
        })
    }
}

fn is_stdout(destination: &str) -> bool {
    destination.is_empty() || destination == "-"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_stack::ActiveInvocation;
    use crate::event::CallableId;
    use crate::source::{SourceSnapshot, SourceTable};
    use std::time::Duration;

    pub(super) fn sample_store() -> ReportStore {
        let sources = SourceTable::new()
            .with(
                CallableId::new(1),
                SourceSnapshot::new(
                    "main",
                    1,
                    vec!["    total = 0\n".into(), "    total += len(xs)\n".into()],
                ),
            )
            .with(
                CallableId::new(2),
                SourceSnapshot::new("test_helper", 10, vec!["    return 1\n".into()]),
            );
        let mut store = ReportStore::new();
        store.ensure_function(CallableId::new(1), &sources).unwrap();
        store.ensure_function(CallableId::new(2), &sources).unwrap();

        let mut inv = ActiveInvocation::new(CallableId::new(1), 1, 2);
        inv.set_current_line(2);
        inv.current_line_state()
            .unwrap()
            .add_internal(Duration::from_millis(250));
        inv.set_current_line(3);
        inv.current_line_state()
            .unwrap()
            .add_internal(Duration::from_millis(500));
        inv.current_line_state()
            .unwrap()
            .add_external(Duration::from_millis(250));
        inv.add_overhead(Duration::from_millis(125));
        store.fold(&inv).unwrap();

        store
            .ensure_foreign("<built-in function len>")
            .add_overhead(Duration::from_millis(250));
        store
    }

    #[test]
    fn test_snapshot_order_and_values() {
        let snap = ReportSnapshot::from_store(&sample_store(), &ReportOptions::default());
        assert_eq!(snap.functions.len(), 2);
        assert_eq!(snap.functions[0].name, "main");
        assert_eq!(snap.functions[1].name, "test_helper");
        assert_eq!(snap.foreign.len(), 1);

        let main = snap.function("main").unwrap();
        assert_eq!(main.overhead_secs, 0.125);
        assert_eq!(main.total_secs, 1.125);
        assert_eq!(main.lines[0].line_number, 2);
        assert_eq!(main.lines[1].line_number, 3);
        assert_eq!(main.lines[1].total_secs, 0.75);
        assert_eq!(main.lines[1].internal_secs, 0.5);
        assert_eq!(main.lines[1].external_secs, 0.25);
        assert_eq!(snap.callable_count(), 3);
    }

    #[test]
    fn test_snapshot_filter_and_foreign_toggle() {
        let options = ReportOptions {
            filter: CallableFilter::from_expr("regex=^test_").unwrap(),
            include_foreign: false,
            ..ReportOptions::default()
        };
        let snap = ReportSnapshot::from_store(&sample_store(), &options);
        assert_eq!(snap.functions.len(), 1);
        assert_eq!(snap.functions[0].name, "test_helper");
        assert!(snap.foreign.is_empty());
    }

    #[test]
    fn test_produce_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let sink = ReportSink::new(ReportOptions {
            format: ReportFormat::Json,
            ..ReportOptions::default()
        });

        let status = sink
            .produce_report(&sample_store(), path.to_str().unwrap())
            .unwrap();
        assert_eq!(status.callables, 3);

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["format"], JSON_FORMAT);
    }

    #[test]
    fn test_produce_report_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.txt");
        let sink = ReportSink::default();
        assert!(sink
            .produce_report(&sample_store(), path.to_str().unwrap())
            .is_err());
    }

    #[test]
    fn test_produce_report_stdout() {
        let status = ReportSink::default()
            .produce_report(&ReportStore::new(), "-")
            .unwrap();
        assert_eq!(status.callables, 0);
        assert_eq!(status.destination, "-");
    }
}
