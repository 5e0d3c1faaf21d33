//! Profiler configuration file (`lineprof.toml`)
//!
//! Every field is optional; command-line flags override file values.
//!
//! # Example lineprof.toml
//!
//! ```toml
//! [report]
//! format = "json"          # text | json | csv
//! destination = "report.json"
//! hide_idle_lines = true
//! include_foreign = false
//! filter = "regex=^test_"
//! ```

use crate::filter::CallableFilter;
use crate::report::{ReportFormat, ReportOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilerConfig {
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[report]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// `-` for standard output, otherwise a file path
    pub destination: String,
    pub hide_idle_lines: bool,
    pub include_foreign: bool,
    /// Filter expression, `name=a,b` or `regex=PATTERN`
    pub filter: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            destination: "-".to_string(),
            hide_idle_lines: false,
            include_foreign: true,
            filter: None,
        }
    }
}

impl ProfilerConfig {
    /// Load configuration from a TOML file
    ///
    /// ```no_run
    /// use lineprof::config::ProfilerConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = ProfilerConfig::from_file("lineprof.toml")?;
    /// println!("Reporting to {}", config.report.destination);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Build report options, compiling the filter expression
    pub fn to_report_options(&self) -> Result<ReportOptions> {
        let filter = match &self.report.filter {
            Some(expr) => CallableFilter::from_expr(expr)?,
            None => CallableFilter::All,
        };
        Ok(ReportOptions {
            format: self.report.format,
            hide_idle_lines: self.report.hide_idle_lines,
            include_foreign: self.report.include_foreign,
            filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config() {
        let config = ProfilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProfilerConfig::default());
        assert_eq!(config.report.destination, "-");
        assert!(config.report.include_foreign);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [report]
            format = "csv"
            destination = "out.csv"
            hide_idle_lines = true
            include_foreign = false
            filter = "name=main"
        "#;

        let config = ProfilerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.report.format, ReportFormat::Csv);
        assert_eq!(config.report.destination, "out.csv");

        let options = config.to_report_options().unwrap();
        assert!(options.hide_idle_lines);
        assert!(!options.include_foreign);
        assert!(options.filter.matches("main"));
        assert!(!options.filter.matches("helper"));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = ProfilerConfig::from_toml_str("[report]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.destination, "-");
        assert!(config.report.include_foreign);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(ProfilerConfig::from_toml_str("[report\nformat = 1").is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(ProfilerConfig::from_toml_str("[report]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(ProfilerConfig::from_toml_str("[report]\ncolour = true\n").is_err());
    }

    #[test]
    fn test_invalid_filter_surfaces_on_options() {
        let config = ProfilerConfig::from_toml_str("[report]\nfilter = \"regex=(\"\n").unwrap();
        assert!(config.to_report_options().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[report]\nhide_idle_lines = true").unwrap();

        let config = ProfilerConfig::from_file(file.path()).unwrap();
        assert!(config.report.hide_idle_lines);
    }

    #[test]
    fn test_from_missing_file() {
        let err = ProfilerConfig::from_file("/nonexistent/lineprof.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
