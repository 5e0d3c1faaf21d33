//! Callable filtering for reports
//!
//! Supports:
//! - Exact names: `name=main,helper`
//! - Regular expressions: `regex=^test_`

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::HashSet;

/// Decides which callables a report includes
#[derive(Debug, Clone, Default)]
pub enum CallableFilter {
    /// No filter: every callable is reported
    #[default]
    All,
    /// Exact printable names
    Names(HashSet<String>),
    /// Names matching a pattern
    Pattern(Regex),
}

impl CallableFilter {
    pub fn all() -> Self {
        Self::All
    }

    /// Parse a filter expression like `name=a,b` or `regex=^test_`
    pub fn from_expr(expr: &str) -> Result<Self> {
        if let Some(names) = expr.strip_prefix("name=") {
            let names: HashSet<String> = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                bail!("Empty name list in filter expression: {}", expr);
            }
            Ok(Self::Names(names))
        } else if let Some(pattern) = expr.strip_prefix("regex=") {
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid regex in filter expression: {}", pattern))?;
            Ok(Self::Pattern(regex))
        } else {
            bail!(
                "Invalid filter expression: {}. Expected name=A,B or regex=PATTERN",
                expr
            );
        }
    }

    /// Check if a callable with this printable name should be reported
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(set) => set.contains(name),
            Self::Pattern(regex) => regex.is_match(name),
        }
    }
}
