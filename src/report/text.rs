//! Plain-text report
//!
//! ```text
//! Name: main, 0.125000
//! 0.250000(0.250000/0.000000):     total = 0
//! 0.750000(0.500000/0.250000):     total += len(xs)
//! Name: <built-in function len>, 0.250000
//! ```

use super::ReportSnapshot;
use std::fmt::Write;

pub fn render_text(snapshot: &ReportSnapshot, hide_idle_lines: bool) -> String {
    let mut out = String::new();

    for function in &snapshot.functions {
        // writing into a String cannot fail
        let _ = writeln!(out, "Name: {}, {:.6}", function.name, function.overhead_secs);
        for line in &function.lines {
            if hide_idle_lines && line.is_idle() {
                continue;
            }
            let _ = write!(
                out,
                "{:.6}({:.6}/{:.6}): {}",
                line.total_secs, line.internal_secs, line.external_secs, line.text
            );
            if !line.text.ends_with('\n') {
                out.push('\n');
            }
        }
    }

    for foreign in &snapshot.foreign {
        let _ = writeln!(out, "Name: {}, {:.6}", foreign.name, foreign.overhead_secs);
    }

    out
}
