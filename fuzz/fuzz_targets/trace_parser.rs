#![no_main]

use libfuzzer_sys::fuzz_target;
use lineprof::trace_file;

fuzz_target!(|data: &[u8]| {
    // Neither parsing nor replaying may panic, whatever the input
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(trace) = trace_file::read_trace(input.as_bytes()) {
            let _ = trace_file::replay(&trace);
        }
    }
});
