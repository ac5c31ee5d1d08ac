//! Console sink: one line per sample on stdout.
//!
//! `<timestamp> <device>:<field id> <FIELD_NAME>:<value>`

use std::io::{self, Write};

use chrono::SecondsFormat;
use tracing::warn;

use gpuwatch_core::{Sample, SampleSink};

pub struct ConsoleSink<W: Write> {
    out: W,
    write_failed: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            write_failed: false,
        }
    }

    /// Flush and hand the writer back.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

pub fn format_sample(device_index: u32, sample: &Sample) -> String {
    format!(
        "{} {}:{} {}:{}",
        sample
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        device_index,
        sample.field_id.raw(),
        sample.field_id,
        sample.value
    )
}

impl<W: Write> SampleSink for ConsoleSink<W> {
    fn on_sample(&mut self, device_index: u32, sample: Sample) {
        if let Err(e) = writeln!(self.out, "{}", format_sample(device_index, &sample)) {
            // a closed pipe would otherwise warn on every sample
            if !self.write_failed {
                warn!(error = %e, "cannot write sample");
                self.write_failed = true;
            }
        }
    }

    fn process_other_fields(&mut self) {
        if let Err(e) = self.out.flush() {
            if !self.write_failed {
                warn!(error = %e, "cannot flush samples");
                self.write_failed = true;
            }
        }
    }
}
