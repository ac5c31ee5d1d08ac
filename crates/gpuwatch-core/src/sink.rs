use gpuwatch_api::Sample;

/// Receives every converted sample a reader produces.
///
/// Implemented by consumers (console printers, metric exporters). Any
/// `FnMut(u32, Sample)` closure is a sink.
pub trait SampleSink {
    /// Called once per successfully fetched field per pass.
    fn on_sample(&mut self, device_index: u32, sample: Sample);

    /// Called once per pass after the device x field matrix, for
    /// consumer-specific fields gathered outside the watch.
    fn process_other_fields(&mut self) {}
}

impl<F> SampleSink for F
where
    F: FnMut(u32, Sample),
{
    fn on_sample(&mut self, device_index: u32, sample: Sample) {
        self(device_index, sample);
    }
}
