// ── Sampling pass ──
//
// One pass fetches the latest value of every watched field on every
// watched device. Individual fetch failures are normal (a field may not
// apply to a device) and are skipped; only a pass where nothing at all
// came back is reported as a failure.

use gpuwatch_api::{FieldId, Session};
use tracing::{debug, trace};

use crate::fields::UnitConversionTable;
use crate::sink::SampleSink;

/// Aggregate result of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No devices or no fields: nothing was attempted.
    Empty,
    /// At least one sample was delivered.
    Delivered { samples: usize, skipped: usize },
    /// Every fetch over a non-empty matrix failed.
    TotalFailure { attempted: usize },
}

impl PassOutcome {
    pub fn is_total_failure(self) -> bool {
        matches!(self, Self::TotalFailure { .. })
    }

    /// Samples handed to the sink during the pass.
    pub fn delivered(self) -> usize {
        match self {
            Self::Delivered { samples, .. } => samples,
            Self::Empty | Self::TotalFailure { .. } => 0,
        }
    }
}

pub struct Poller<'a, S> {
    session: &'a S,
    devices: &'a [u32],
    fields: &'a [FieldId],
    conversion: &'a UnitConversionTable,
}

impl<'a, S: Session> Poller<'a, S> {
    pub fn new(
        session: &'a S,
        devices: &'a [u32],
        fields: &'a [FieldId],
        conversion: &'a UnitConversionTable,
    ) -> Self {
        Self {
            session,
            devices,
            fields,
            conversion,
        }
    }

    /// Run one pass, delivering converted samples to `sink` in
    /// device-major order, then let the sink handle its own fields.
    pub async fn process<K: SampleSink + ?Sized>(&self, sink: &mut K) -> PassOutcome {
        let mut samples = 0;
        let mut skipped = 0;

        for &device in self.devices {
            for &field in self.fields {
                match self.session.latest_value(device, field).await {
                    Ok(mut sample) => {
                        trace!(device, field = %field, raw = %sample.value, "fetched");
                        self.conversion.convert(&mut sample);
                        sink.on_sample(device, sample);
                        samples += 1;
                    }
                    Err(e) => {
                        debug!(device, field = %field, error = %e, "fetch skipped");
                        skipped += 1;
                    }
                }
            }
        }

        sink.process_other_fields();

        if self.devices.is_empty() || self.fields.is_empty() {
            PassOutcome::Empty
        } else if samples == 0 {
            PassOutcome::TotalFailure { attempted: skipped }
        } else {
            PassOutcome::Delivered { samples, skipped }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gpuwatch_api::{
        EmbeddedSession, FieldValue, OperationMode, Sample, WatchPolicy,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Collect {
        samples: Vec<(u32, Sample)>,
        other_calls: usize,
    }

    impl SampleSink for Collect {
        fn on_sample(&mut self, device_index: u32, sample: Sample) {
            self.samples.push((device_index, sample));
        }

        fn process_other_fields(&mut self) {
            self.other_calls += 1;
        }
    }

    async fn watched(devices: &[u32], fields: &[FieldId]) -> EmbeddedSession {
        let session = EmbeddedSession::with_devices(OperationMode::Auto, vec![0, 1]);
        let gid = session.create_device_group("g").await.unwrap();
        for &d in devices {
            session.add_device_to_group(gid, d).await.unwrap();
        }
        let fgid = session.create_field_group("f", fields).await.unwrap();
        session.watch(gid, fgid, &WatchPolicy::default()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn partial_failures_are_skipped() {
        let fields = [FieldId::POWER_USAGE, FieldId::GPU_UTIL];
        let session = watched(&[0, 1], &fields).await;
        session
            .record(1, FieldId::POWER_USAGE, FieldValue::Integer(120_000_000))
            .await
            .unwrap();

        let table = UnitConversionTable::curated();
        let poller = Poller::new(&session, &[0, 1], &fields, &table);
        let mut sink = Collect::default();
        let outcome = poller.process(&mut sink).await;

        assert_eq!(outcome, PassOutcome::Delivered { samples: 1, skipped: 3 });
        assert_eq!(sink.samples.len(), 1);
        assert_eq!(sink.samples[0].0, 1);
        assert_eq!(sink.samples[0].1.value, FieldValue::Integer(120));
        assert_eq!(sink.other_calls, 1);
    }

    #[tokio::test]
    async fn nothing_fetched_is_total_failure() {
        let fields = [FieldId::GPU_TEMP];
        let session = watched(&[0], &fields).await;
        let table = UnitConversionTable::curated();
        let mut sink = Collect::default();

        let outcome = Poller::new(&session, &[0], &fields, &table)
            .process(&mut sink)
            .await;

        assert_eq!(outcome, PassOutcome::TotalFailure { attempted: 1 });
        assert!(outcome.is_total_failure());
        assert_eq!(sink.other_calls, 1);
    }

    #[tokio::test]
    async fn empty_matrix_is_never_a_failure() {
        let session = EmbeddedSession::start(OperationMode::Auto);
        let table = UnitConversionTable::curated();
        let mut sink = Collect::default();

        let no_devices = Poller::new(&session, &[], &[FieldId::GPU_TEMP], &table)
            .process(&mut sink)
            .await;
        let no_fields = Poller::new(&session, &[0], &[], &table)
            .process(&mut sink)
            .await;

        assert_eq!(no_devices, PassOutcome::Empty);
        assert_eq!(no_fields, PassOutcome::Empty);
        assert_eq!(sink.other_calls, 2);
    }

    #[tokio::test]
    async fn closures_are_sinks() {
        let fields = [FieldId::GPU_UTIL];
        let session = watched(&[0], &fields).await;
        session
            .record(0, FieldId::GPU_UTIL, FieldValue::Integer(55))
            .await
            .unwrap();
        let table = UnitConversionTable::curated();

        let mut seen = Vec::new();
        let mut sink = |device: u32, sample: Sample| seen.push((device, sample.value));
        let outcome = Poller::new(&session, &[0], &fields, &table)
            .process(&mut sink)
            .await;

        assert_eq!(outcome.delivered(), 1);
        assert_eq!(seen, vec![(0, FieldValue::Integer(55))]);
    }
}
