// ── Default fields and unit normalization ──

use std::collections::BTreeMap;

use gpuwatch_api::{FieldId, FieldValue, Sample};

/// Fields watched when the configuration names none.
pub const DEFAULT_FIELDS: [FieldId; 6] = [
    FieldId::GPU_MEMORY_USAGE,
    FieldId::GPU_MEMORY_TOTAL,
    FieldId::POWER_USAGE,
    FieldId::GPU_CLOCK,
    FieldId::GPU_UTIL,
    FieldId::GPU_TEMP,
];

pub fn default_fields() -> Vec<FieldId> {
    DEFAULT_FIELDS.to_vec()
}

/// Per-field multiplicative scale factors.
///
/// Only numeric samples are scaled. Integer samples are multiplied in
/// floating point and truncated toward zero; double samples keep their
/// precision. Fields without an entry pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConversionTable {
    factors: BTreeMap<FieldId, f64>,
}

impl Default for UnitConversionTable {
    fn default() -> Self {
        Self::curated()
    }
}

impl UnitConversionTable {
    /// Factors for the default fields, in the units consumers display.
    pub fn curated() -> Self {
        Self::from_iter([
            (FieldId::GPU_MEMORY_USAGE, 0.000_001), // bytes -> MB
            (FieldId::GPU_MEMORY_TOTAL, 0.000_001), // bytes -> MB
            (FieldId::POWER_USAGE, 0.000_001),      // uW -> W
            (FieldId::GPU_CLOCK, 0.000_001),        // Hz -> MHz
            (FieldId::GPU_TEMP, 0.001),             // mC -> C
        ])
    }

    /// A table that converts nothing.
    pub fn empty() -> Self {
        Self {
            factors: BTreeMap::new(),
        }
    }

    /// Set the factor for `field`, returning the one it replaced.
    pub fn insert(&mut self, field: FieldId, factor: f64) -> Option<f64> {
        self.factors.insert(field, factor)
    }

    pub fn remove(&mut self, field: FieldId) -> Option<f64> {
        self.factors.remove(&field)
    }

    pub fn factor(&self, field: FieldId) -> Option<f64> {
        self.factors.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, f64)> + '_ {
        self.factors.iter().map(|(id, f)| (*id, *f))
    }

    /// Scale `sample` in place according to its field's factor.
    pub fn convert(&self, sample: &mut Sample) {
        let Some(factor) = self.factor(sample.field_id) else {
            return;
        };
        match &mut sample.value {
            FieldValue::Integer(raw) => *raw = scale_integer(*raw, factor),
            FieldValue::Double(raw) => *raw *= factor,
            FieldValue::String(_) | FieldValue::Blob(_) => {}
        }
    }
}

impl FromIterator<(FieldId, f64)> for UnitConversionTable {
    fn from_iter<I: IntoIterator<Item = (FieldId, f64)>>(iter: I) -> Self {
        Self {
            factors: iter.into_iter().collect(),
        }
    }
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
fn scale_integer(raw: i64, factor: f64) -> i64 {
    // saturating, truncates toward zero
    (raw as f64 * factor) as i64
}
