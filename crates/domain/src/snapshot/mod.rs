//! Immutable collection snapshots.
//!
//! A snapshot is the complete result of one polling cycle: every sample
//! that survived mapping plus a per-resource status map. Snapshots are
//! built through [`SnapshotBuilder`], which enforces the series
//! uniqueness invariant, and never mutated after `finish`.

use std::collections::{BTreeMap, HashSet};
use std::time::SystemTime;

use thiserror::Error;

use crate::catalog::MetricDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Label value count does not match the descriptor's declared names.
    #[error("{metric} takes {expected} label(s), got {got}")]
    LabelArity {
        metric: &'static str,
        expected: usize,
        got: usize,
    },

    /// Two samples in one snapshot share (metric, label values).
    #[error("duplicate series {metric}{{{labels}}}")]
    DuplicateSeries { metric: &'static str, labels: String },
}

/// Label values, aligned positionally with the owning descriptor's
/// `label_names`. Only constructed through [`Sample::new`], so the
/// alignment holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// One labeled reading of one metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub descriptor: &'static MetricDescriptor,
    pub labels: LabelSet,
    pub value: f64,
    /// Wall-clock start of the cycle that produced the reading.
    pub timestamp: SystemTime,
}

impl Sample {
    pub fn new(
        descriptor: &'static MetricDescriptor,
        label_values: Vec<String>,
        value: f64,
        timestamp: SystemTime,
    ) -> Result<Self, SnapshotError> {
        if label_values.len() != descriptor.label_names.len() {
            return Err(SnapshotError::LabelArity {
                metric: descriptor.name,
                expected: descriptor.label_names.len(),
                got: label_values.len(),
            });
        }
        Ok(Self {
            descriptor,
            labels: LabelSet(label_values),
            value,
            timestamp,
        })
    }

    fn series_key(&self) -> (&'static str, Vec<String>) {
        (self.descriptor.name, self.labels.0.clone())
    }
}

/// Why a resource has no samples in this snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Ok,
    Degraded { reason: String },
}

impl ResourceStatus {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// The result of one complete polling cycle. Readers share it via
/// `Arc`; it never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub started_at: SystemTime,
    pub samples: Vec<Sample>,
    pub status: BTreeMap<String, ResourceStatus>,
}

impl Snapshot {
    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.status.values().filter(|s| !s.is_ok()).count()
    }
}

/// Accumulates one cycle's samples while rejecting duplicate series.
pub struct SnapshotBuilder {
    started_at: SystemTime,
    samples: Vec<Sample>,
    seen: HashSet<(&'static str, Vec<String>)>,
    status: BTreeMap<String, ResourceStatus>,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new(started_at: SystemTime) -> Self {
        Self {
            started_at,
            samples: Vec::new(),
            seen: HashSet::new(),
            status: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, sample: Sample) -> Result<(), SnapshotError> {
        if !self.seen.insert(sample.series_key()) {
            return Err(SnapshotError::DuplicateSeries {
                metric: sample.descriptor.name,
                labels: sample.labels.0.join(","),
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Adds all samples or none: a duplicate anywhere in the batch
    /// leaves the builder untouched, so a resource whose mapping
    /// violates the invariant can be degraded cleanly.
    pub fn extend(&mut self, samples: Vec<Sample>) -> Result<(), SnapshotError> {
        let mut keys = Vec::with_capacity(samples.len());
        for sample in &samples {
            let key = sample.series_key();
            if self.seen.contains(&key) || keys.contains(&key) {
                return Err(SnapshotError::DuplicateSeries {
                    metric: sample.descriptor.name,
                    labels: sample.labels.0.join(","),
                });
            }
            keys.push(key);
        }
        self.seen.extend(keys);
        self.samples.extend(samples);
        Ok(())
    }

    pub fn mark_ok(&mut self, resource: impl Into<String>) {
        self.status.insert(resource.into(), ResourceStatus::Ok);
    }

    pub fn mark_degraded(&mut self, resource: impl Into<String>, reason: impl Into<String>) {
        self.status.insert(
            resource.into(),
            ResourceStatus::Degraded {
                reason: reason.into(),
            },
        );
    }

    #[must_use]
    pub fn finish(self) -> Snapshot {
        Snapshot {
            started_at: self.started_at,
            samples: self.samples,
            status: self.status,
        }
    }
}
