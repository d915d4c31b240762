use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;

use crate::documents::record::{Fields, Record};
use crate::metrics_consts::{DOCUMENTS_DROPPED_COUNTER, DOCUMENTS_RECONCILED_COUNTER};

/// Electrical fields a supplemental record may contribute to its primary.
pub const DEFAULT_MERGE_FIELDS: [&str; 8] = ["ia", "ib", "ic", "p", "ep", "ua", "ub", "uc"];

/// How supplemental records find their primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Records are handled in the order the store returned them. A supplemental
    /// record seen before its primary is dropped, and fields merged into a primary
    /// are lost when a later primary with the same key replaces it.
    #[default]
    Sequential,
    /// All primaries are collected first, then every supplemental record is merged
    /// into the surviving primary for its key, regardless of position.
    Grouped,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseReconcileModeError(String);

impl std::fmt::Display for ParseReconcileModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown reconcile mode: {}", self.0)
    }
}

impl std::error::Error for ParseReconcileModeError {}

impl FromStr for ReconcileMode {
    type Err = ParseReconcileModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(ReconcileMode::Sequential),
            "grouped" => Ok(ReconcileMode::Grouped),
            other => Err(ParseReconcileModeError(other.to_string())),
        }
    }
}

/// The whitelist of field names copied from supplemental records, in copy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFields(Vec<String>);

impl MergeFields {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MergeFields(names.into_iter().map(Into::into).collect())
    }

    /// Copies every whitelisted, non-null field of `supplemental` into `primary`,
    /// overwriting what is there.
    pub fn merge_into(&self, primary: &mut Fields, mut supplemental: Fields) {
        for name in &self.0 {
            match supplemental.remove(name) {
                None | Some(serde_json::Value::Null) => {}
                Some(value) => {
                    primary.insert(name.clone(), value);
                }
            }
        }
    }
}

impl Default for MergeFields {
    fn default() -> Self {
        MergeFields::new(DEFAULT_MERGE_FIELDS)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub primaries: usize,
    pub replaced: usize,
    pub merged: usize,
    pub dropped: usize,
}

/// Primaries keyed by identity, remembering where each key was first inserted.
#[derive(Default)]
struct PrimarySet {
    positions: HashMap<String, usize>,
    records: Vec<Fields>,
}

impl PrimarySet {
    /// Returns true when an earlier primary with the same key was replaced.
    fn insert(&mut self, key: String, fields: Fields) -> bool {
        match self.positions.entry(key) {
            Entry::Occupied(slot) => {
                self.records[*slot.get()] = fields;
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(self.records.len());
                self.records.push(fields);
                false
            }
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Fields> {
        let position = *self.positions.get(key)?;
        self.records.get_mut(position)
    }
}

/// Folds supplemental documents into the primary documents they describe.
///
/// `reconcile` takes ownership of the documents it is given and returns new ones;
/// nothing the caller still holds is modified.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    merge_fields: MergeFields,
    mode: ReconcileMode,
}

impl Reconciler {
    pub fn new(merge_fields: MergeFields, mode: ReconcileMode) -> Self {
        Reconciler { merge_fields, mode }
    }

    /// Returns the primary documents, without `powerDetail`, in the order their
    /// identity keys first appeared among primaries.
    pub fn reconcile(&self, documents: Vec<Fields>) -> Vec<Fields> {
        let (records, stats) = self.reconcile_with_stats(documents);

        tracing::debug!(
            mode = ?self.mode,
            primaries = stats.primaries,
            replaced = stats.replaced,
            merged = stats.merged,
            dropped = stats.dropped,
            "reconciled documents"
        );
        metrics::counter!(DOCUMENTS_RECONCILED_COUNTER).increment(stats.merged as u64);
        metrics::counter!(DOCUMENTS_DROPPED_COUNTER).increment(stats.dropped as u64);

        records
    }

    pub fn reconcile_with_stats(&self, documents: Vec<Fields>) -> (Vec<Fields>, ReconcileStats) {
        let records = documents.into_iter().map(Record::classify);

        match self.mode {
            ReconcileMode::Sequential => self.sequential(records),
            ReconcileMode::Grouped => self.grouped(records),
        }
    }

    fn sequential(&self, records: impl Iterator<Item = Record>) -> (Vec<Fields>, ReconcileStats) {
        let mut primaries = PrimarySet::default();
        let mut stats = ReconcileStats::default();

        for record in records {
            let key = record.identity_key();
            match record {
                Record::Primary { fields, .. } => {
                    if primaries.insert(key, fields) {
                        stats.replaced += 1;
                    }
                }
                Record::Supplemental { fields } => match primaries.get_mut(&key) {
                    Some(primary) => {
                        self.merge_fields.merge_into(primary, fields);
                        stats.merged += 1;
                    }
                    None => stats.dropped += 1,
                },
            }
        }

        stats.primaries = primaries.records.len();
        (primaries.records, stats)
    }

    fn grouped(&self, records: impl Iterator<Item = Record>) -> (Vec<Fields>, ReconcileStats) {
        let mut primaries = PrimarySet::default();
        let mut supplementals = Vec::new();
        let mut stats = ReconcileStats::default();

        for record in records {
            let key = record.identity_key();
            match record {
                Record::Primary { fields, .. } => {
                    if primaries.insert(key, fields) {
                        stats.replaced += 1;
                    }
                }
                Record::Supplemental { fields } => supplementals.push((key, fields)),
            }
        }

        for (key, fields) in supplementals {
            match primaries.get_mut(&key) {
                Some(primary) => {
                    self.merge_fields.merge_into(primary, fields);
                    stats.merged += 1;
                }
                None => stats.dropped += 1,
            }
        }

        stats.primaries = primaries.records.len();
        (primaries.records, stats)
    }
}
