//! Batch protocol between extractors and the engine
//!
//! An extractor produces a finite, lazy sequence of [`Batch`]es. Each batch
//! carries one record list per destination relation, positionally aligned
//! with the [`RelationSpec`](crate::staging::RelationSpec) list handed to the
//! staging writer. The engine does not interpret record semantics; it only
//! requires that records are flat key -> scalar-or-list mappings and that the
//! first record of a relation is representative of later records' keys.

use bgl_common::Result;

/// A flat record: key -> scalar-or-list.
///
/// `serde_json` is built with `preserve_order`, so staging headers keep the
/// key order providers emit fields in.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One generator output unit: one record list per destination relation.
#[derive(Debug, Default)]
pub struct Batch {
    relations: Vec<Vec<Record>>,
}

impl Batch {
    pub fn new(relations: Vec<Vec<Record>>) -> Self {
        Self { relations }
    }

    /// Number of per-relation record lists in this batch.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Records destined for relation `index`.
    pub fn relation(&self, index: usize) -> &[Record] {
        &self.relations[index]
    }

    pub fn into_relations(self) -> Vec<Vec<Record>> {
        self.relations
    }

    /// True when every relation list is empty.
    pub fn is_empty(&self) -> bool {
        self.relations.iter().all(Vec::is_empty)
    }
}

/// A lazy, finite source of batches, consumed exactly once by one
/// [`StagingWriter`](crate::staging::StagingWriter).
pub trait BatchSource {
    /// Produce the next batch, or `None` when exhausted.
    fn next_batch(&mut self) -> Result<Option<Batch>>;
}

/// A batch source over pre-built batches.
///
/// Small extractors build their batches eagerly; tests script exact batch
/// sequences with this.
pub struct VecBatchSource {
    batches: std::vec::IntoIter<Batch>,
}

impl VecBatchSource {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self {
            batches: batches.into_iter(),
        }
    }
}

impl BatchSource for VecBatchSource {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        Ok(self.batches.next())
    }
}
