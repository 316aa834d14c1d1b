// Disease Annotation Ingestion Module
//
// DAF-style annotation releases associate genes or alleles with DO terms.
// Both endpoints (the genetic entity and the ontology term) are loaded in
// earlier phases; the runner's barriers guarantee they exist before these
// edges are written.

pub mod models;

pub use models::{DiseaseAnnotation, DiseaseDocument};

use bgl_common::{BglError, Result};
use bgl_engine::{Batch, BatchSource, Record, RelationSpec};
use serde_json::json;
use std::path::Path;
use tracing::info;

const DISEASE_ANNOTATION_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (d:DOTerm {primaryKey: row.do_id}) \
    MATCH (o {primaryKey: row.object_id}) \
    MERGE (o)-[r:ASSOCIATION {associationType: row.association_type}]->(d) \
    SET r.evidenceCodes = split(row.evidence_codes, '|'), \
        r.publication = row.publication_id, \
        r.dateAssigned = row.date_assigned";

/// Relation specs for one provider's disease-annotation load.
pub fn relation_specs(provider: &str, commit_chunk_size: u64) -> Vec<RelationSpec> {
    vec![RelationSpec::new(
        "disease_annotation",
        DISEASE_ANNOTATION_STATEMENT,
        format!("disease_annotation_{provider}.csv"),
    )
    .with_commit_chunk_size(commit_chunk_size)]
}

/// Lazily batches one provider's disease annotations.
pub struct DiseaseTransformer {
    provider: String,
    entries: std::vec::IntoIter<DiseaseAnnotation>,
    batch_size: usize,
}

impl DiseaseTransformer {
    pub fn new(
        provider: impl Into<String>,
        entries: Vec<DiseaseAnnotation>,
        batch_size: usize,
    ) -> Self {
        Self {
            provider: provider.into(),
            entries: entries.into_iter(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        provider: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self> {
        let provider = provider.into();
        let text = std::fs::read_to_string(path.as_ref())?;
        let document: DiseaseDocument = serde_json::from_str(&text)
            .map_err(|err| BglError::Parse(format!("disease release for {provider}: {err}")))?;
        info!(
            provider = %provider,
            annotations = document.data.len(),
            "parsed disease-annotation release"
        );
        Ok(Self::new(provider, document.data, batch_size))
    }
}

impl BatchSource for DiseaseTransformer {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let entries: Vec<DiseaseAnnotation> =
            self.entries.by_ref().take(self.batch_size).collect();
        if entries.is_empty() {
            return Ok(None);
        }

        let mut annotations = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut record = Record::new();
            record.insert("object_id".into(), json!(entry.object_id));
            record.insert("do_id".into(), json!(entry.do_id));
            record.insert("association_type".into(), json!(entry.association_type));
            // evidence codes travel as one |-joined field
            record.insert("evidence_codes".into(), json!(entry.evidence_codes));
            record.insert("publication_id".into(), json!(entry.publication_id));
            record.insert("date_assigned".into(), json!(entry.date_assigned));
            annotations.push(record);
        }

        tracing::debug!(
            provider = %self.provider,
            annotations = annotations.len(),
            "disease batch ready"
        );
        Ok(Some(Batch::new(vec![annotations])))
    }
}
