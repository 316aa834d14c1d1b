// Orthology Ingestion Module
//
// Cross-species orthology pairs between genes loaded in the first phase.
// Pairs are directional in the release files; the statement merges one
// directed edge per pair and the reciprocal pair arrives as its own record.

pub mod models;

pub use models::{OrthologyDocument, OrthologyPair};

use bgl_common::{BglError, Result};
use bgl_engine::{Batch, BatchSource, Record, RelationSpec};
use serde_json::json;
use std::path::Path;
use tracing::info;

const ORTHOLOGY_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (g1:Gene {primaryKey: row.gene_id}) \
    MATCH (g2:Gene {primaryKey: row.ortholog_gene_id}) \
    MERGE (g1)-[o:ORTHOLOGOUS]->(g2) \
    SET o.isBestScore = row.is_best_score, \
        o.isBestRevScore = row.is_best_rev_score, \
        o.matched = split(row.methods_matched, '|'), \
        o.notMatched = split(row.methods_not_matched, '|')";

/// Relation specs for one provider's orthology load.
pub fn relation_specs(provider: &str, commit_chunk_size: u64) -> Vec<RelationSpec> {
    vec![RelationSpec::new(
        "orthology",
        ORTHOLOGY_STATEMENT,
        format!("orthology_{provider}.csv"),
    )
    .with_commit_chunk_size(commit_chunk_size)]
}

/// Lazily batches one provider's orthology pairs.
pub struct OrthologyTransformer {
    provider: String,
    pairs: std::vec::IntoIter<OrthologyPair>,
    batch_size: usize,
}

impl OrthologyTransformer {
    pub fn new(
        provider: impl Into<String>,
        pairs: Vec<OrthologyPair>,
        batch_size: usize,
    ) -> Self {
        Self {
            provider: provider.into(),
            pairs: pairs.into_iter(),
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
        let document: OrthologyDocument = serde_json::from_str(&text)
            .map_err(|err| BglError::Parse(format!("orthology release for {provider}: {err}")))?;
        info!(
            provider = %provider,
            pairs = document.data.len(),
            "parsed orthology release"
        );
        Ok(Self::new(provider, document.data, batch_size))
    }
}

impl BatchSource for OrthologyTransformer {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let pairs: Vec<OrthologyPair> = self.pairs.by_ref().take(self.batch_size).collect();
        if pairs.is_empty() {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let mut record = Record::new();
            record.insert("gene_id".into(), json!(pair.gene1));
            record.insert("ortholog_gene_id".into(), json!(pair.gene2));
            record.insert("gene_species".into(), json!(pair.gene1_species));
            record.insert("ortholog_species".into(), json!(pair.gene2_species));
            record.insert("is_best_score".into(), json!(pair.is_best_score));
            record.insert("is_best_rev_score".into(), json!(pair.is_best_rev_score));
            record.insert(
                "methods_matched".into(),
                json!(pair.prediction_methods_matched),
            );
            record.insert(
                "methods_not_matched".into(),
                json!(pair.prediction_methods_not_matched),
            );
            records.push(record);
        }

        tracing::debug!(
            provider = %self.provider,
            pairs = records.len(),
            "orthology batch ready"
        );
        Ok(Some(Batch::new(vec![records])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "gene1": "MGI:97490",
                "gene1Species": 10090,
                "gene2": "HGNC:8620",
                "gene2Species": 9606,
                "predictionMethodsMatched": ["Ensembl Compara", "PANTHER"],
                "predictionMethodsNotMatched": ["OMA"],
                "isBestScore": true,
                "isBestRevScore": false
            }
        ]
    }"#;

    #[test]
    fn test_parse_orthology_release() {
        let document: OrthologyDocument = serde_json::from_str(SAMPLE).unwrap();
        let pair = &document.data[0];
        assert_eq!(pair.gene1, "MGI:97490");
        assert_eq!(pair.gene2_species, 9606);
        assert_eq!(pair.prediction_methods_matched.len(), 2);
    }

    #[test]
    fn test_transformer_builds_single_relation() {
        let document: OrthologyDocument = serde_json::from_str(SAMPLE).unwrap();
        let mut transformer = OrthologyTransformer::new("MGI", document.data, 10);

        let batch = transformer.next_batch().unwrap().unwrap();
        assert_eq!(batch.relation_count(), 1);
        let record = &batch.relation(0)[0];
        assert_eq!(record["ortholog_gene_id"], "HGNC:8620");
        assert_eq!(record["is_best_score"], true);
        assert!(transformer.next_batch().unwrap().is_none());
    }
}
