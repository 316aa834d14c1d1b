// Allele Ingestion Module
//
// Allele releases reference the gene nodes loaded in the preceding phase;
// the runner enforces that ordering with a completion barrier, not this
// module.

pub mod models;

pub use models::{AlleleDocument, AlleleEntry};

use bgl_common::{BglError, Result};
use bgl_engine::{Batch, BatchSource, Record, RelationSpec};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Relation order produced by [`AlleleTransformer`] batches.
pub const ALLELE_RELATIONS: usize = 3;

const ALLELE_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MERGE (a:Allele {primaryKey: row.primary_id}) \
    SET a.symbol = row.symbol, \
        a.taxonId = row.taxon_id, \
        a.description = row.description";

const ALLELE_GENE_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (a:Allele {primaryKey: row.primary_id}) \
    MATCH (g:Gene {primaryKey: row.gene_id}) \
    MERGE (a)-[:IS_ALLELE_OF]->(g)";

const ALLELE_SYNONYM_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (a:Allele {primaryKey: row.primary_id}) \
    MERGE (s:Synonym {name: row.synonym}) \
    MERGE (a)-[:ALSO_KNOWN_AS]->(s)";

/// Relation specs for one provider's allele load.
pub fn relation_specs(provider: &str, commit_chunk_size: u64) -> Vec<RelationSpec> {
    vec![
        RelationSpec::new("allele", ALLELE_STATEMENT, format!("allele_{provider}.csv"))
            .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "allele_gene",
            ALLELE_GENE_STATEMENT,
            format!("allele_gene_{provider}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "allele_synonym",
            ALLELE_SYNONYM_STATEMENT,
            format!("allele_synonym_{provider}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
    ]
}

/// Lazily batches one provider's allele entries.
pub struct AlleleTransformer {
    provider: String,
    entries: std::vec::IntoIter<AlleleEntry>,
    batch_size: usize,
}

impl AlleleTransformer {
    pub fn new(provider: impl Into<String>, entries: Vec<AlleleEntry>, batch_size: usize) -> Self {
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
        let document: AlleleDocument = serde_json::from_str(&text)
            .map_err(|err| BglError::Parse(format!("allele release for {provider}: {err}")))?;
        info!(
            provider = %provider,
            alleles = document.data.len(),
            "parsed allele release"
        );
        Ok(Self::new(provider, document.data, batch_size))
    }
}

impl BatchSource for AlleleTransformer {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let entries: Vec<AlleleEntry> = self.entries.by_ref().take(self.batch_size).collect();
        if entries.is_empty() {
            return Ok(None);
        }

        let mut alleles = Vec::with_capacity(entries.len());
        let mut gene_edges = Vec::new();
        let mut synonyms = Vec::new();

        for entry in entries {
            let mut allele = Record::new();
            allele.insert("primary_id".into(), json!(entry.primary_id));
            allele.insert("symbol".into(), json!(entry.symbol));
            allele.insert("taxon_id".into(), json!(entry.taxon_id));
            allele.insert("description".into(), json!(entry.description));
            alleles.push(allele);

            if let Some(gene_id) = &entry.gene_id {
                let mut record = Record::new();
                record.insert("primary_id".into(), json!(entry.primary_id));
                record.insert("gene_id".into(), json!(gene_id));
                gene_edges.push(record);
            }

            for synonym in &entry.synonyms {
                let mut record = Record::new();
                record.insert("primary_id".into(), json!(entry.primary_id));
                record.insert("synonym".into(), json!(synonym));
                synonyms.push(record);
            }
        }

        tracing::debug!(
            provider = %self.provider,
            alleles = alleles.len(),
            "allele batch ready"
        );
        Ok(Some(Batch::new(vec![alleles, gene_edges, synonyms])))
    }
}
