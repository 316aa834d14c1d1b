// Gene Ingestion Module
//
// Transforms provider gene releases (BGI-style JSON) into engine batches:
// gene nodes plus synonym, secondary-id, and genomic-location relations.
// Statement templates use the store's bulk CSV import path; the engine
// treats them as opaque text.

pub mod models;

pub use models::{BasicGeneticEntity, GeneDocument, GeneEntry, GenomeLocation};

use bgl_common::{BglError, Result};
use bgl_engine::{Batch, BatchSource, Record, RelationSpec};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Relation order produced by [`GeneTransformer`] batches.
pub const GENE_RELATIONS: usize = 4;

const GENE_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MERGE (g:Gene {primaryKey: row.primary_id}) \
    SET g.symbol = row.symbol, \
        g.name = row.name, \
        g.taxonId = row.taxon_id, \
        g.soTermId = row.so_term_id, \
        g.synopsis = row.synopsis";

const GENE_SYNONYM_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (g:Gene {primaryKey: row.primary_id}) \
    MERGE (s:Synonym {name: row.synonym}) \
    MERGE (g)-[:ALSO_KNOWN_AS]->(s)";

const GENE_SECONDARY_ID_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (g:Gene {primaryKey: row.primary_id}) \
    MERGE (s:SecondaryId {primaryKey: row.secondary_id}) \
    MERGE (g)-[:ALSO_KNOWN_AS]->(s)";

const GENE_LOCATION_STATEMENT: &str = "\
    LOAD CSV WITH HEADERS FROM $file AS row \
    WITH row SKIP $skip LIMIT $limit \
    MATCH (g:Gene {primaryKey: row.primary_id}) \
    MERGE (c:Chromosome {primaryKey: row.chromosome}) \
    MERGE (g)-[l:LOCATED_ON]->(c) \
    SET l.assembly = row.assembly, \
        l.start = row.start, \
        l.end = row.end, \
        l.strand = row.strand";

/// Relation specs for one provider's gene load, positionally aligned with
/// [`GeneTransformer`] batches.
pub fn relation_specs(provider: &str, commit_chunk_size: u64) -> Vec<RelationSpec> {
    vec![
        RelationSpec::new("gene", GENE_STATEMENT, format!("gene_{provider}.csv"))
            .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "gene_synonym",
            GENE_SYNONYM_STATEMENT,
            format!("gene_synonym_{provider}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "gene_secondary_id",
            GENE_SECONDARY_ID_STATEMENT,
            format!("gene_secondary_id_{provider}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "gene_location",
            GENE_LOCATION_STATEMENT,
            format!("gene_location_{provider}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
    ]
}

/// Lazily batches one provider's gene entries for the staging writer.
pub struct GeneTransformer {
    provider: String,
    entries: std::vec::IntoIter<GeneEntry>,
    batch_size: usize,
}

impl GeneTransformer {
    pub fn new(provider: impl Into<String>, entries: Vec<GeneEntry>, batch_size: usize) -> Self {
        Self {
            provider: provider.into(),
            entries: entries.into_iter(),
            batch_size: batch_size.max(1),
        }
    }

    /// Parse a provider release file and build a transformer over it.
    pub fn from_file(
        path: impl AsRef<Path>,
        provider: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self> {
        let provider = provider.into();
        let text = std::fs::read_to_string(path.as_ref())?;
        let document: GeneDocument = serde_json::from_str(&text)
            .map_err(|err| BglError::Parse(format!("gene release for {provider}: {err}")))?;
        info!(
            provider = %provider,
            genes = document.data.len(),
            "parsed gene release"
        );
        Ok(Self::new(provider, document.data, batch_size))
    }
}

impl BatchSource for GeneTransformer {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let entries: Vec<GeneEntry> = self.entries.by_ref().take(self.batch_size).collect();
        if entries.is_empty() {
            return Ok(None);
        }

        let mut genes = Vec::with_capacity(entries.len());
        let mut synonyms = Vec::new();
        let mut secondary_ids = Vec::new();
        let mut locations = Vec::new();

        for entry in entries {
            let basic = &entry.basic_genetic_entity;
            let mut gene = Record::new();
            gene.insert("primary_id".into(), json!(basic.primary_id));
            gene.insert("symbol".into(), json!(entry.symbol));
            gene.insert("name".into(), json!(entry.name));
            gene.insert("taxon_id".into(), json!(basic.taxon_id));
            gene.insert("so_term_id".into(), json!(entry.so_term_id));
            gene.insert("synopsis".into(), json!(entry.gene_synopsis));
            genes.push(gene);

            for synonym in &basic.synonyms {
                let mut record = Record::new();
                record.insert("primary_id".into(), json!(basic.primary_id));
                record.insert("synonym".into(), json!(synonym));
                synonyms.push(record);
            }

            for secondary_id in &basic.secondary_ids {
                let mut record = Record::new();
                record.insert("primary_id".into(), json!(basic.primary_id));
                record.insert("secondary_id".into(), json!(secondary_id));
                secondary_ids.push(record);
            }

            for location in &basic.genome_locations {
                let mut record = Record::new();
                record.insert("primary_id".into(), json!(basic.primary_id));
                record.insert("chromosome".into(), json!(location.chromosome));
                record.insert("assembly".into(), json!(location.assembly));
                record.insert("start".into(), json!(location.start_position));
                record.insert("end".into(), json!(location.end_position));
                record.insert("strand".into(), json!(location.strand));
                locations.push(record);
            }
        }

        tracing::debug!(
            provider = %self.provider,
            genes = genes.len(),
            synonyms = synonyms.len(),
            "gene batch ready"
        );
        Ok(Some(Batch::new(vec![
            genes,
            synonyms,
            secondary_ids,
            locations,
        ])))
    }
}
