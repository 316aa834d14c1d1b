//! Gene record models (BGI-style provider JSON)
//!
//! Providers publish gene releases as a JSON document with a `data` array of
//! gene entries. Only the fields the graph schema consumes are modeled;
//! unknown fields are ignored.

use serde::Deserialize;

/// Top-level gene release document.
#[derive(Debug, Deserialize)]
pub struct GeneDocument {
    pub data: Vec<GeneEntry>,
}

/// One curated gene record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneEntry {
    pub basic_genetic_entity: BasicGeneticEntity,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub so_term_id: String,
    #[serde(default)]
    pub gene_synopsis: Option<String>,
}

/// Identity fields shared by genetic-entity payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicGeneticEntity {
    pub primary_id: String,
    pub taxon_id: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub secondary_ids: Vec<String>,
    #[serde(default)]
    pub genome_locations: Vec<GenomeLocation>,
}

/// One genomic placement of a gene.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomeLocation {
    pub chromosome: String,
    pub assembly: String,
    #[serde(default)]
    pub start_position: Option<u64>,
    #[serde(default)]
    pub end_position: Option<u64>,
    #[serde(default)]
    pub strand: Option<String>,
}
