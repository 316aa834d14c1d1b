//! Allele record models

use serde::Deserialize;

/// Top-level allele release document.
#[derive(Debug, Deserialize)]
pub struct AlleleDocument {
    pub data: Vec<AlleleEntry>,
}

/// One curated allele record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlleleEntry {
    pub primary_id: String,
    pub symbol: String,
    pub taxon_id: String,
    /// Gene this allele varies, when the provider curates the link.
    #[serde(default)]
    pub gene_id: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}
