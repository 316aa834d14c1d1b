//! Orthology record models

use serde::Deserialize;

/// Top-level orthology release document.
#[derive(Debug, Deserialize)]
pub struct OrthologyDocument {
    pub data: Vec<OrthologyPair>,
}

/// One directed orthology pair with its algorithm votes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrthologyPair {
    pub gene1: String,
    #[serde(rename = "gene1Species")]
    pub gene1_species: u64,
    pub gene2: String,
    #[serde(rename = "gene2Species")]
    pub gene2_species: u64,
    #[serde(default)]
    pub prediction_methods_matched: Vec<String>,
    #[serde(default)]
    pub prediction_methods_not_matched: Vec<String>,
    #[serde(default)]
    pub is_best_score: bool,
    #[serde(default)]
    pub is_best_rev_score: bool,
}
