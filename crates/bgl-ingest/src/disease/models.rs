//! Disease-annotation record models (DAF-style provider JSON)

use serde::Deserialize;

/// Top-level disease-annotation release document.
#[derive(Debug, Deserialize)]
pub struct DiseaseDocument {
    pub data: Vec<DiseaseAnnotation>,
}

/// One curated association between a genetic entity and a DO term.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseAnnotation {
    /// Gene or allele primary id.
    pub object_id: String,
    #[serde(rename = "DOid")]
    pub do_id: String,
    /// e.g. "is_implicated_in", "is_model_of".
    pub association_type: String,
    #[serde(default)]
    pub evidence_codes: Vec<String>,
    #[serde(default)]
    pub publication_id: Option<String>,
    #[serde(default)]
    pub date_assigned: Option<String>,
}
