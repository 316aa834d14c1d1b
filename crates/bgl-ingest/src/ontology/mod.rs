// Ontology Ingestion Module (OBO flat files)
//
// Parses OBO releases (Disease Ontology, Sequence Ontology, Gene Ontology,
// ...) into term nodes, synonyms, and is_a edges. Ontologies load in the
// first phase so later association edges can MATCH their terms.
//
// # File Format
// OBO is a stanza format:
//
// ```text
// [Term]
// id: DOID:12930
// name: breast carcinoma
// def: "A thoracic cancer that ..." [url:...]
// synonym: "mammary carcinoma" EXACT []
// is_a: DOID:3459 ! carcinoma
// ```

pub mod parser;

pub use parser::{parse_obo, OboSynonym, OboTerm};

use bgl_common::Result;
use bgl_engine::{Batch, BatchSource, Record, RelationSpec};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Relation order produced by [`OntologyTransformer`] batches.
pub const ONTOLOGY_RELATIONS: usize = 3;

/// Relation specs for one ontology load. `name` is the short ontology code
/// ("do", "so"); the node label follows it ("DOTerm", "SOTerm").
pub fn relation_specs(name: &str, commit_chunk_size: u64) -> Vec<RelationSpec> {
    let label = format!("{}Term", name.to_uppercase());
    let term_statement = format!(
        "LOAD CSV WITH HEADERS FROM $file AS row \
         WITH row SKIP $skip LIMIT $limit \
         MERGE (t:{label}:OntologyTerm {{primaryKey: row.term_id}}) \
         SET t.name = row.name, \
             t.definition = row.definition, \
             t.isObsolete = row.is_obsolete, \
             t.altIds = split(row.alt_ids, '|')"
    );
    let synonym_statement = format!(
        "LOAD CSV WITH HEADERS FROM $file AS row \
         WITH row SKIP $skip LIMIT $limit \
         MATCH (t:{label} {{primaryKey: row.term_id}}) \
         MERGE (s:Synonym {{name: row.synonym}}) \
         MERGE (t)-[r:ALSO_KNOWN_AS]->(s) \
         SET r.scope = row.scope"
    );
    let isa_statement = format!(
        "LOAD CSV WITH HEADERS FROM $file AS row \
         WITH row SKIP $skip LIMIT $limit \
         MATCH (child:{label} {{primaryKey: row.term_id}}) \
         MATCH (parent:{label} {{primaryKey: row.parent_id}}) \
         MERGE (child)-[:IS_A]->(parent)"
    );

    vec![
        RelationSpec::new("ontology_term", term_statement, format!("term_{name}.csv"))
            .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "ontology_synonym",
            synonym_statement,
            format!("term_synonym_{name}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
        RelationSpec::new(
            "ontology_isa",
            isa_statement,
            format!("term_isa_{name}.csv"),
        )
        .with_commit_chunk_size(commit_chunk_size),
    ]
}

/// Lazily batches one parsed ontology for the staging writer.
pub struct OntologyTransformer {
    name: String,
    terms: std::vec::IntoIter<OboTerm>,
    batch_size: usize,
}

impl OntologyTransformer {
    pub fn new(name: impl Into<String>, terms: Vec<OboTerm>, batch_size: usize) -> Self {
        Self {
            name: name.into(),
            terms: terms.into_iter(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        let content = std::fs::read_to_string(path.as_ref())?;
        let terms = parse_obo(&content)?;
        info!(ontology = %name, terms = terms.len(), "parsed OBO release");
        Ok(Self::new(name, terms, batch_size))
    }
}

impl BatchSource for OntologyTransformer {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let terms: Vec<OboTerm> = self.terms.by_ref().take(self.batch_size).collect();
        if terms.is_empty() {
            return Ok(None);
        }

        let mut term_records = Vec::with_capacity(terms.len());
        let mut synonyms = Vec::new();
        let mut isa_edges = Vec::new();

        for term in terms {
            let mut record = Record::new();
            record.insert("term_id".into(), json!(term.id));
            record.insert("name".into(), json!(term.name));
            record.insert("definition".into(), json!(term.definition));
            record.insert("is_obsolete".into(), json!(term.is_obsolete));
            record.insert("alt_ids".into(), json!(term.alt_ids));
            term_records.push(record);

            for synonym in &term.synonyms {
                let mut record = Record::new();
                record.insert("term_id".into(), json!(term.id));
                record.insert("synonym".into(), json!(synonym.text));
                record.insert("scope".into(), json!(synonym.scope));
                synonyms.push(record);
            }

            for parent_id in &term.is_a {
                let mut record = Record::new();
                record.insert("term_id".into(), json!(term.id));
                record.insert("parent_id".into(), json!(parent_id));
                isa_edges.push(record);
            }
        }

        tracing::debug!(
            ontology = %self.name,
            terms = term_records.len(),
            "ontology batch ready"
        );
        Ok(Some(Batch::new(vec![term_records, synonyms, isa_edges])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"format-version: 1.2
data-version: releases/2026-06-01

[Term]
id: DOID:4
name: disease
def: "A disposition to undergo pathological processes." [url:org]

[Term]
id: DOID:12930
name: breast carcinoma
def: "A thoracic cancer." [url:org]
synonym: "mammary carcinoma" EXACT []
alt_id: DOID:12931
is_a: DOID:4 ! disease
"#;

    #[test]
    fn test_transformer_batches_terms_synonyms_and_edges() {
        let terms = parse_obo(SAMPLE).unwrap();
        let mut transformer = OntologyTransformer::new("do", terms, 10);

        let batch = transformer.next_batch().unwrap().unwrap();
        assert_eq!(batch.relation_count(), ONTOLOGY_RELATIONS);
        assert_eq!(batch.relation(0).len(), 2);
        assert_eq!(batch.relation(1).len(), 1);
        assert_eq!(batch.relation(2).len(), 1);

        let edge = &batch.relation(2)[0];
        assert_eq!(edge["term_id"], "DOID:12930");
        assert_eq!(edge["parent_id"], "DOID:4");
    }

    #[test]
    fn test_relation_specs_use_ontology_label() {
        let specs = relation_specs("do", 500);
        assert_eq!(specs[0].file_name, "term_do.csv");
        assert!(specs[0].statement.contains(":DOTerm"));
        assert!(specs[2].statement.contains("IS_A"));
    }
}
