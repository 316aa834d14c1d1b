//! OBO flat-file parser
//!
//! Stanza-oriented: scans for `[Term]` blocks and collects the fields the
//! graph schema consumes. Malformed stanzas are logged and skipped rather
//! than failing the whole release; obsolete terms are kept (annotations may
//! still reference them) and flagged.

use bgl_common::Result;
use tracing::{debug, warn};

/// One `synonym:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OboSynonym {
    pub text: String,
    /// EXACT, BROAD, NARROW, RELATED; absent in older files.
    pub scope: Option<String>,
}

/// One `[Term]` stanza.
#[derive(Debug, Clone, Default)]
pub struct OboTerm {
    pub id: String,
    pub name: String,
    pub definition: Option<String>,
    pub is_obsolete: bool,
    pub alt_ids: Vec<String>,
    pub synonyms: Vec<OboSynonym>,
    /// Parent term ids from `is_a:` lines.
    pub is_a: Vec<String>,
}

/// Parse an OBO document into its terms.
pub fn parse_obo(content: &str) -> Result<Vec<OboTerm>> {
    let mut terms = Vec::new();
    let mut stanza: Option<OboTerm> = None;
    let mut in_term_stanza = false;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with('[') {
            if let Some(term) = stanza.take() {
                push_term(&mut terms, term);
            }
            in_term_stanza = line == "[Term]";
            if in_term_stanza {
                stanza = Some(OboTerm::default());
            }
            continue;
        }

        if !in_term_stanza || line.is_empty() {
            continue;
        }
        let Some(term) = stanza.as_mut() else {
            continue;
        };
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "id" => term.id = value.to_string(),
            "name" => term.name = value.to_string(),
            "def" => term.definition = Some(extract_quoted_text(value)),
            "is_obsolete" => term.is_obsolete = value == "true",
            "alt_id" => term.alt_ids.push(value.to_string()),
            "synonym" => {
                if let Some(synonym) = parse_synonym(value) {
                    term.synonyms.push(synonym);
                }
            }
            "is_a" => {
                // "DOID:4 ! disease" -> "DOID:4"
                if let Some(parent_id) = value.split_whitespace().next() {
                    term.is_a.push(parent_id.to_string());
                }
            }
            _ => {} // Ignore other fields
        }
    }

    if let Some(term) = stanza.take() {
        push_term(&mut terms, term);
    }

    debug!(terms = terms.len(), "OBO parse complete");
    Ok(terms)
}

fn push_term(terms: &mut Vec<OboTerm>, term: OboTerm) {
    if term.id.is_empty() || term.name.is_empty() {
        warn!(id = %term.id, "skipping malformed term stanza");
        return;
    }
    terms.push(term);
}

/// `"A thoracic cancer." [url:org]` -> `A thoracic cancer.`
fn extract_quoted_text(value: &str) -> String {
    let mut parts = value.splitn(3, '"');
    parts.next();
    match parts.next() {
        Some(quoted) => quoted.to_string(),
        None => value.to_string(),
    }
}

/// `"mammary carcinoma" EXACT []` -> text + scope
fn parse_synonym(value: &str) -> Option<OboSynonym> {
    let mut parts = value.splitn(3, '"');
    parts.next();
    let text = parts.next()?.to_string();
    let scope = parts
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .filter(|word| word.chars().all(|c| c.is_ascii_uppercase()))
        .map(str::to_string);
    Some(OboSynonym { text, scope })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obo_terms() {
        let content = r#"format-version: 1.2
data-version: releases/2026-06-01

[Term]
id: DOID:4
name: disease
def: "A disposition to undergo pathological processes." [url:org]

[Term]
id: DOID:12930
name: breast carcinoma
synonym: "mammary carcinoma" EXACT []
synonym: "malignant breast tumor" []
alt_id: DOID:12931
is_a: DOID:4 ! disease
is_obsolete: true

[Typedef]
id: part_of
name: part of
"#;

        let terms = parse_obo(content).unwrap();
        assert_eq!(terms.len(), 2);

        assert_eq!(terms[0].id, "DOID:4");
        assert_eq!(
            terms[0].definition.as_deref(),
            Some("A disposition to undergo pathological processes.")
        );
        assert!(!terms[0].is_obsolete);

        let carcinoma = &terms[1];
        assert_eq!(carcinoma.synonyms.len(), 2);
        assert_eq!(carcinoma.synonyms[0].scope.as_deref(), Some("EXACT"));
        assert_eq!(carcinoma.synonyms[1].scope, None);
        assert_eq!(carcinoma.alt_ids, vec!["DOID:12931"]);
        assert_eq!(carcinoma.is_a, vec!["DOID:4"]);
        assert!(carcinoma.is_obsolete);
    }

    #[test]
    fn test_malformed_stanza_is_skipped() {
        let content = "[Term]\nid: DOID:1\n\n[Term]\nname: nameless\n\n[Term]\nid: DOID:2\nname: ok\n";
        let terms = parse_obo(content).unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].id, "DOID:2");
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_obo("format-version: 1.2\n").unwrap().is_empty());
    }
}
