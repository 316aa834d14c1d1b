//! End-to-end runner tests over sample provider releases

use bgl_engine::{BulkExecutor, ExecuteError, LoadJob, PoolConfig, WorkerPool};
use bgl_ingest::config::{
    LoadConfig, LoadSettings, OntologyConfig, ProviderConfig, SourceLocation,
};
use bgl_ingest::runner;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records the relation of every executed job, in commit order.
#[derive(Clone, Default)]
struct RecordingExecutor {
    executed: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl BulkExecutor for RecordingExecutor {
    fn execute(&self, job: &LoadJob) -> Result<(), ExecuteError> {
        self.executed.lock().unwrap().push(job.relation.clone());
        Ok(())
    }
}

fn write_sample(dir: &Path, name: &str, content: &str) -> SourceLocation {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    SourceLocation {
        path: Some(path),
        url: None,
        sha256: None,
    }
}

fn sample_config(dir: &Path) -> LoadConfig {
    let genes = write_sample(
        dir,
        "fb_genes.json",
        r#"{"data": [{
            "basicGeneticEntity": {
                "primaryId": "FB:FBgn0000490",
                "taxonId": "NCBITaxon:7227",
                "synonyms": ["dpp"],
                "secondaryIds": ["FB:FBgn0000491"],
                "genomeLocations": [{"chromosome": "2L", "assembly": "R6"}]
            },
            "symbol": "dpp",
            "soTermId": "SO:0001217"
        }]}"#,
    );
    let alleles = write_sample(
        dir,
        "fb_alleles.json",
        r#"{"data": [{
            "primaryId": "FB:FBal0000001",
            "symbol": "dpp[1]",
            "taxonId": "NCBITaxon:7227",
            "geneId": "FB:FBgn0000490",
            "synonyms": ["dpp-1"]
        }]}"#,
    );
    let disease = write_sample(
        dir,
        "fb_disease.json",
        r#"{"data": [{
            "objectId": "FB:FBgn0000490",
            "DOid": "DOID:4",
            "associationType": "is_implicated_in",
            "evidenceCodes": ["ECO:0000033"]
        }]}"#,
    );
    let orthology = write_sample(
        dir,
        "fb_orthology.json",
        r#"{"data": [{
            "gene1": "FB:FBgn0000490",
            "gene1Species": 7227,
            "gene2": "HGNC:1071",
            "gene2Species": 9606,
            "predictionMethodsMatched": ["PANTHER"],
            "isBestScore": true
        }]}"#,
    );
    let obo = write_sample(
        dir,
        "do.obo",
        "[Term]\nid: DOID:4\nname: disease\n\n[Term]\nid: DOID:5\nname: other\nsynonym: \"something\" EXACT []\nis_a: DOID:4 ! disease\n",
    );

    let mut settings = LoadSettings::default();
    settings.staging_dir = dir.join("staging");
    settings.data_dir = dir.join("data");
    settings.batch_size = 100;
    settings.commit_chunk_size = 10_000;

    LoadConfig {
        settings,
        ontologies: vec![OntologyConfig {
            name: "do".to_string(),
            source: obo,
        }],
        providers: vec![ProviderConfig {
            name: "FB".to_string(),
            taxon_id: Some("NCBITaxon:7227".to_string()),
            genes: Some(genes),
            alleles: Some(alleles),
            disease: Some(disease),
            orthology: Some(orthology),
        }],
    }
}

#[test]
fn test_full_load_commits_every_relation_in_phase_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());

    let executor = RecordingExecutor::default();
    let pool = WorkerPool::start(
        PoolConfig {
            workers: 2,
            queue_capacity: 16,
            ..PoolConfig::default()
        },
        executor.clone(),
    )
    .unwrap();

    let report = runner::run_load(&config, &pool).unwrap();

    // 3 ontology + 4 gene + 3 allele + 1 disease + 1 orthology jobs
    assert_eq!(report.summary.committed, 12);
    assert_eq!(report.summary.dead_lettered, 0);
    assert_eq!(report.relations.len(), 12);
    assert!(report.relations.iter().all(|r| !r.is_skipped()));

    let executed = executor.executed();
    assert_eq!(executed.len(), 12);

    // barriers order the phases: every phase-1 relation commits before any
    // phase-2 relation, and phase 2 before phase 3
    let phase_of = |relation: &str| -> usize {
        if relation.starts_with("ontology") || relation.starts_with("gene") {
            1
        } else if relation.starts_with("allele") {
            2
        } else {
            3
        }
    };
    let phases: Vec<usize> = executed.iter().map(|r| phase_of(r)).collect();
    let mut sorted = phases.clone();
    sorted.sort_unstable();
    assert_eq!(phases, sorted, "phase barrier violated: {executed:?}");

    // staging files survive the run for debugging
    assert!(config
        .settings
        .staging_dir
        .join("gene_FB.csv")
        .exists());

    pool.shutdown();
}

#[test]
fn test_missing_source_file_fails_the_sub_type_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = sample_config(dir.path());
    config.providers[0].genes = Some(SourceLocation {
        path: Some(PathBuf::from("/no/such/genes.json")),
        url: None,
        sha256: None,
    });

    let pool = WorkerPool::start(PoolConfig::default(), RecordingExecutor::default()).unwrap();
    let err = runner::run_load(&config, &pool).unwrap_err();
    assert!(err.to_string().contains("genes/FB"));
    pool.shutdown();
}

#[test]
fn test_invalid_config_is_rejected_before_any_staging() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = sample_config(dir.path());
    config.settings.batch_size = 0;

    let pool = WorkerPool::start(PoolConfig::default(), RecordingExecutor::default()).unwrap();
    let err = runner::run_load(&config, &pool).unwrap_err();
    assert!(err.to_string().contains("batch_size"));
    pool.shutdown();
}
