//! Phased load orchestration
//!
//! Wires configured ontologies and providers through the shared worker pool
//! in dependency order:
//!
//! 1. ontologies + genes (the nodes everything else references)
//! 2. alleles (reference genes)
//! 3. disease annotations + orthology (reference genes, alleles, terms)
//!
//! Each phase fans out one staging thread per sub-type, then waits on the
//! pool's completion barrier before the next phase submits anything. That
//! barrier is the only cross-phase ordering guarantee in the system.

use crate::config::{LoadConfig, LoadSettings, OntologyConfig, SourceLocation};
use crate::download;
use crate::{allele, disease, gene, ontology, orthology};
use anyhow::Context;
use bgl_engine::{fan_out, CompletionSummary, RelationOutcome, WorkerPool};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

/// What one full load run produced.
#[derive(Debug)]
pub struct LoadReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Per-relation staging outcomes across all phases.
    pub relations: Vec<RelationOutcome>,
    /// Final pool counters after the last barrier.
    pub summary: CompletionSummary,
}

/// One fanned-out unit of staging work.
enum StagingTask {
    Ontology(OntologyConfig),
    Genes {
        provider: String,
        source: SourceLocation,
    },
    Alleles {
        provider: String,
        source: SourceLocation,
    },
    Disease {
        provider: String,
        source: SourceLocation,
    },
    Orthology {
        provider: String,
        source: SourceLocation,
    },
}

impl StagingTask {
    fn stage(
        self,
        pool: &WorkerPool,
        settings: &LoadSettings,
    ) -> anyhow::Result<Vec<RelationOutcome>> {
        let staging_dir = &settings.staging_dir;
        let chunk = settings.commit_chunk_size;
        match self {
            StagingTask::Ontology(config) => {
                let path = download::ensure_local(&config.source, &config.name, &settings.data_dir)?;
                let mut source = ontology::OntologyTransformer::from_file(
                    &path,
                    config.name.as_str(),
                    settings.batch_size,
                )?;
                let specs = ontology::relation_specs(&config.name, chunk);
                Ok(pool.run_batch_load(&mut source, specs, staging_dir)?)
            }
            StagingTask::Genes { provider, source } => {
                let path = download::ensure_local(&source, "genes", &settings.data_dir)?;
                let mut source =
                    gene::GeneTransformer::from_file(&path, provider.as_str(), settings.batch_size)?;
                let specs = gene::relation_specs(&provider, chunk);
                Ok(pool.run_batch_load(&mut source, specs, staging_dir)?)
            }
            StagingTask::Alleles { provider, source } => {
                let path = download::ensure_local(&source, "alleles", &settings.data_dir)?;
                let mut source = allele::AlleleTransformer::from_file(
                    &path,
                    provider.as_str(),
                    settings.batch_size,
                )?;
                let specs = allele::relation_specs(&provider, chunk);
                Ok(pool.run_batch_load(&mut source, specs, staging_dir)?)
            }
            StagingTask::Disease { provider, source } => {
                let path = download::ensure_local(&source, "disease", &settings.data_dir)?;
                let mut source = disease::DiseaseTransformer::from_file(
                    &path,
                    provider.as_str(),
                    settings.batch_size,
                )?;
                let specs = disease::relation_specs(&provider, chunk);
                Ok(pool.run_batch_load(&mut source, specs, staging_dir)?)
            }
            StagingTask::Orthology { provider, source } => {
                let path = download::ensure_local(&source, "orthology", &settings.data_dir)?;
                let mut source = orthology::OrthologyTransformer::from_file(
                    &path,
                    provider.as_str(),
                    settings.batch_size,
                )?;
                let specs = orthology::relation_specs(&provider, chunk);
                Ok(pool.run_batch_load(&mut source, specs, staging_dir)?)
            }
        }
    }
}

/// Run every configured sub-type through the pool, phase by phase.
pub fn run_load(config: &LoadConfig, pool: &WorkerPool) -> anyhow::Result<LoadReport> {
    if let Err(problems) = config.validate() {
        anyhow::bail!("invalid load config: {}", problems.join("; "));
    }

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(
        %run_id,
        providers = config.providers.len(),
        ontologies = config.ontologies.len(),
        "starting load run"
    );

    let settings = &config.settings;
    let collected = Mutex::new(Vec::new());

    // Phase 1: the nodes everything else references.
    let mut tasks: Vec<(String, StagingTask)> = Vec::new();
    for ontology_config in &config.ontologies {
        tasks.push((
            format!("ontology/{}", ontology_config.name),
            StagingTask::Ontology(ontology_config.clone()),
        ));
    }
    for provider in &config.providers {
        if let Some(source) = &provider.genes {
            tasks.push((
                format!("genes/{}", provider.name),
                StagingTask::Genes {
                    provider: provider.name.clone(),
                    source: source.clone(),
                },
            ));
        }
    }
    run_phase(pool, settings, "ontologies and genes", tasks, &collected)?;

    // Phase 2: alleles attach to genes.
    let mut tasks: Vec<(String, StagingTask)> = Vec::new();
    for provider in &config.providers {
        if let Some(source) = &provider.alleles {
            tasks.push((
                format!("alleles/{}", provider.name),
                StagingTask::Alleles {
                    provider: provider.name.clone(),
                    source: source.clone(),
                },
            ));
        }
    }
    run_phase(pool, settings, "alleles", tasks, &collected)?;

    // Phase 3: associations over the loaded entities.
    let mut tasks: Vec<(String, StagingTask)> = Vec::new();
    for provider in &config.providers {
        if let Some(source) = &provider.disease {
            tasks.push((
                format!("disease/{}", provider.name),
                StagingTask::Disease {
                    provider: provider.name.clone(),
                    source: source.clone(),
                },
            ));
        }
        if let Some(source) = &provider.orthology {
            tasks.push((
                format!("orthology/{}", provider.name),
                StagingTask::Orthology {
                    provider: provider.name.clone(),
                    source: source.clone(),
                },
            ));
        }
    }
    run_phase(pool, settings, "associations", tasks, &collected)?;

    let summary = pool.wait_for_completion();
    let relations = collected
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    let skipped = relations.iter().filter(|r| r.is_skipped()).count();
    if skipped > 0 {
        warn!(skipped, "some relations produced no data this run");
    }
    info!(
        %run_id,
        committed = summary.committed,
        dead_lettered = summary.dead_lettered,
        relations = relations.len(),
        elapsed_secs = (Utc::now() - started_at).num_seconds(),
        "load complete"
    );

    Ok(LoadReport {
        run_id,
        started_at,
        relations,
        summary,
    })
}

fn run_phase(
    pool: &WorkerPool,
    settings: &LoadSettings,
    title: &str,
    tasks: Vec<(String, StagingTask)>,
    collected: &Mutex<Vec<RelationOutcome>>,
) -> anyhow::Result<()> {
    if tasks.is_empty() {
        return Ok(());
    }
    info!(phase = title, sub_types = tasks.len(), "starting load phase");

    let report = fan_out(tasks, |name, task| {
        let outcomes = task
            .stage(pool, settings)
            .with_context(|| format!("sub-type {name}"))?;
        lock(collected).extend(outcomes);
        Ok(())
    });

    // barrier: dependent phases must see all of this phase committed
    let summary = pool.wait_for_completion();
    info!(
        phase = title,
        committed = summary.committed,
        dead_lettered = summary.dead_lettered,
        "load phase complete"
    );
    report.into_result()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
