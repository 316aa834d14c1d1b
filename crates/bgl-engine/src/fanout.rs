//! Sub-type fan-out: one staging thread per independent provider unit
//!
//! Providers split into independent "sub-types" (one per species file, one
//! per ontology, ...). Each sub-type stages on its own thread and submits
//! into the one shared [`WorkerPool`](crate::pool::WorkerPool) handle, so
//! extraction parallelism fans in to a single bounded write pipeline.
//!
//! Every sub-type's success or failure is reported explicitly in the
//! returned report; a panicking sub-type shows up as a failure, never as a
//! silently "done" load.

use std::thread;
use tracing::{error, info};

/// Terminal result for one fanned-out sub-type.
#[derive(Debug)]
pub struct SubTypeOutcome {
    pub name: String,
    /// `None` on success, the rendered error otherwise.
    pub error: Option<String>,
}

impl SubTypeOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-sub-type outcomes for one fan-out run.
#[derive(Debug)]
pub struct FanOutReport {
    pub outcomes: Vec<SubTypeOutcome>,
}

impl FanOutReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(SubTypeOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubTypeOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded())
    }

    /// Collapse into a single result, listing every failed sub-type.
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.all_succeeded() {
            return Ok(());
        }
        let failed: Vec<String> = self
            .failures()
            .map(|outcome| format!("{}: {}", outcome.name, outcome.error.as_deref().unwrap_or("?")))
            .collect();
        anyhow::bail!("{} sub-type(s) failed: {}", failed.len(), failed.join("; "))
    }
}

/// Run `worker_fn` once per named work item, each on its own thread, and
/// join them all before returning.
///
/// The closure receives the item name and the item itself; it typically
/// builds a `StagingWriter` and submits the staged jobs into a shared pool.
pub fn fan_out<T, F>(items: Vec<(String, T)>, worker_fn: F) -> FanOutReport
where
    T: Send,
    F: Fn(&str, T) -> anyhow::Result<()> + Sync,
{
    let mut outcomes = Vec::with_capacity(items.len());

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(items.len());
        for (name, item) in items {
            let worker_fn = &worker_fn;
            let thread_name = name.clone();
            let spawned = thread::Builder::new()
                .name(format!("bgl-subtype-{name}"))
                .spawn_scoped(scope, move || worker_fn(&thread_name, item));
            handles.push((name, spawned));
        }

        for (name, spawned) in handles {
            let error = match spawned {
                Ok(handle) => match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(format!("{err:#}")),
                    Err(panic) => Some(panic_text(panic)),
                },
                Err(err) => Some(format!("failed to spawn: {err}")),
            };

            match &error {
                None => info!(sub_type = %name, "sub-type finished"),
                Some(message) => error!(sub_type = %name, error = %message, "sub-type failed"),
            }
            outcomes.push(SubTypeOutcome { name, error });
        }
    });

    FanOutReport { outcomes }
}

fn panic_text(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("panicked: {text}")
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("panicked: {text}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_fan_out_runs_every_item() {
        let counter = AtomicU64::new(0);
        let items: Vec<(String, u64)> = (0..6).map(|n| (format!("MOD-{n}"), n)).collect();

        let report = fan_out(items, |_name, value| {
            counter.fetch_add(value, Ordering::Relaxed);
            Ok(())
        });

        assert!(report.all_succeeded());
        assert_eq!(counter.load(Ordering::Relaxed), 15);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_fan_out_reports_failures_explicitly() {
        let items = vec![
            ("FB".to_string(), true),
            ("MGI".to_string(), false),
            ("ZFIN".to_string(), true),
        ];

        let report = fan_out(items, |_name, ok| {
            if ok {
                Ok(())
            } else {
                anyhow::bail!("bad gene file")
            }
        });

        assert!(!report.all_succeeded());
        let failed: Vec<&str> = report.failures().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, vec!["MGI"]);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_fan_out_reports_panics_as_failures() {
        let items = vec![("WB".to_string(), ())];
        let report = fan_out(items, |_name, ()| -> anyhow::Result<()> {
            panic!("extractor bug")
        });

        assert!(!report.all_succeeded());
        let outcome = &report.outcomes[0];
        assert!(outcome.error.as_deref().unwrap().contains("extractor bug"));
    }
}
