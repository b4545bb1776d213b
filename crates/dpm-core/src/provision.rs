//! Parallel provisioning of independent entities.
//!
//! One tokio task per entity. Each task reports its outcome on an mpsc
//! channel and a single aggregator builds the [`ProvisioningReport`], so no
//! lock is shared between workers. The caller injects the per-entity
//! `worker` async closure; restore code passes the real console flow and
//! tests pass deterministic stubs.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::obs;

/// How far an entity got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Pending,
    TemplateBuilt,
    Created,
    SubresourcesAttached,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Pending => "pending",
            Stage::TemplateBuilt => "template built",
            Stage::Created => "created",
            Stage::SubresourcesAttached => "sub-resources attached",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Handle a worker uses to publish its progress.
///
/// The provisioner keeps the receiving side, so the last stage reached is
/// known even when the worker fails or panics.
#[derive(Debug)]
pub struct StageTracker {
    tx: watch::Sender<Stage>,
}

impl StageTracker {
    fn new() -> (Self, watch::Receiver<Stage>) {
        let (tx, rx) = watch::channel(Stage::Pending);
        (StageTracker { tx }, rx)
    }

    /// Detached tracker for driving a worker outside [`provision`].
    pub fn detached() -> Self {
        Self::new().0
    }

    pub fn advance(&self, stage: Stage) {
        self.tx.send_replace(stage);
    }

    pub fn current(&self) -> Stage {
        *self.tx.borrow()
    }
}

/// Why an entity did not make it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    /// Last stage reached before the failure
    pub stage: Stage,
    pub error: String,
    /// Console call path of the failure, outermost first
    pub trail: Vec<String>,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after stage '{}')", self.error, self.stage)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionConfig {
    /// Upper bound on concurrently running workers; `None` runs them all
    pub max_concurrent: Option<usize>,
}

/// Outcome of a provisioning run, in completion order.
#[derive(Debug, Clone)]
pub struct ProvisioningReport<T> {
    pub succeeded: Vec<(String, T)>,
    pub failed: Vec<(String, EntityFailure)>,
}

impl<T> Default for ProvisioningReport<T> {
    fn default() -> Self {
        ProvisioningReport {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> ProvisioningReport<T> {
    pub fn succeeded_names(&self) -> Vec<&str> {
        self.succeeded.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

type Outcome<T> = std::result::Result<T, EntityFailure>;

/// Run `worker` once per entity, concurrently.
///
/// A failing or panicking worker is recorded in `failed` and never affects
/// its siblings.
#[instrument(skip(entities, config, worker), fields(entities = entities.len()))]
pub async fn provision<T, F, Fut>(
    entities: Vec<String>,
    config: &ProvisionConfig,
    worker: F,
) -> ProvisioningReport<T>
where
    T: Send + 'static,
    F: Fn(String, StageTracker) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let started = Instant::now();
    obs::emit_provision_started(entities.len());

    let worker = Arc::new(worker);
    let limiter = config
        .max_concurrent
        .map(|n| Arc::new(Semaphore::new(n.max(1))));
    let (tx, mut rx) = mpsc::channel::<(String, Outcome<T>)>(entities.len().max(1));

    for name in entities {
        let worker = Arc::clone(&worker);
        let limiter = limiter.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };

            let (tracker, stage) = StageTracker::new();
            let run = (*worker)(name.clone(), tracker);
            let outcome = match tokio::spawn(run).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(EntityFailure {
                    stage: *stage.borrow(),
                    error: e.to_string(),
                    trail: e.operation_trail(),
                }),
                Err(join) => {
                    warn!(entity = %name, "worker panicked");
                    Err(EntityFailure {
                        stage: *stage.borrow(),
                        error: format!("worker panicked: {join}"),
                        trail: Vec::new(),
                    })
                }
            };
            let _ = tx.send((name, outcome)).await;
        });
    }
    drop(tx);

    let mut report = ProvisioningReport::default();
    while let Some((name, outcome)) = rx.recv().await {
        match outcome {
            Ok(value) => {
                obs::emit_entity_finished(&name, Stage::Done, true);
                report.succeeded.push((name, value));
            }
            Err(failure) => {
                warn!(entity = %name, stage = %failure.stage, error = %failure.error, "entity failed");
                obs::emit_entity_finished(&name, failure.stage, false);
                report.failed.push((name, failure));
            }
        }
    }

    obs::emit_provision_finished(
        report.succeeded.len(),
        report.failed.len(),
        started.elapsed().as_millis() as u64,
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DpmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let report = provision(
            names(&["A", "B"]),
            &ProvisionConfig::default(),
            |name, tracker| async move {
                tracker.advance(Stage::TemplateBuilt);
                if name == "B" {
                    return Err(DpmError::restore(&name, "create failed"));
                }
                tracker.advance(Stage::Created);
                Ok(format!("/api/partitions/{name}"))
            },
        )
        .await;

        assert_eq!(report.succeeded_names(), vec!["A"]);
        assert_eq!(report.failed_names(), vec!["B"]);
        assert_eq!(report.succeeded[0].1, "/api/partitions/A");
        let failure = &report.failed[0].1;
        assert_eq!(failure.stage, Stage::TemplateBuilt);
        assert!(failure.error.contains("create failed"));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded() {
        let report: ProvisioningReport<()> = provision(
            names(&["OK", "BOOM"]),
            &ProvisionConfig::default(),
            |name, tracker| async move {
                tracker.advance(Stage::Created);
                if name == "BOOM" {
                    panic!("unexpected console reply");
                }
                Ok(())
            },
        )
        .await;

        assert_eq!(report.succeeded_names(), vec!["OK"]);
        assert_eq!(report.failed_names(), vec!["BOOM"]);
        assert_eq!(report.failed[0].1.stage, Stage::Created);
        assert!(report.failed[0].1.error.starts_with("worker panicked"));
    }

    #[tokio::test]
    async fn test_max_concurrent_bounds_workers() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));

        let report = provision(
            names(&["1", "2", "3", "4", "5"]),
            &ProvisionConfig {
                max_concurrent: Some(2),
            },
            move |_, _| {
                let running = Arc::clone(&r);
                let peak = Arc::clone(&p);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(report.total(), 5);
        assert!(report.all_succeeded());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let report = provision(
            names(&["slow", "fast"]),
            &ProvisionConfig::default(),
            |name, _| async move {
                let delay = if name == "slow" { 50 } else { 1 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(name)
            },
        )
        .await;
        assert_eq!(report.succeeded_names(), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let report: ProvisioningReport<()> =
            provision(Vec::new(), &ProvisionConfig::default(), |_, _| async { Ok(()) }).await;
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_tracker_keeps_last_stage() {
        let tracker = StageTracker::detached();
        assert_eq!(tracker.current(), Stage::Pending);
        tracker.advance(Stage::SubresourcesAttached);
        assert_eq!(tracker.current(), Stage::SubresourcesAttached);
        assert_eq!(Stage::SubresourcesAttached.to_string(), "sub-resources attached");
    }
}
