use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info};
use tokio::sync::Semaphore;

use super::{ProviderError, ProviderRef, Registry};
use crate::{marshal, params};

/// Result of creating one configured provider.
#[derive(Debug)]
pub struct BringUpOutcome {
    pub kind: String,
    pub id: String,
    pub result: Result<ProviderRef, ProviderError>,
}

/// Outcomes of a batch bring-up, in the order providers were configured.
#[derive(Debug, Default)]
pub struct BringUpReport {
    pub outcomes: Vec<BringUpOutcome>,
}

impl BringUpReport {
    pub fn live_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BringUpOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_live(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Creates every provider in `specs` using process configurables.
///
/// See [`bring_up_with`].
pub async fn bring_up(registry: &Registry, specs: &[marshal::ProviderSpec]) -> BringUpReport {
    bring_up_with(registry, specs, params::configurables()).await
}

/// Creates every provider in `specs`, running at most
/// `max_concurrent_creations` factories at a time, each one bounded by
/// `creation_timeout`.
///
/// A failing provider never prevents the others from being created.
pub async fn bring_up_with(
    registry: &Registry,
    specs: &[marshal::ProviderSpec],
    configurables: &params::Configurables,
) -> BringUpReport {
    let start = Instant::now();
    let semaphore = Semaphore::new(configurables.max_concurrent_creations.max(1));
    let timeout = configurables.creation_timeout;

    let mut jobs = FuturesUnordered::new();
    for (index, spec) in specs.iter().enumerate() {
        let semaphore = &semaphore;
        jobs.push(async move {
            let result = match semaphore.acquire().await {
                Ok(_permit) => {
                    registry
                        .create_provider_from_json(&spec.kind, &spec.id, &spec.config, timeout)
                        .await
                }
                Err(e) => Err(ProviderError::ConcurrencyError(format!(
                    "semaphore acquire failed: {e}"
                ))),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<ProviderRef, ProviderError>>> =
        specs.iter().map(|_| None).collect();
    while let Some((index, result)) = jobs.next().await {
        results[index] = Some(result);
    }

    let outcomes: Vec<BringUpOutcome> = specs
        .iter()
        .zip(results)
        .filter_map(|(spec, result)| {
            result.map(|result| BringUpOutcome {
                kind: spec.kind.clone(),
                id: spec.id.clone(),
                result,
            })
        })
        .collect();

    let report = BringUpReport { outcomes };

    for failure in report.failures() {
        if let Err(e) = &failure.result {
            error!("[PROVIDER]> `{}` not available: {}", failure.id, e);
        }
    }

    info!(
        "[PROVIDER]> {} of {} providers live",
        report.live_count(),
        specs.len()
    );
    debug!(
        "bring-up required {}ms ({} concurrent)",
        start.elapsed().as_millis(),
        configurables.max_concurrent_creations
    );

    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::provider::testing::{Behavior, TestFactory};

    fn spec(kind: &str, id: &str, config: serde_json::Value) -> marshal::ProviderSpec {
        marshal::ProviderSpec {
            kind: kind.to_owned(),
            id: id.to_owned(),
            config,
        }
    }

    fn configurables(max: usize, timeout: Duration) -> params::Configurables {
        params::Configurables {
            max_concurrent_creations: max,
            creation_timeout: timeout,
        }
    }

    #[tokio::test]
    async fn mixed_outcomes_in_input_order() {
        let mut r = Registry::new();
        r.register_factory(Arc::new(TestFactory::new("good", Behavior::Succeed)))
            .unwrap();
        r.register_factory(Arc::new(TestFactory::new("bad", Behavior::Fail)))
            .unwrap();
        r.register_factory(Arc::new(TestFactory::new("boom", Behavior::Panic)))
            .unwrap();

        let specs = vec![
            spec("bad", "b1", json!({ "name": "x" })),
            spec("good", "g1", json!({ "name": "x" })),
            spec("missing", "m1", json!({})),
            spec("good", "g2", json!({})),
            spec("boom", "p1", json!({ "name": "x" })),
            spec("good", "g3", json!({ "name": "y" })),
            spec("good", "g1", json!({ "name": "z" })),
        ];

        let report = bring_up_with(&r, &specs, &configurables(2, Duration::from_secs(5))).await;

        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "g1", "m1", "g2", "p1", "g3", "g1"]);

        assert!(matches!(
            report.outcomes[0].result,
            Err(ProviderError::CreationFailed { .. })
        ));
        assert!(report.outcomes[1].result.is_ok());
        assert!(matches!(
            report.outcomes[2].result,
            Err(ProviderError::UnknownKind(_))
        ));
        assert!(matches!(
            report.outcomes[3].result,
            Err(ProviderError::InvalidConfig { .. })
        ));
        assert!(matches!(
            report.outcomes[4].result,
            Err(ProviderError::CreationFailed { .. })
        ));
        assert!(report.outcomes[5].result.is_ok());

        // two specs share `g1`: exactly one of them is live
        let g1_live = [1, 6]
            .iter()
            .filter(|i| report.outcomes[**i].result.is_ok())
            .count();
        assert_eq!(g1_live, 1);

        assert_eq!(report.live_count(), 3);
        assert_eq!(report.failures().count(), 4);
        assert!(!report.all_live());
        assert_eq!(r.provider_ids(), vec!["g1", "g3"]);
    }

    #[tokio::test]
    async fn slow_provider_times_out_alone() {
        let mut r = Registry::new();
        r.register_factory(Arc::new(TestFactory::new(
            "slow",
            Behavior::Sleep(Duration::from_secs(10)),
        )))
        .unwrap();
        r.register_factory(Arc::new(TestFactory::new("good", Behavior::Succeed)))
            .unwrap();

        let specs = vec![
            spec("slow", "s1", json!({ "name": "x" })),
            spec("good", "g1", json!({ "name": "x" })),
        ];

        let report =
            bring_up_with(&r, &specs, &configurables(4, Duration::from_millis(50))).await;

        assert!(matches!(
            report.outcomes[0].result,
            Err(ProviderError::Cancelled { .. })
        ));
        assert!(report.outcomes[1].result.is_ok());
        assert_eq!(r.provider_ids(), vec!["g1"]);
    }

    #[tokio::test]
    async fn empty_batch() {
        let r = Registry::new();
        let report = bring_up_with(&r, &[], &params::Configurables::default()).await;
        assert!(report.outcomes.is_empty());
        assert!(report.all_live());
    }
}
