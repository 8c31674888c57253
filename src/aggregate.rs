use crate::dedup::{dedup_by_period, latest_by_entity};
use crate::error::PipelineError;
use crate::grouping::group_by_period;
use crate::loader::{normalize_rows, FieldMap, LoadReport};
use crate::source::SheetSource;
use crate::types::{MergedEntity, PeriodBucket, RawRow, ServiceBuckets, ServiceKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Immutable result of one service fetch after normalize, dedup and grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePartial {
    pub service: ServiceKey,
    pub buckets: Vec<PeriodBucket>,
    pub report: LoadReport,
}

impl ServicePartial {
    pub fn from_rows(service: ServiceKey, rows: &[RawRow], map: &FieldMap) -> Self {
        let (records, report) = normalize_rows(rows, map);
        let buckets = group_by_period(dedup_by_period(records));
        debug!(service = %service, periods = buckets.len(), "built service partial");
        ServicePartial { service, buckets, report }
    }
}

/// Union of every service partial received for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub buckets: ServiceBuckets,
    pub reports: BTreeMap<ServiceKey, LoadReport>,
}

impl Aggregate {
    /// Pure merge keyed by service. A second partial for the same service
    /// replaces the first; distinct services commute.
    pub fn merge(&self, partial: ServicePartial) -> Aggregate {
        let mut next = self.clone();
        next.reports.insert(partial.service, partial.report);
        next.buckets.insert(partial.service, partial.buckets);
        next
    }

    pub fn services(&self) -> Vec<ServiceKey> {
        self.buckets.keys().copied().collect()
    }

    /// Latest-status-per-entity view across all received services.
    pub fn merged_entities(&self) -> BTreeMap<String, MergedEntity> {
        merge_entities(&self.buckets)
    }
}

/// Fold per-service buckets into one entity map.
///
/// For each service the entity's most recent period supplies its status.
/// Shared attributes are filled field by field from the first service, in
/// `ServiceKey` order, that has a non-empty value, so the result does not
/// depend on arrival order.
pub fn merge_entities(buckets: &ServiceBuckets) -> BTreeMap<String, MergedEntity> {
    let mut merged: BTreeMap<String, MergedEntity> = BTreeMap::new();
    for (service, service_buckets) in buckets {
        let latest = latest_by_entity(service_buckets.iter().flat_map(|b| b.entities.iter()));
        for (key, record) in latest {
            let entity = merged.entry(key).or_insert_with_key(|k| MergedEntity::new(k));
            fill(&mut entity.name, &record.name);
            fill(&mut entity.province, &record.province);
            fill(&mut entity.region, &record.region);
            fill(&mut entity.district, &record.district);
            fill(&mut entity.level, &record.level);
            fill(&mut entity.income_class, &record.income_class);
            fill(&mut entity.district_office, &record.district_office);
            entity.status_by_service.insert(*service, record.category());
            entity.status_text.insert(*service, record.status);
        }
    }
    merged
}

fn fill(slot: &mut String, value: &str) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    pub service: ServiceKey,
    pub message: String,
}

/// A finished fetch, tagged with the generation it was issued under.
#[derive(Debug)]
pub struct Completion {
    pub generation: u64,
    pub service: ServiceKey,
    pub result: Result<ServicePartial, PipelineError>,
}

/// In-flight fetches for one generation.
pub struct FetchBatch {
    generation: u64,
    pending: BTreeSet<ServiceKey>,
    tasks: JoinSet<Completion>,
}

impl FetchBatch {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Services whose completion has not been seen yet.
    pub fn pending(&self) -> &BTreeSet<ServiceKey> {
        &self.pending
    }
}

/// Owns the aggregate for the current service selection.
///
/// Snapshots are handed out as `Arc<Aggregate>` and replaced wholesale on
/// every merge, so a reader holding an older snapshot never sees it change.
pub struct Aggregator {
    generation: u64,
    selection: BTreeSet<ServiceKey>,
    snapshot: Arc<Aggregate>,
    failures: Vec<ServiceFailure>,
    field_maps: BTreeMap<ServiceKey, FieldMap>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl Aggregator {
    pub fn new(field_maps: BTreeMap<ServiceKey, FieldMap>) -> Self {
        Aggregator {
            generation: 0,
            selection: BTreeSet::new(),
            snapshot: Arc::new(Aggregate::default()),
            failures: Vec::new(),
            field_maps,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selection(&self) -> &BTreeSet<ServiceKey> {
        &self.selection
    }

    pub fn snapshot(&self) -> Arc<Aggregate> {
        Arc::clone(&self.snapshot)
    }

    pub fn failures(&self) -> &[ServiceFailure] {
        &self.failures
    }

    pub fn field_map(&self, service: ServiceKey) -> FieldMap {
        self.field_maps.get(&service).copied().unwrap_or_default()
    }

    /// Hard reset for a new selection. Completions from earlier generations
    /// are discarded by `apply`.
    pub fn begin(&mut self, services: &[ServiceKey]) -> u64 {
        self.generation += 1;
        self.selection = services.iter().copied().collect();
        self.snapshot = Arc::new(Aggregate::default());
        self.failures.clear();
        debug!(generation = self.generation, services = ?self.selection, "selection reset");
        self.generation
    }

    /// Merge one completion. Returns `false` when it was discarded.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let Completion { generation, service, result } = completion;
        if generation != self.generation {
            debug!(service = %service, generation, current = self.generation, "discarding stale completion");
            return false;
        }
        if !self.selection.contains(&service) {
            debug!(service = %service, "discarding completion for unselected service");
            return false;
        }
        match result {
            Ok(partial) => {
                info!(
                    service = %service,
                    periods = partial.buckets.len(),
                    kept_rows = partial.report.kept_rows,
                    dropped_rows = partial.report.dropped_rows,
                    "merged service data"
                );
                self.snapshot = Arc::new(self.snapshot.merge(partial));
            }
            Err(e) => {
                warn!(service = %service, error = %e, "service fetch failed; continuing without it");
                self.failures.retain(|f| f.service != service);
                self.failures.push(ServiceFailure { service, message: e.to_string() });
            }
        }
        true
    }

    /// Start a new generation and spawn one fetch task per selected service.
    ///
    /// Dropping the returned batch aborts whatever is still in flight.
    pub fn spawn_fetches(&mut self, source: Arc<dyn SheetSource>, services: &[ServiceKey]) -> FetchBatch {
        let generation = self.begin(services);
        let mut tasks = JoinSet::new();
        for &service in &self.selection {
            let source = Arc::clone(&source);
            let map = self.field_map(service);
            tasks.spawn(async move {
                let result = source
                    .fetch_rows(service)
                    .await
                    .map(|rows| ServicePartial::from_rows(service, &rows, &map));
                Completion { generation, service, result }
            });
        }
        FetchBatch { generation, pending: self.selection.clone(), tasks }
    }

    /// Wait for the next completion of `batch` that changes this aggregator
    /// and return the snapshot it produced.
    ///
    /// Completions merge in the order their fetches finish, so a fast service
    /// is visible while slower ones are still in flight. Once every task has
    /// joined, services that never reported are recorded as aborted, one per
    /// call. Returns `None` when the batch is exhausted; a superseded batch
    /// only ever yields `None`.
    pub async fn next(&mut self, batch: &mut FetchBatch) -> Option<Arc<Aggregate>> {
        loop {
            let completion = match batch.tasks.join_next().await {
                Some(Ok(completion)) => {
                    batch.pending.remove(&completion.service);
                    completion
                }
                Some(Err(e)) => {
                    warn!(error = %e, "fetch task failed to join");
                    continue;
                }
                None => {
                    let service = batch.pending.pop_first()?;
                    Completion {
                        generation: batch.generation,
                        service,
                        result: Err(PipelineError::TaskAborted(service)),
                    }
                }
            };
            if self.apply(completion) {
                return Some(self.snapshot());
            }
        }
    }

    /// Apply every completion of a batch. Returns how many were merged or
    /// recorded.
    pub async fn drain(&mut self, mut batch: FetchBatch) -> usize {
        let mut applied = 0usize;
        while self.next(&mut batch).await.is_some() {
            applied += 1;
        }
        applied
    }

    /// Fetch and merge every selected service; failures are recorded, never fatal.
    pub async fn run(&mut self, source: Arc<dyn SheetSource>, services: &[ServiceKey]) -> Arc<Aggregate> {
        let batch = self.spawn_fetches(source, services);
        self.drain(batch).await;
        info!(
            generation = self.generation,
            merged = self.snapshot.buckets.len(),
            failed = self.failures.len(),
            "aggregation finished"
        );
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::row;
    use crate::types::StatusCategory;

    fn partial(service: ServiceKey, rows: Vec<RawRow>) -> ServicePartial {
        let mut all: Vec<RawRow> = vec![vec![], vec![], vec![]];
        all.extend(rows);
        ServicePartial::from_rows(service, &all, &FieldMap::STANDARD)
    }

    #[test]
    fn statuses_from_different_services_do_not_overwrite() {
        let bp = partial(ServiceKey::BuildingPermit, vec![row("ID1", "2024-01", "[A] Operational", "NCR")]);
        let co = partial(ServiceKey::CertificateOfOccupancy, vec![row("ID1", "2024-01", "[B] Developmental", "NCR")]);
        let agg = Aggregate::default().merge(bp).merge(co);
        let entities = agg.merged_entities();
        let e = &entities["ID1"];
        assert_eq!(e.status_by_service.len(), 2);
        assert_eq!(e.status_by_service[&ServiceKey::BuildingPermit], StatusCategory::Operational);
        assert_eq!(e.status_by_service[&ServiceKey::CertificateOfOccupancy], StatusCategory::Developmental);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let mut named = row("ID1", "2024-02", "[C]", "R1");
        named[4] = "From WP".to_string();
        let bp = partial(ServiceKey::BuildingPermit, vec![row("ID1", "2024-01", "[A]", "")]);
        let wp = partial(ServiceKey::WorkingPermit, vec![named, row("ID2", "2024-02", "[D]", "R2")]);
        let ab = Aggregate::default().merge(bp.clone()).merge(wp.clone());
        let ba = Aggregate::default().merge(wp).merge(bp);
        assert_eq!(ab, ba);
        assert_eq!(ab.merged_entities(), ba.merged_entities());
        let e = &ab.merged_entities()["ID1"];
        assert_eq!(e.name, "LGU ID1");
        assert_eq!(e.district_office, "R1");
    }

    #[test]
    fn merged_status_uses_latest_period() {
        let bp = partial(
            ServiceKey::BuildingPermit,
            vec![row("ID1", "2024-03", "[D]", "NCR"), row("ID1", "2024-01", "[A]", "NCR")],
        );
        let agg = Aggregate::default().merge(bp);
        let e = &agg.merged_entities()["ID1"];
        assert_eq!(e.status_by_service[&ServiceKey::BuildingPermit], StatusCategory::Withdraw);
        assert_eq!(e.status_text[&ServiceKey::BuildingPermit], "[D]");
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut agg = Aggregator::default();
        let old = agg.begin(&[ServiceKey::BuildingPermit]);
        let new = agg.begin(&[ServiceKey::BuildingPermit]);
        assert!(new > old);
        let p = partial(ServiceKey::BuildingPermit, vec![row("A", "2024-01", "[A]", "NCR")]);
        let applied = agg.apply(Completion { generation: old, service: ServiceKey::BuildingPermit, result: Ok(p.clone()) });
        assert!(!applied);
        assert!(agg.snapshot().buckets.is_empty());
        assert!(agg.apply(Completion { generation: new, service: ServiceKey::BuildingPermit, result: Ok(p) }));
        assert_eq!(agg.snapshot().services(), vec![ServiceKey::BuildingPermit]);
    }

    #[test]
    fn unselected_service_is_ignored() {
        let mut agg = Aggregator::default();
        let generation = agg.begin(&[ServiceKey::BuildingPermit]);
        let p = partial(ServiceKey::WorkingPermit, vec![row("A", "2024-01", "[A]", "NCR")]);
        assert!(!agg.apply(Completion { generation, service: ServiceKey::WorkingPermit, result: Ok(p) }));
        assert!(agg.snapshot().buckets.is_empty());
    }

    #[test]
    fn failure_is_recorded_and_old_snapshot_survives() {
        let mut agg = Aggregator::default();
        let generation = agg.begin(&[ServiceKey::BuildingPermit, ServiceKey::WorkingPermit]);
        let p = partial(ServiceKey::BuildingPermit, vec![row("A", "2024-01", "[A]", "NCR")]);
        agg.apply(Completion { generation, service: ServiceKey::BuildingPermit, result: Ok(p) });
        let held = agg.snapshot();
        agg.apply(Completion {
            generation,
            service: ServiceKey::WorkingPermit,
            result: Err(PipelineError::Config("boom".to_string())),
        });
        assert_eq!(agg.failures().len(), 1);
        assert_eq!(agg.failures()[0].service, ServiceKey::WorkingPermit);
        assert_eq!(held.services(), agg.snapshot().services());

        agg.begin(&[ServiceKey::WorkingPermit]);
        assert!(agg.failures().is_empty());
        assert!(agg.snapshot().buckets.is_empty());
        assert_eq!(held.services(), vec![ServiceKey::BuildingPermit]);
    }
}
