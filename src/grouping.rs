use crate::types::{EntityRecord, PeriodBucket};
use std::collections::BTreeMap;

/// Bucket deduplicated records by period, ascending.
///
/// `YYYY-MM` is zero padded so the `BTreeMap` string order is chronological.
pub fn group_by_period(records: Vec<EntityRecord>) -> Vec<PeriodBucket> {
    let mut grouped: BTreeMap<String, Vec<EntityRecord>> = BTreeMap::new();
    for r in records {
        grouped.entry(r.period.clone()).or_default().push(r);
    }
    grouped
        .into_iter()
        .map(|(period, entities)| PeriodBucket { period, entities })
        .collect()
}

pub fn periods(buckets: &[PeriodBucket]) -> Vec<&str> {
    buckets.iter().map(|b| b.period.as_str()).collect()
}
