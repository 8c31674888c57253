use crate::aggregate::{merge_entities, Aggregate};
use crate::grouping::periods;
use crate::types::{
    CategorySeries, NamedSeries, PeriodBucket, PeriodTally, RegionTally, ServiceBuckets, ServiceKey,
    ServiceTotalsRow, StatusCategory, StatusTotals, SummaryStats, TallyRow, TrendRow,
};
use crate::util::{month_index, MONTH_LABELS};
use std::collections::{BTreeMap, BTreeSet};

pub type ServiceTallies = BTreeMap<ServiceKey, Vec<PeriodTally>>;

/// Count one period's entities by regional office and status.
///
/// Only offices in `regions` are counted. Offices whose four counters are all
/// zero are left out rather than emitted as zero rows.
pub fn tally_period(bucket: &PeriodBucket, regions: &BTreeSet<String>) -> PeriodTally {
    let mut by_region: BTreeMap<&str, RegionTally> = BTreeMap::new();
    for e in &bucket.entities {
        if !regions.contains(&e.district_office) {
            continue;
        }
        let category = e.category();
        if category == StatusCategory::Unclassified {
            continue;
        }
        by_region
            .entry(e.district_office.as_str())
            .or_insert_with(|| RegionTally::new(&e.district_office))
            .record(category);
    }
    PeriodTally {
        period: bucket.period.clone(),
        regions: by_region.into_values().collect(),
    }
}

pub fn tally_services(buckets: &ServiceBuckets, regions: &BTreeSet<String>) -> ServiceTallies {
    buckets
        .iter()
        .map(|(service, list)| (*service, list.iter().map(|b| tally_period(b, regions)).collect()))
        .collect()
}

/// Bar series by region for a pair of statuses, summed over services and periods.
///
/// Categories keep first-seen order walking services then periods.
pub fn region_series(tallies: &ServiceTallies, pair: [StatusCategory; 2]) -> CategorySeries {
    let mut categories: Vec<String> = Vec::new();
    let mut sums: BTreeMap<String, StatusTotals> = BTreeMap::new();
    for period_tallies in tallies.values() {
        for pt in period_tallies {
            for rt in &pt.regions {
                if !sums.contains_key(&rt.region) {
                    categories.push(rt.region.clone());
                }
                sums.entry(rt.region.clone()).or_default().absorb(rt);
            }
        }
    }
    let series = pair
        .iter()
        .map(|&status| NamedSeries {
            name: status.label().to_string(),
            data: categories.iter().map(|c| sums[c].get(status)).collect(),
        })
        .collect();
    CategorySeries { categories, series }
}

/// Grand totals per status across every service, period and region.
pub fn grand_totals(tallies: &ServiceTallies) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for rt in tallies.values().flatten().flat_map(|pt| pt.regions.iter()) {
        totals.absorb(rt);
    }
    totals
}

pub fn service_totals(tallies: &ServiceTallies) -> BTreeMap<ServiceKey, StatusTotals> {
    tallies
        .iter()
        .map(|(service, list)| {
            let mut totals = StatusTotals::default();
            for rt in list.iter().flat_map(|pt| pt.regions.iter()) {
                totals.absorb(rt);
            }
            (*service, totals)
        })
        .collect()
}

/// Totals of each service's most recent retained period.
pub fn latest_period_totals(tallies: &ServiceTallies) -> BTreeMap<ServiceKey, StatusTotals> {
    tallies
        .iter()
        .map(|(service, list)| {
            let mut totals = StatusTotals::default();
            if let Some(last) = list.last() {
                for rt in &last.regions {
                    totals.absorb(rt);
                }
            }
            (*service, totals)
        })
        .collect()
}

/// Twelve-slot January–December counts per service and status.
pub fn monthly_series(tallies: &ServiceTallies) -> BTreeMap<ServiceKey, Vec<NamedSeries>> {
    tallies
        .iter()
        .map(|(service, list)| {
            let slots = month_slots(list);
            let series = StatusCategory::COUNTED
                .iter()
                .map(|&status| NamedSeries {
                    name: status.label().to_string(),
                    data: slots.iter().map(|t| t.get(status)).collect(),
                })
                .collect();
            (*service, series)
        })
        .collect()
}

fn month_slots(list: &[PeriodTally]) -> [StatusTotals; 12] {
    let mut slots = [StatusTotals::default(); 12];
    for pt in list {
        let Some(idx) = month_index(&pt.period) else {
            continue;
        };
        for rt in &pt.regions {
            slots[idx].absorb(rt);
        }
    }
    slots
}

pub fn tally_rows(tallies: &ServiceTallies) -> Vec<TallyRow> {
    let mut rows = Vec::new();
    for (service, list) in tallies {
        for pt in list {
            for rt in &pt.regions {
                rows.push(TallyRow {
                    service: service.code().to_string(),
                    period: pt.period.clone(),
                    region: rt.region.clone(),
                    operational: rt.operational,
                    developmental: rt.developmental,
                    training: rt.training,
                    withdraw: rt.withdraw,
                });
            }
        }
    }
    rows
}

pub fn service_totals_rows(tallies: &ServiceTallies) -> Vec<ServiceTotalsRow> {
    let totals = service_totals(tallies);
    let latest = latest_period_totals(tallies);
    tallies
        .iter()
        .map(|(service, list)| {
            let t = totals.get(service).copied().unwrap_or_default();
            let l = latest.get(service).copied().unwrap_or_default();
            ServiceTotalsRow {
                service: service.label().to_string(),
                operational: t.operational,
                developmental: t.developmental,
                training: t.training,
                withdraw: t.withdraw,
                latest_period: list.last().map(|pt| pt.period.clone()).unwrap_or_default(),
                latest_operational: l.operational,
                latest_developmental: l.developmental,
            }
        })
        .collect()
}

/// One row per service per month that has any counted entity.
pub fn trend_rows(tallies: &ServiceTallies) -> Vec<TrendRow> {
    let mut rows = Vec::new();
    for (service, list) in tallies {
        for (idx, slot) in month_slots(list).iter().enumerate() {
            if slot.as_array().iter().all(|v| *v == 0) {
                continue;
            }
            rows.push(TrendRow {
                service: service.code().to_string(),
                month: MONTH_LABELS[idx].to_string(),
                operational: slot.operational,
                developmental: slot.developmental,
                training: slot.training,
                withdraw: slot.withdraw,
            });
        }
    }
    rows
}

/// Summary of the filtered window. Only `services` reflects the whole
/// aggregate; every count is taken from `filtered` and `tallies`.
pub fn generate_summary(
    aggregate: &Aggregate,
    filtered: &ServiceBuckets,
    tallies: &ServiceTallies,
    failed_services: Vec<ServiceKey>,
) -> SummaryStats {
    let window: BTreeSet<&str> = filtered.values().flat_map(|list| periods(list)).collect();
    let totals = grand_totals(tallies);
    SummaryStats {
        services: aggregate.services(),
        failed_services,
        periods: window.into_iter().map(str::to_string).collect(),
        total_entities: merge_entities(filtered).len(),
        totals,
        pie: totals.as_array(),
        latest_by_service: latest_period_totals(tallies),
        region_series: region_series(tallies, [StatusCategory::Operational, StatusCategory::Developmental]),
        monthly_series: monthly_series(tallies),
    }
}
