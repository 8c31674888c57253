use std::collections::BTreeSet;

use lgu_utilization::dedup::dedup_by_period;
use lgu_utilization::filter::month_span;
use lgu_utilization::loader::{normalize_rows, FieldMap};
use lgu_utilization::reports::tally_period;
use lgu_utilization::types::RawRow;
use lgu_utilization::{Aggregate, ServiceKey, ServicePartial, StatusCategory};
use proptest::prelude::*;

const KEYS: [&str; 4] = ["G1", "G2", "G3", "G4"];
const PERIODS: [&str; 3] = ["2024-01", "2024-02", "2024-03"];
const STATUSES: [&str; 6] = ["[A] Op", "[B] Dev", "[C] Train", "[D] Out", "Pending", ""];
const OFFICES: [&str; 3] = ["NCR", "R1", "CAR"];

fn arb_row() -> impl Strategy<Value = RawRow> {
    (0..KEYS.len(), 0..PERIODS.len(), 0..STATUSES.len(), 0..OFFICES.len()).prop_map(|(k, p, s, o)| {
        let mut r = vec![String::new(); 21];
        r[1] = PERIODS[p].to_string();
        r[4] = format!("LGU {}", KEYS[k]);
        r[5] = STATUSES[s].to_string();
        r[12] = KEYS[k].to_string();
        r[19] = OFFICES[o].to_string();
        r
    })
}

fn arb_sheet() -> impl Strategy<Value = Vec<RawRow>> {
    prop::collection::vec(arb_row(), 0..24).prop_map(|rows| {
        let mut all: Vec<RawRow> = vec![vec![], vec![], vec![]];
        all.extend(rows);
        all
    })
}

proptest! {
    #[test]
    fn header_rows_are_always_three(rows in prop::collection::vec(arb_row(), 0..10)) {
        let (records, report) = normalize_rows(&rows, &FieldMap::STANDARD);
        prop_assert_eq!(records.len(), rows.len().saturating_sub(3));
        prop_assert_eq!(report.header_rows, rows.len().min(3));
    }

    #[test]
    fn dedup_is_idempotent(sheet in arb_sheet()) {
        let (records, _) = normalize_rows(&sheet, &FieldMap::STANDARD);
        let once = dedup_by_period(records);
        let twice = dedup_by_period(once.clone());
        prop_assert_eq!(&once, &twice);
        let keys: BTreeSet<_> = once.iter().map(|r| (r.entity_key.clone(), r.period.clone())).collect();
        prop_assert_eq!(keys.len(), once.len());
    }

    #[test]
    fn service_merge_commutes(a in arb_sheet(), b in arb_sheet()) {
        let pa = ServicePartial::from_rows(ServiceKey::BuildingPermit, &a, &FieldMap::STANDARD);
        let pb = ServicePartial::from_rows(ServiceKey::CertificateOfOccupancy, &b, &FieldMap::STANDARD);
        let ab = Aggregate::default().merge(pa.clone()).merge(pb.clone());
        let ba = Aggregate::default().merge(pb).merge(pa);
        prop_assert_eq!(ab.merged_entities(), ba.merged_entities());
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn tallies_match_counts_and_stay_sparse(sheet in arb_sheet()) {
        let partial = ServicePartial::from_rows(ServiceKey::WorkingPermit, &sheet, &FieldMap::STANDARD);
        let selected: BTreeSet<String> = ["NCR", "R1"].iter().map(|s| s.to_string()).collect();
        for bucket in &partial.buckets {
            let pt = tally_period(bucket, &selected);
            for rt in &pt.regions {
                prop_assert!(rt.total() > 0);
                prop_assert!(selected.contains(&rt.region));
                let in_region: Vec<_> = bucket.entities.iter().filter(|e| e.district_office == rt.region).collect();
                prop_assert!(rt.total() as usize <= in_region.len());
                for (count, category) in [
                    (rt.operational, StatusCategory::Operational),
                    (rt.developmental, StatusCategory::Developmental),
                    (rt.training, StatusCategory::Training),
                    (rt.withdraw, StatusCategory::Withdraw),
                ] {
                    let expected = in_region.iter().filter(|e| e.category() == category).count();
                    prop_assert_eq!(count as usize, expected);
                }
            }
        }
    }

    #[test]
    fn span_is_contiguous(months in prop::collection::vec(1u32..=12, 1..6)) {
        let selected: Vec<String> = months.iter().map(|m| format!("2024-{m:02}")).collect();
        let span = month_span(&selected).unwrap_or_default();
        let lo = *months.iter().min().unwrap();
        let hi = *months.iter().max().unwrap();
        prop_assert_eq!(span.len() as u32, hi - lo + 1);
        for s in &selected {
            prop_assert!(span.contains(s));
        }
    }
}
