use crate::types::EntityRecord;
use std::collections::{BTreeMap, HashMap};

/// Collapse records sharing `(entity_key, period)` within one service.
///
/// The first occurrence keeps its descriptive fields and position; the status
/// text comes from the last occurrence, since sheets are append-only.
pub fn dedup_by_period(records: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<EntityRecord> = Vec::with_capacity(records.len());

    for r in records {
        let key = (r.entity_key.clone(), r.period.clone());
        match index.get(&key) {
            Some(&i) => {
                let kept = &mut out[i];
                kept.status = r.status;
                kept.universal_status = r.universal_status;
            }
            None => {
                index.insert(key, out.len());
                out.push(r);
            }
        }
    }
    out
}

/// Most recent record per entity regardless of period.
///
/// A later period replaces an earlier one; within the same period the later
/// row wins.
pub fn latest_by_entity<'a, I>(records: I) -> BTreeMap<String, EntityRecord>
where
    I: IntoIterator<Item = &'a EntityRecord>,
{
    let mut latest: BTreeMap<String, EntityRecord> = BTreeMap::new();
    for r in records {
        match latest.get(&r.entity_key) {
            Some(existing) if existing.period > r.period => {}
            _ => {
                latest.insert(r.entity_key.clone(), r.clone());
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{normalize_rows, tests::row, FieldMap};

    fn records(rows: Vec<Vec<String>>) -> Vec<EntityRecord> {
        let mut all = vec![vec![], vec![], vec![]];
        all.extend(rows);
        normalize_rows(&all, &FieldMap::STANDARD).0
    }

    #[test]
    fn keeps_one_record_per_key_and_period() {
        let recs = records(vec![
            row("A", "2024-01", "[B] Developmental", "NCR"),
            row("A", "2024-02", "[A] Operational", "NCR"),
            row("A", "2024-01", "[A] Operational", "NCR"),
        ]);
        let out = dedup_by_period(recs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].period, "2024-01");
        assert_eq!(out[0].status, "[A] Operational");
        assert_eq!(out[1].period, "2024-02");
    }

    #[test]
    fn first_occurrence_keeps_descriptive_fields() {
        let mut second = row("A", "2024-01", "[C] Training", "R1");
        second[4] = "Renamed".to_string();
        let recs = records(vec![row("A", "2024-01", "[A] Operational", "NCR"), second]);
        let out = dedup_by_period(recs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "LGU A");
        assert_eq!(out[0].district_office, "NCR");
        assert_eq!(out[0].status, "[C] Training");
    }

    #[test]
    fn dedup_is_idempotent() {
        let recs = records(vec![
            row("A", "2024-01", "[A]", "NCR"),
            row("B", "2024-01", "[B]", "NCR"),
            row("A", "2024-01", "[D]", "NCR"),
        ]);
        let once = dedup_by_period(recs);
        let twice = dedup_by_period(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn latest_prefers_later_periods() {
        let recs = records(vec![
            row("A", "2024-03", "[B]", "NCR"),
            row("A", "2024-01", "[A]", "NCR"),
            row("B", "2024-01", "[C]", "R1"),
        ]);
        let latest = latest_by_entity(&recs);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["A"].period, "2024-03");
        assert_eq!(latest["A"].status, "[B]");
        assert_eq!(latest["B"].status, "[C]");
    }

    #[test]
    fn latest_same_period_last_row_wins() {
        let recs = records(vec![row("A", "2024-01", "[A]", "NCR"), row("A", "2024-01", "[D]", "NCR")]);
        assert_eq!(latest_by_entity(&recs)["A"].status, "[D]");
    }
}
