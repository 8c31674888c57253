use crate::types::{EntityRecord, RawRow};
use crate::util::cell;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every sheet starts with this many rows of header metadata.
pub const HEADER_ROWS: usize = 3;

/// Declared column index for each record field of one service sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub period: usize,
    pub name: usize,
    pub status: usize,
    pub progress_rate: usize,
    pub concerns: usize,
    pub action_items: usize,
    pub remarks: usize,
    pub universal_status: usize,
    pub mpar: usize,
    pub entity_key: usize,
    pub province: usize,
    pub region: usize,
    pub district: usize,
    pub level: usize,
    pub income_class: usize,
    pub district_office: usize,
}

impl FieldMap {
    /// Layout of the `UR Input` sheets.
    pub const STANDARD: FieldMap = FieldMap {
        period: 1,
        name: 4,
        status: 5,
        progress_rate: 6,
        concerns: 7,
        action_items: 8,
        remarks: 9,
        universal_status: 10,
        mpar: 11,
        entity_key: 12,
        province: 14,
        region: 15,
        district: 16,
        level: 17,
        income_class: 18,
        district_office: 19,
    };
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap::STANDARD
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub header_rows: usize,
    pub dropped_rows: usize,
    pub kept_rows: usize,
}

/// Map raw sheet rows to typed records, in source order.
///
/// The first `HEADER_ROWS` rows are discarded unconditionally. A row without
/// an entity key or a period is dropped silently and counted in the report.
pub fn normalize_rows(rows: &[RawRow], map: &FieldMap) -> (Vec<EntityRecord>, LoadReport) {
    let header_rows = rows.len().min(HEADER_ROWS);
    let mut records = Vec::with_capacity(rows.len().saturating_sub(HEADER_ROWS));
    let mut dropped_rows = 0usize;

    for row in rows.iter().skip(HEADER_ROWS) {
        match normalize_row(row, map) {
            Some(r) => records.push(r),
            None => dropped_rows += 1,
        }
    }

    let report = LoadReport {
        total_rows: rows.len(),
        header_rows,
        dropped_rows,
        kept_rows: records.len(),
    };
    debug!(?report, "normalized sheet rows");
    (records, report)
}

fn normalize_row(row: &[String], map: &FieldMap) -> Option<EntityRecord> {
    let entity_key = cell(row, map.entity_key);
    let period = cell(row, map.period);
    if entity_key.is_empty() || period.is_empty() {
        return None;
    }
    Some(EntityRecord {
        entity_key,
        name: cell(row, map.name),
        province: cell(row, map.province),
        region: cell(row, map.region),
        district: cell(row, map.district),
        level: cell(row, map.level),
        income_class: cell(row, map.income_class),
        district_office: cell(row, map.district_office),
        period,
        status: cell(row, map.status),
        universal_status: cell(row, map.universal_status),
        progress_rate: cell(row, map.progress_rate),
        concerns: cell(row, map.concerns),
        action_items: cell(row, map.action_items),
        remarks: cell(row, map.remarks),
        mpar: cell(row, map.mpar),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a row in the standard layout.
    pub(crate) fn row(key: &str, period: &str, status: &str, office: &str) -> RawRow {
        let mut r = vec![String::new(); 21];
        r[0] = format!("id-{key}");
        r[1] = period.to_string();
        r[4] = format!("LGU {key}");
        r[5] = status.to_string();
        r[12] = key.to_string();
        r[14] = "Province".to_string();
        r[15] = "Region".to_string();
        r[19] = office.to_string();
        r
    }

    fn header() -> Vec<RawRow> {
        vec![vec!["title".to_string()], vec!["note".to_string()], vec!["cols".to_string()]]
    }

    #[test]
    fn skips_exactly_three_header_rows() {
        let mut rows = header();
        rows.push(row("ID1", "2024-01", "[A] Operational", "NCR"));
        let (records, report) = normalize_rows(&rows, &FieldMap::STANDARD);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_key, "ID1");
        assert_eq!(records[0].name, "LGU ID1");
        assert_eq!(records[0].district_office, "NCR");
        assert_eq!(report, LoadReport { total_rows: 4, header_rows: 3, dropped_rows: 0, kept_rows: 1 });
    }

    #[test]
    fn fewer_than_three_rows_yields_nothing() {
        let rows = vec![row("ID1", "2024-01", "[A]", "NCR"), row("ID2", "2024-01", "[A]", "NCR")];
        let (records, report) = normalize_rows(&rows, &FieldMap::STANDARD);
        assert!(records.is_empty());
        assert_eq!(report.header_rows, 2);
    }

    #[test]
    fn rows_without_key_or_period_are_dropped() {
        let mut rows = header();
        rows.push(row("", "2024-01", "[A]", "NCR"));
        rows.push(row("ID2", "", "[A]", "NCR"));
        rows.push(vec!["short".to_string()]);
        rows.push(row("ID3", "2024-02", "[B]", "R1"));
        let (records, report) = normalize_rows(&rows, &FieldMap::STANDARD);
        assert_eq!(records.iter().map(|r| r.entity_key.as_str()).collect::<Vec<_>>(), vec!["ID3"]);
        assert_eq!(report.dropped_rows, 3);
    }

    #[test]
    fn missing_trailing_cells_read_as_empty() {
        let mut rows = header();
        let mut short = row("ID1", "2024-01", "[A]", "NCR");
        short.truncate(13);
        rows.push(short);
        let (records, _) = normalize_rows(&rows, &FieldMap::STANDARD);
        assert_eq!(records[0].district_office, "");
        assert_eq!(records[0].income_class, "");
    }

    #[test]
    fn preserves_source_order() {
        let mut rows = header();
        for key in ["C", "A", "B"] {
            rows.push(row(key, "2024-01", "[A]", "NCR"));
        }
        let (records, _) = normalize_rows(&rows, &FieldMap::STANDARD);
        let keys: Vec<_> = records.iter().map(|r| r.entity_key.clone()).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);
    }
}
