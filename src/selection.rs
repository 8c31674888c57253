// Selection inputs coming from the dashboard filters: periods, regions and
// islands. These are parameters of the pipeline, not state it keeps.
use crate::types::{ServiceKey, UnknownService};
use crate::util::period_of;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};

pub const REGION_CODES: [&str; 18] = [
    "R1", "R2", "R3", "R4A", "R4B", "R5", "CAR", "NCR", "R6", "R7", "R8", "R9", "R10", "R11",
    "R12", "R13", "BARMM I", "BARMM II",
];

static ISLAND_GROUPS: Lazy<BTreeMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    BTreeMap::from([
        ("luzon", vec!["R1", "R2", "R3", "R4A", "R4B", "R5", "CAR", "NCR"]),
        ("visayas", vec!["R6", "R7", "R8"]),
        ("mindanao", vec!["R9", "R10", "R11", "R12", "R13", "BARMM I", "BARMM II"]),
    ])
});

pub fn all_regions() -> BTreeSet<String> {
    REGION_CODES.iter().map(|r| r.to_string()).collect()
}

/// Regions belonging to the named island groups. Unknown names are skipped.
pub fn regions_for_islands<S: AsRef<str>>(islands: &[S]) -> BTreeSet<String> {
    islands
        .iter()
        .filter_map(|i| ISLAND_GROUPS.get(i.as_ref().trim().to_ascii_lowercase().as_str()))
        .flat_map(|regions| regions.iter().map(|r| r.to_string()))
        .collect()
}

/// Service codes in selection order, deduplicated. Blank entries are
/// skipped, so `--services ""` selects nothing.
pub fn parse_services<S: AsRef<str>>(codes: &[S]) -> Result<Vec<ServiceKey>, UnknownService> {
    let mut out: Vec<ServiceKey> = Vec::new();
    for code in codes.iter().map(|c| c.as_ref().trim()).filter(|c| !c.is_empty()) {
        let key = code.parse::<ServiceKey>()?;
        if !out.contains(&key) {
            out.push(key);
        }
    }
    Ok(out)
}

/// Date picker modes, each expanding to explicit `YYYY-MM` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodSelection {
    Month { year: i32, month: u32 },
    /// Inclusive month range within one year; bounds may be given in either order.
    Range { year: i32, start: u32, end: u32 },
    /// Any subset of Q1..Q4 of one year.
    Quarters { year: i32, quarters: Vec<u32> },
}

impl PeriodSelection {
    pub fn periods(&self) -> Vec<String> {
        match self {
            PeriodSelection::Month { year, month } => period_of(*year, *month).into_iter().collect(),
            PeriodSelection::Range { year, start, end } => {
                let (lo, hi) = if start <= end { (*start, *end) } else { (*end, *start) };
                (lo..=hi).filter_map(|m| period_of(*year, m)).collect()
            }
            PeriodSelection::Quarters { year, quarters } => {
                let months: BTreeSet<u32> = quarters
                    .iter()
                    .filter(|q| (1..=4).contains(*q))
                    .flat_map(|q| (q - 1) * 3 + 1..=q * 3)
                    .collect();
                months.into_iter().filter_map(|m| period_of(*year, m)).collect()
            }
        }
    }
}
