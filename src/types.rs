use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One positional row from a sheet export.
pub type RawRow = Vec<String>;

/// The four permit/clearance services tracked by the dashboard.
///
/// The derived ordering (`BP < CO < WP < BC`) is the canonical service order
/// used whenever several services contribute to the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceKey {
    #[serde(rename = "BP")]
    BuildingPermit,
    #[serde(rename = "CO")]
    CertificateOfOccupancy,
    #[serde(rename = "WP")]
    WorkingPermit,
    #[serde(rename = "BC")]
    BarangayClearance,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 4] = [
        ServiceKey::BuildingPermit,
        ServiceKey::CertificateOfOccupancy,
        ServiceKey::WorkingPermit,
        ServiceKey::BarangayClearance,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ServiceKey::BuildingPermit => "BP",
            ServiceKey::CertificateOfOccupancy => "CO",
            ServiceKey::WorkingPermit => "WP",
            ServiceKey::BarangayClearance => "BC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceKey::BuildingPermit => "Building Permit",
            ServiceKey::CertificateOfOccupancy => "Certificate of Occupancy",
            ServiceKey::WorkingPermit => "Working Permit",
            ServiceKey::BarangayClearance => "Barangay Clearance",
        }
    }

    /// Sheet name used when the configuration does not name one.
    pub fn default_sheet(self) -> &'static str {
        match self {
            ServiceKey::BuildingPermit => "BP1 UR Input",
            ServiceKey::CertificateOfOccupancy => "CO1 UR Input",
            ServiceKey::WorkingPermit => "WP1 UR Input",
            ServiceKey::BarangayClearance => "BC1 UR Input",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownService(pub String);

impl fmt::Display for UnknownService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown service code '{}' (expected BP, CO, WP or BC)", self.0)
    }
}

impl std::error::Error for UnknownService {}

impl FromStr for ServiceKey {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        ServiceKey::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or_else(|| UnknownService(s.trim().to_string()))
    }
}

/// Canonical status buckets derived from the coded prefix of the raw status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StatusCategory {
    Operational,
    Developmental,
    Training,
    Withdraw,
    Unclassified,
}

impl StatusCategory {
    /// The four counted categories, in chart order.
    pub const COUNTED: [StatusCategory; 4] = [
        StatusCategory::Operational,
        StatusCategory::Developmental,
        StatusCategory::Training,
        StatusCategory::Withdraw,
    ];

    /// Decode a leading `[A]`..`[D]` tag. Anything else is `Unclassified`.
    pub fn from_status_text(text: &str) -> StatusCategory {
        let mut chars = text.trim_start().chars();
        let (Some('['), Some(code), Some(']')) = (chars.next(), chars.next(), chars.next()) else {
            return StatusCategory::Unclassified;
        };
        match code.to_ascii_uppercase() {
            'A' => StatusCategory::Operational,
            'B' => StatusCategory::Developmental,
            'C' => StatusCategory::Training,
            'D' => StatusCategory::Withdraw,
            _ => StatusCategory::Unclassified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCategory::Operational => "Operational",
            StatusCategory::Developmental => "Developmental",
            StatusCategory::Training => "For Training/Others",
            StatusCategory::Withdraw => "Withdraw",
            StatusCategory::Unclassified => "Unclassified",
        }
    }
}

/// One LGU's state for one service in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub entity_key: String,
    pub name: String,
    pub province: String,
    pub region: String,
    pub district: String,
    pub level: String,
    pub income_class: String,
    pub district_office: String,
    pub period: String,
    pub status: String,
    pub universal_status: String,
    pub progress_rate: String,
    pub concerns: String,
    pub action_items: String,
    pub remarks: String,
    pub mpar: String,
}

impl EntityRecord {
    pub fn category(&self) -> StatusCategory {
        StatusCategory::from_status_text(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodBucket {
    pub period: String,
    pub entities: Vec<EntityRecord>,
}

/// Per-service period buckets, each list sorted ascending by period.
pub type ServiceBuckets = BTreeMap<ServiceKey, Vec<PeriodBucket>>;

/// One entity across every service that reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEntity {
    pub entity_key: String,
    pub name: String,
    pub province: String,
    pub region: String,
    pub district: String,
    pub level: String,
    pub income_class: String,
    pub district_office: String,
    pub status_by_service: BTreeMap<ServiceKey, StatusCategory>,
    /// Raw status text behind each entry of `status_by_service`.
    pub status_text: BTreeMap<ServiceKey, String>,
}

impl MergedEntity {
    pub fn new(entity_key: &str) -> Self {
        MergedEntity {
            entity_key: entity_key.to_string(),
            name: String::new(),
            province: String::new(),
            region: String::new(),
            district: String::new(),
            level: String::new(),
            income_class: String::new(),
            district_office: String::new(),
            status_by_service: BTreeMap::new(),
            status_text: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Tabled)]
pub struct RegionTally {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Operational")]
    #[tabled(rename = "Operational")]
    pub operational: u32,
    #[serde(rename = "Developmental")]
    #[tabled(rename = "Developmental")]
    pub developmental: u32,
    #[serde(rename = "Training")]
    #[tabled(rename = "Training")]
    pub training: u32,
    #[serde(rename = "Withdraw")]
    #[tabled(rename = "Withdraw")]
    pub withdraw: u32,
}

impl RegionTally {
    pub fn new(region: &str) -> Self {
        RegionTally { region: region.to_string(), ..Default::default() }
    }

    pub fn record(&mut self, category: StatusCategory) {
        match category {
            StatusCategory::Operational => self.operational += 1,
            StatusCategory::Developmental => self.developmental += 1,
            StatusCategory::Training => self.training += 1,
            StatusCategory::Withdraw => self.withdraw += 1,
            StatusCategory::Unclassified => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.operational + self.developmental + self.training + self.withdraw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTally {
    pub period: String,
    pub regions: Vec<RegionTally>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub operational: u32,
    pub developmental: u32,
    pub training: u32,
    pub withdraw: u32,
}

impl StatusTotals {
    pub fn absorb(&mut self, tally: &RegionTally) {
        self.operational += tally.operational;
        self.developmental += tally.developmental;
        self.training += tally.training;
        self.withdraw += tally.withdraw;
    }

    pub fn get(&self, category: StatusCategory) -> u32 {
        match category {
            StatusCategory::Operational => self.operational,
            StatusCategory::Developmental => self.developmental,
            StatusCategory::Training => self.training,
            StatusCategory::Withdraw => self.withdraw,
            StatusCategory::Unclassified => 0,
        }
    }

    /// Pie order: operational, developmental, training, withdraw.
    pub fn as_array(&self) -> [u32; 4] {
        [self.operational, self.developmental, self.training, self.withdraw]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<u32>,
}

/// Bar-chart shape: one value per category in each series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySeries {
    pub categories: Vec<String>,
    pub series: Vec<NamedSeries>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TallyRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Operational")]
    #[tabled(rename = "Operational")]
    pub operational: u32,
    #[serde(rename = "Developmental")]
    #[tabled(rename = "Developmental")]
    pub developmental: u32,
    #[serde(rename = "Training")]
    #[tabled(rename = "Training")]
    pub training: u32,
    #[serde(rename = "Withdraw")]
    #[tabled(rename = "Withdraw")]
    pub withdraw: u32,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ServiceTotalsRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "Operational")]
    #[tabled(rename = "Operational")]
    pub operational: u32,
    #[serde(rename = "Developmental")]
    #[tabled(rename = "Developmental")]
    pub developmental: u32,
    #[serde(rename = "Training")]
    #[tabled(rename = "Training")]
    pub training: u32,
    #[serde(rename = "Withdraw")]
    #[tabled(rename = "Withdraw")]
    pub withdraw: u32,
    #[serde(rename = "LatestPeriod")]
    #[tabled(rename = "LatestPeriod")]
    pub latest_period: String,
    #[serde(rename = "LatestOperational")]
    #[tabled(rename = "LatestOperational")]
    pub latest_operational: u32,
    #[serde(rename = "LatestDevelopmental")]
    #[tabled(rename = "LatestDevelopmental")]
    pub latest_developmental: u32,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Operational")]
    #[tabled(rename = "Operational")]
    pub operational: u32,
    #[serde(rename = "Developmental")]
    #[tabled(rename = "Developmental")]
    pub developmental: u32,
    #[serde(rename = "Training")]
    #[tabled(rename = "Training")]
    pub training: u32,
    #[serde(rename = "Withdraw")]
    #[tabled(rename = "Withdraw")]
    pub withdraw: u32,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub services: Vec<ServiceKey>,
    pub failed_services: Vec<ServiceKey>,
    pub periods: Vec<String>,
    pub total_entities: usize,
    pub totals: StatusTotals,
    pub pie: [u32; 4],
    pub latest_by_service: BTreeMap<ServiceKey, StatusTotals>,
    pub region_series: CategorySeries,
    pub monthly_series: BTreeMap<ServiceKey, Vec<NamedSeries>>,
}
