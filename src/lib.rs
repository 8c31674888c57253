//! Turns per-service LGU utilization sheets into period- and region-indexed
//! status tallies for the dashboard charts.
//!
//! Rows flow `loader` → `dedup` → `grouping` per service, `aggregate` unions
//! the services, then `filter` windows the periods and `reports` tallies them.
pub mod aggregate;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod loader;
pub mod logging;
pub mod lookup;
pub mod output;
pub mod reports;
pub mod selection;
pub mod source;
pub mod types;
pub mod util;

pub use aggregate::{Aggregate, Aggregator, ServiceFailure, ServicePartial};
pub use error::{PipelineError, Result};
pub use types::{EntityRecord, MergedEntity, PeriodBucket, RegionTally, ServiceKey, StatusCategory};
