// Entry point and high-level CLI flow.
//
// - Load: fetch every selected service sheet concurrently and merge them.
// - Generate: window the periods, tally by region and status, write the
//   three report files plus a JSON summary and print markdown previews.
use anyhow::Context;
use clap::Parser;
use lgu_utilization::aggregate::{Aggregate, Aggregator};
use lgu_utilization::config::Config;
use lgu_utilization::filter::filter_buckets;
use lgu_utilization::selection::{all_regions, parse_services, regions_for_islands, PeriodSelection};
use lgu_utilization::source::{FileSheetSource, HttpSheetSource, SheetSource};
use lgu_utilization::types::ServiceKey;
use lgu_utilization::{logging, lookup, output, reports, util};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lgu_utilization")]
#[command(about = "LGU permit-service utilization status reports")]
#[command(version)]
struct Cli {
    /// Services to load (comma-separated): BP, CO, WP, BC
    #[arg(long, value_delimiter = ',', default_value = "BP,CO,WP,BC")]
    services: Vec<String>,

    /// Regional office codes to tally (comma-separated); all regions when
    /// neither this nor --islands is given
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Island groups to tally: luzon, visayas, mindanao
    #[arg(long, value_delimiter = ',')]
    islands: Vec<String>,

    /// Explicit YYYY-MM periods; the window spans from the earliest to the latest
    #[arg(long, value_delimiter = ',')]
    periods: Vec<String>,

    /// Year used by --month, --range and --quarters
    #[arg(long, default_value_t = 2024)]
    year: i32,

    /// Single month (1-12)
    #[arg(long, conflicts_with_all = ["range", "quarters", "periods"])]
    month: Option<u32>,

    /// Month range within --year, e.g. `--range 2 5`
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with_all = ["quarters", "periods"])]
    range: Option<Vec<u32>>,

    /// Quarters within --year (comma-separated), e.g. `--quarters 1,2`
    #[arg(long, value_delimiter = ',', conflicts_with = "periods")]
    quarters: Vec<u32>,

    /// Read `<CODE>.json` sheet bodies from this directory instead of HTTP
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory for the report files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Configuration file (defaults to lgu.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Look up LGUs by name in the merged latest snapshot
    #[arg(long)]
    lookup: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn selected_periods(&self) -> Vec<String> {
        let selection = if let Some(month) = self.month {
            PeriodSelection::Month { year: self.year, month }
        } else if let Some(range) = &self.range {
            PeriodSelection::Range { year: self.year, start: range[0], end: range[1] }
        } else if !self.quarters.is_empty() {
            PeriodSelection::Quarters { year: self.year, quarters: self.quarters.clone() }
        } else {
            return self.periods.iter().map(|p| p.trim().to_string()).collect();
        };
        selection.periods()
    }

    fn selected_regions(&self) -> BTreeSet<String> {
        if self.regions.is_empty() && self.islands.is_empty() {
            return all_regions();
        }
        let mut regions = regions_for_islands(&self.islands);
        regions.extend(self.regions.iter().map(|r| r.trim().to_string()));
        regions
    }
}

/// Load: fetch and merge every selected service.
async fn handle_load(cli: &Cli, config: &Config, services: &[ServiceKey]) -> anyhow::Result<(Arc<Aggregate>, Vec<ServiceKey>)> {
    let source: Arc<dyn SheetSource> = match &cli.input_dir {
        Some(dir) => Arc::new(FileSheetSource::new(dir)),
        None => Arc::new(HttpSheetSource::from_config(config).context("building sheet client")?),
    };
    let mut aggregator = Aggregator::new(config.field_maps());
    let mut batch = aggregator.spawn_fetches(source, services);
    let mut aggregate = aggregator.snapshot();
    while let Some(snapshot) = aggregator.next(&mut batch).await {
        info!(
            merged = snapshot.buckets.len(),
            waiting = batch.pending().len(),
            "service finished"
        );
        aggregate = snapshot;
    }

    for (service, report) in &aggregate.reports {
        println!(
            "{}: {} rows loaded, {} kept, {} skipped",
            service.label(),
            util::format_int(report.total_rows),
            util::format_int(report.kept_rows),
            util::format_int(report.dropped_rows)
        );
    }
    let failed: Vec<ServiceKey> = aggregator.failures().iter().map(|f| f.service).collect();
    for f in aggregator.failures() {
        eprintln!("Warning: {} unavailable: {}", f.service.label(), f.message);
    }
    println!();
    Ok((aggregate, failed))
}

/// Generate: filter, tally and write every report.
fn handle_generate_reports(
    aggregate: &Aggregate,
    failed: Vec<ServiceKey>,
    periods: &[String],
    regions: &BTreeSet<String>,
    out_dir: &Path,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let filtered = filter_buckets(&aggregate.buckets, periods);
    let tallies = reports::tally_services(&filtered, regions);

    let r1 = reports::tally_rows(&tallies);
    let file1 = out_dir.join("report1_region_tally.csv");
    output::write_csv(&file1, &r1)?;
    println!("Report 1: Utilization Status by Region\n");
    output::preview_table_rows(&r1, 5);
    println!("(Full table exported to {})\n", file1.display());

    let r2 = reports::service_totals_rows(&tallies);
    let file2 = out_dir.join("report2_service_totals.csv");
    output::write_csv(&file2, &r2)?;
    println!("Report 2: Status Totals per Service\n");
    output::preview_table_rows(&r2, 4);
    println!("(Full table exported to {})\n", file2.display());

    let r3 = reports::trend_rows(&tallies);
    let file3 = out_dir.join("report3_monthly_trends.csv");
    output::write_csv(&file3, &r3)?;
    println!("Report 3: Monthly Status Trends\n");
    output::preview_table_rows(&r3, 6);
    println!("(Full table exported to {})\n", file3.display());

    let summary = reports::generate_summary(aggregate, &filtered, &tallies, failed);
    output::write_json(&out_dir.join("summary.json"), &summary)?;
    println!(
        "Summary: {} LGUs, {} periods, status totals {:?}",
        util::format_int(summary.total_entities),
        summary.periods.len(),
        summary.pie
    );
    info!(rows = r1.len(), "reports written");
    Ok(())
}

fn handle_lookup(aggregate: &Aggregate, query: &str) {
    let entities = aggregate.merged_entities();
    let hits = lookup::search_by_name(&entities, query);
    if hits.is_empty() {
        println!("No LGU matches '{}'.\n", query);
        return;
    }
    for e in hits {
        println!("{} [{}] {}, {} ({})", e.name, e.entity_key, e.province, e.region, e.district_office);
        for (service, text) in &e.status_text {
            println!("  {}: {}", service.code(), if text.is_empty() { "-" } else { text.as_str() });
        }
    }
    println!();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let services = parse_services(&cli.services)?;
    let periods = cli.selected_periods();
    let regions = cli.selected_regions();
    info!(services = ?services, periods = ?periods, regions = regions.len(), "starting");

    let (aggregate, failed) = handle_load(&cli, &config, &services).await?;
    if let Some(query) = &cli.lookup {
        handle_lookup(&aggregate, query);
    }
    handle_generate_reports(&aggregate, failed, &periods, &regions, &cli.out_dir)
}
