use crate::types::{PeriodBucket, ServiceBuckets};
use crate::util::{months_between, parse_period};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Widen a possibly sparse selection to its enclosing contiguous month span.
///
/// Returns `None` when nothing valid is selected. Unparseable entries are
/// ignored.
pub fn month_span(selected: &[String]) -> Option<Vec<String>> {
    let mut dates = Vec::with_capacity(selected.len());
    for s in selected {
        match parse_period(s) {
            Some(d) => dates.push(d),
            None => warn!(period = %s, "ignoring malformed period in selection"),
        }
    }
    let start = dates.iter().min()?;
    let end = dates.iter().max()?;
    Some(months_between(*start, *end))
}

/// Keep only buckets inside the selection's enclosing span, per service.
///
/// An empty selection leaves the input unchanged. A selection whose entries
/// are all malformed selects nothing, so every service keeps an empty list.
/// Always returns new structures; the input is never modified.
pub fn filter_buckets(buckets: &ServiceBuckets, selected: &[String]) -> ServiceBuckets {
    if selected.is_empty() {
        return buckets.clone();
    }
    let Some(span) = month_span(selected) else {
        warn!(selected = selected.len(), "no valid period in selection; window is empty");
        return buckets.keys().map(|service| (*service, Vec::new())).collect();
    };
    debug!(start = %span[0], end = %span[span.len() - 1], months = span.len(), "filtering to span");
    let span: BTreeSet<String> = span.into_iter().collect();
    buckets
        .iter()
        .map(|(service, list)| (*service, retain_span(list, &span)))
        .collect()
}

fn retain_span(buckets: &[PeriodBucket], span: &BTreeSet<String>) -> Vec<PeriodBucket> {
    buckets.iter().filter(|b| span.contains(&b.period)).cloned().collect()
}
